//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable:
//! - `TRESOR_LOG_LEVEL`: Log-Level oder Filter-Direktive, Standard: info
//! - `TRESOR_LOG_FORMAT`: Format (text/json), Standard: text
//!
//! Umgebungsvariablen haben Vorrang vor den Werten aus der Konfiguration.

use tracing_subscriber::{fmt, EnvFilter};
use tresor_core::config::LoggingEinstellungen;

pub const ENV_LEVEL: &str = "TRESOR_LOG_LEVEL";
pub const ENV_FORMAT: &str = "TRESOR_LOG_FORMAT";

/// Initialisiert das Logging-System.
///
/// Liest `TRESOR_LOG_LEVEL` und `TRESOR_LOG_FORMAT` aus der Umgebung.
/// Faellt auf die uebergebenen Werte bzw. `info` / `text` zurueck.
/// Gibt `false` zurueck wenn bereits ein globaler Subscriber installiert ist.
pub fn logging_initialisieren(level: &str, format: &str) -> bool {
    let filter = EnvFilter::try_from_env(ENV_LEVEL)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = format_aufloesen(std::env::var(ENV_FORMAT).ok(), format);

    let ergebnis = match format {
        "json" => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        _ => fmt().with_env_filter(filter).with_target(true).try_init(),
    };
    ergebnis.is_ok()
}

/// Initialisiert das Logging aus dem `[logging]`-Abschnitt der Engine-Konfiguration
pub fn logging_aus_config(einstellungen: &LoggingEinstellungen) -> bool {
    logging_initialisieren(&einstellungen.level, &einstellungen.format)
}

/// Waehlt das effektive Format: gueltiger Env-Wert vor Konfiguration, sonst `text`
fn format_aufloesen<'a>(env: Option<String>, konfiguriert: &'a str) -> &'a str {
    match env.as_deref() {
        Some("json") => "json",
        Some("text") => "text",
        _ if log_format_gueltig(konfiguriert) => konfiguriert,
        _ => "text",
    }
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}
