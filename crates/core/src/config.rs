//! Engine-Konfiguration
//!
//! Wird beim Session-Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass die Engine ohne Konfigurationsdatei
//! lauffaehig ist.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TresorError};

/// Vollstaendige Engine-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Integritaets-Pruefung (Provenienz-Datensaetze)
    pub integritaet: IntegritaetEinstellungen,
    /// Schluessel-Schema
    pub schluessel: SchluesselEinstellungen,
    /// Live-Rekeying (Medien-Raeume)
    pub live: LiveEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Integritaets-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegritaetEinstellungen {
    /// Erlaubte Abweichung zwischen Provenienz-Zeitstempel und
    /// `lastModificationDate` des Server-Umschlags in Millisekunden
    pub zeitabweichung_ms: u64,
}

impl Default for IntegritaetEinstellungen {
    fn default() -> Self {
        Self {
            zeitabweichung_ms: 300_000,
        }
    }
}

/// Schluessel-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchluesselEinstellungen {
    /// Aktuelle Schema-Version neuer Schluessel. Aeltere aktive Schluessel
    /// werden bei der naechsten Mitgliederaenderung rotiert.
    pub aktuelles_schema: u32,
}

impl Default for SchluesselEinstellungen {
    fn default() -> Self {
        Self {
            aktuelles_schema: 2,
        }
    }
}

/// Live-Rekeying-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveEinstellungen {
    /// Wartezeit auf Antworten einer Schluessel-Anfrage in ms
    pub anfrage_ttl_ms: u64,
    /// Wartezeit auf Bestaetigungen eines Schluessel-Vorschlags in ms
    pub ack_ttl_ms: u64,
    /// Lebensdauer eines Live-Schluessels bis zur automatischen Rotation in ms
    /// (0 = keine zeitgesteuerte Rotation)
    pub schluessel_ttl_ms: u64,
}

impl Default for LiveEinstellungen {
    fn default() -> Self {
        Self {
            anfrage_ttl_ms: 2_000,
            ack_ttl_ms: 3_000,
            schluessel_ttl_ms: 600_000,
        }
    }
}

impl LiveEinstellungen {
    pub fn anfrage_ttl(&self) -> Duration {
        Duration::from_millis(self.anfrage_ttl_ms)
    }

    pub fn ack_ttl(&self) -> Duration {
        Duration::from_millis(self.ack_ttl_ms)
    }

    pub fn schluessel_ttl(&self) -> Option<Duration> {
        (self.schluessel_ttl_ms > 0).then(|| Duration::from_millis(self.schluessel_ttl_ms))
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl EngineConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => Self::aus_toml(&inhalt)
                .map_err(|e| TresorError::Konfiguration(format!("'{pfad}': {e}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(TresorError::Konfiguration(format!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            ))),
        }
    }

    /// Parst und validiert eine Konfiguration aus einem TOML-String
    pub fn aus_toml(inhalt: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(inhalt).map_err(|e| TresorError::Konfiguration(e.to_string()))?;
        config.validieren()?;
        Ok(config)
    }

    /// Prueft Werte, die zur Laufzeit keinen Sinn ergeben wuerden
    pub fn validieren(&self) -> Result<()> {
        if self.live.anfrage_ttl_ms == 0 {
            return Err(TresorError::Konfiguration(
                "live.anfrage_ttl_ms muss > 0 sein".into(),
            ));
        }
        if self.live.ack_ttl_ms == 0 {
            return Err(TresorError::Konfiguration(
                "live.ack_ttl_ms muss > 0 sein".into(),
            ));
        }
        if self.schluessel.aktuelles_schema == 0 {
            return Err(TresorError::Konfiguration(
                "schluessel.aktuelles_schema muss > 0 sein".into(),
            ));
        }
        Ok(())
    }

    /// Erlaubte Zeitabweichung fuer `assert_binding` in Millisekunden
    pub fn zeitabweichung_ms(&self) -> i64 {
        self.integritaet.zeitabweichung_ms as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = EngineConfig::default();
        assert!(cfg.validieren().is_ok());
        assert_eq!(cfg.integritaet.zeitabweichung_ms, 300_000);
        assert_eq!(cfg.schluessel.aktuelles_schema, 2);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [integritaet]
            zeitabweichung_ms = 1000

            [live]
            ack_ttl_ms = 250
        "#;
        let cfg = EngineConfig::aus_toml(toml).unwrap();
        assert_eq!(cfg.integritaet.zeitabweichung_ms, 1000);
        assert_eq!(cfg.live.ack_ttl(), Duration::from_millis(250));
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.live.anfrage_ttl_ms, 2_000);
    }

    #[test]
    fn null_ttl_wird_abgelehnt() {
        let toml = r#"
            [live]
            anfrage_ttl_ms = 0
        "#;
        assert!(EngineConfig::aus_toml(toml).is_err());
    }

    #[test]
    fn schluessel_ttl_null_deaktiviert_rotation() {
        let mut cfg = EngineConfig::default();
        cfg.live.schluessel_ttl_ms = 0;
        assert!(cfg.live.schluessel_ttl().is_none());
    }

    #[test]
    fn fehlende_datei_liefert_standard() {
        let cfg = EngineConfig::laden("/nicht/vorhanden/tresor.toml").unwrap();
        assert_eq!(cfg.live.ack_ttl_ms, 3_000);
    }
}
