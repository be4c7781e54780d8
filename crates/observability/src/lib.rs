//! # tresor-observability
//!
//! Structured Logging via tracing-subscriber. Die Engine selbst schreibt nur
//! ueber `tracing`-Makros; die Einbettung entscheidet, ob und wie ein
//! Subscriber installiert wird.

pub mod logging;

pub use logging::{logging_aus_config, logging_initialisieren};
