//! Zustaende eines Live-Raums

use std::fmt;

/// `Idle -> RequestSent -> CollectingResponses -> KeyProposed -> AwaitingAcks -> Active`
///
/// Ablauf einer TTL ist ein gueltiger Uebergang (zurueck nach `Idle` bzw.
/// weiter nach `Active` mit den bis dahin eingegangenen Bestaetigungen).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LiveState {
    #[default]
    Idle,
    RequestSent,
    CollectingResponses,
    KeyProposed,
    AwaitingAcks,
    Active,
}

impl LiveState {
    pub fn ist_aktiv(self) -> bool {
        self == Self::Active
    }
}

impl fmt::Display for LiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::RequestSent => "request_sent",
            Self::CollectingResponses => "collecting_responses",
            Self::KeyProposed => "key_proposed",
            Self::AwaitingAcks => "awaiting_acks",
            Self::Active => "active",
        };
        f.write_str(name)
    }
}
