//! Event-Bus einer Session
//!
//! Jede `EngineSession` besitzt genau einen Bus. Clone teilt den Sender.

use tokio::sync::broadcast;
use tresor_core::EngineEvent;

/// Groesse des Broadcast-Kanals fuer Engine-Events
const EVENT_KANAL_GROESSE: usize = 256;

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::neu()
    }
}

impl EventBus {
    pub fn neu() -> Self {
        let (tx, _) = broadcast::channel(EVENT_KANAL_GROESSE);
        Self { tx }
    }

    /// Sendet ein Event; ohne Abonnenten wird es verworfen
    pub fn senden(&self, event: EngineEvent) {
        tracing::trace!(?event, "Engine-Event");
        let _ = self.tx.send(event);
    }

    pub fn abonnieren(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn abonnenten_erhalten_events() {
        let bus = EventBus::neu();
        let mut rx = bus.abonnieren();
        bus.senden(EngineEvent::SessionBeendet);
        assert_eq!(rx.recv().await.unwrap(), EngineEvent::SessionBeendet);
    }

    #[test]
    fn ohne_abonnenten_kein_fehler() {
        EventBus::neu().senden(EngineEvent::SessionBeendet);
    }
}
