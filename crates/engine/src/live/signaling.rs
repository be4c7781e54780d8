//! Side-Channel eines Live-Raums
//!
//! Die Engine sendet nur; eingehende Nachrichten reicht die Anwendung an
//! `LiveGroupRekeying::handle_message` weiter.

use async_trait::async_trait;
use tresor_protocol::LiveKeyMessage;

use crate::error::EngineResult;

/// Verteilt eine Nachricht an alle anderen Teilnehmer des Raums
#[async_trait]
pub trait LiveSignaling: Send + Sync {
    async fn senden(&self, nachricht: &LiveKeyMessage) -> EngineResult<()>;
}
