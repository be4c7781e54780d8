//! Adapter zum externen Authentizitaets-Pruefer
//!
//! Der Pruefer beantwortet pro `VerificationRequest` mit `bool`, in gleicher
//! Laenge und Reihenfolge. Die Implementierung kann jederzeit ausgetauscht
//! werden; der Austausch gilt ab der naechsten Verifikation.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tresor_protocol::VerificationRequest;

use crate::error::{EngineError, EngineResult};

/// Externer Pruefer, ob ein Absender-Schluessel zum Absender gehoert
#[async_trait]
pub trait UserVerifier: Send + Sync {
    async fn verify(&self, requests: &[VerificationRequest]) -> anyhow::Result<Vec<bool>>;
}

/// Standard-Pruefer: akzeptiert alles
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAllVerifier;

#[async_trait]
impl UserVerifier for AcceptAllVerifier {
    async fn verify(&self, requests: &[VerificationRequest]) -> anyhow::Result<Vec<bool>> {
        Ok(vec![true; requests.len()])
    }
}

/// Austauschbarer Verweis auf den aktuellen Pruefer
#[derive(Clone)]
pub struct VerifierHandle {
    inner: Arc<RwLock<Arc<dyn UserVerifier>>>,
}

impl Default for VerifierHandle {
    fn default() -> Self {
        Self::new(Arc::new(AcceptAllVerifier))
    }
}

impl VerifierHandle {
    pub fn new(verifier: Arc<dyn UserVerifier>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(verifier)),
        }
    }

    /// Ersetzt den Pruefer
    pub fn set(&self, verifier: Arc<dyn UserVerifier>) {
        *self.inner.write() = verifier;
        tracing::debug!("User-Verifier ausgetauscht");
    }

    /// Sendet einen Batch an den aktuellen Pruefer
    ///
    /// Fehler der Implementierung werden zu `VerifierUnhandled`, eine Antwort
    /// falscher Laenge zu `MalformedVerifierResponse`.
    pub async fn verify(&self, requests: &[VerificationRequest]) -> EngineResult<Vec<bool>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        let verifier = Arc::clone(&*self.inner.read());
        let antworten = verifier
            .verify(requests)
            .await
            .map_err(|e| EngineError::VerifierUnhandled(format!("{e:#}")))?;

        if antworten.len() != requests.len() {
            tracing::warn!(
                erwartet = requests.len(),
                erhalten = antworten.len(),
                "Verifier-Antwort hat falsche Laenge"
            );
            return Err(EngineError::MalformedVerifierResponse {
                erwartet: requests.len(),
                erhalten: antworten.len(),
            });
        }
        Ok(antworten)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tresor_core::types::{ContextId, UserId};
    use tresor_protocol::RelayIdentity;

    fn anfrage(sender: &str) -> VerificationRequest {
        VerificationRequest {
            context_id: ContextId::new("ctx"),
            sender_id: UserId::new(sender),
            sender_pub_key: "pk".into(),
            timestamp: 0,
            relay_identity: RelayIdentity::new("wss://relay"),
        }
    }

    struct Fest(Vec<bool>);

    #[async_trait]
    impl UserVerifier for Fest {
        async fn verify(&self, _: &[VerificationRequest]) -> anyhow::Result<Vec<bool>> {
            Ok(self.0.clone())
        }
    }

    struct Kaputt;

    #[async_trait]
    impl UserVerifier for Kaputt {
        async fn verify(&self, _: &[VerificationRequest]) -> anyhow::Result<Vec<bool>> {
            anyhow::bail!("Verzeichnis nicht erreichbar")
        }
    }

    #[tokio::test]
    async fn standard_akzeptiert_alles() {
        let handle = VerifierHandle::default();
        let antworten = handle.verify(&[anfrage("a"), anfrage("b")]).await.unwrap();
        assert_eq!(antworten, vec![true, true]);
    }

    #[tokio::test]
    async fn falsche_laenge_ist_protokollverletzung() {
        let handle = VerifierHandle::new(Arc::new(Fest(vec![true])));
        let result = handle.verify(&[anfrage("a"), anfrage("b")]).await;
        assert!(matches!(
            result,
            Err(EngineError::MalformedVerifierResponse {
                erwartet: 2,
                erhalten: 1
            })
        ));
    }

    #[tokio::test]
    async fn implementierungsfehler_wird_unhandled() {
        let handle = VerifierHandle::new(Arc::new(Kaputt));
        let result = handle.verify(&[anfrage("a")]).await;
        assert!(matches!(result, Err(EngineError::VerifierUnhandled(_))));
    }

    #[tokio::test]
    async fn austausch_gilt_ab_naechster_pruefung() {
        let handle = VerifierHandle::default();
        let kopie = handle.clone();
        assert_eq!(handle.verify(&[anfrage("a")]).await.unwrap(), vec![true]);

        kopie.set(Arc::new(Fest(vec![false])));
        assert_eq!(handle.verify(&[anfrage("a")]).await.unwrap(), vec![false]);
    }
}
