//! RPC-Gateway zum Relay
//!
//! Die Engine besitzt keinen Transport. Die Einbettung stellt ein
//! `RelayGateway` bereit; die Engine kennt keine Retry-Politik ausser dem
//! einmaligen Wiederholen nach einer veralteten KeyId.

use std::future::Future;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::EngineResult;

/// Fehler, die ein Gateway melden kann
#[derive(Debug, Clone, Error)]
pub enum RelayError {
    /// Relay kennt die verwendete KeyId nicht (mehr)
    #[error("Ungueltige KeyId: {0}")]
    UngueltigeKeyId(String),

    #[error("Anfrage abgelehnt: {0}")]
    Abgelehnt(String),

    #[error("Transport-Fehler: {0}")]
    Transport(String),
}

/// Asynchroner Request/Response-Kanal zum Relay
#[async_trait]
pub trait RelayGateway: Send + Sync {
    async fn request(
        &self,
        method: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, RelayError>;
}

/// Fuehrt `op` aus und wiederholt genau einmal nach `refresh`, wenn der
/// Relay die KeyId als veraltet ablehnt
pub async fn retry_once_on_stale_key<T, Op, OpFut, Re, ReFut>(
    mut op: Op,
    refresh: Re,
) -> EngineResult<T>
where
    Op: FnMut() -> OpFut,
    OpFut: Future<Output = EngineResult<T>>,
    Re: FnOnce() -> ReFut,
    ReFut: Future<Output = EngineResult<()>>,
{
    match op().await {
        Err(e) if e.ist_veraltete_key_id() => {
            tracing::debug!(fehler = %e, "Veraltete KeyId, Schluessel-Satz wird neu geladen");
            refresh().await?;
            op().await
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn genau_ein_retry_nach_veralteter_key_id() {
        let versuche = &AtomicUsize::new(0);
        let refreshes = &AtomicUsize::new(0);

        let result: EngineResult<u32> = retry_once_on_stale_key(
            move || async move {
                let n = versuche.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err(EngineError::Relay(RelayError::UngueltigeKeyId("k1".into())))
                } else {
                    Ok(7u32)
                }
            },
            move || async move {
                refreshes.fetch_add(1, Ordering::SeqCst);
                Ok::<(), EngineError>(())
            },
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(versuche.load(Ordering::SeqCst), 2);
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zweiter_fehler_wird_durchgereicht() {
        let versuche = &AtomicUsize::new(0);
        let result: EngineResult<()> = retry_once_on_stale_key(
            move || async move {
                versuche.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(EngineError::Relay(RelayError::UngueltigeKeyId("k".into())))
            },
            || async { Ok::<(), EngineError>(()) },
        )
        .await;

        assert!(result.unwrap_err().ist_veraltete_key_id());
        assert_eq!(versuche.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn andere_fehler_ohne_retry() {
        let versuche = &AtomicUsize::new(0);
        let refreshes = &AtomicUsize::new(0);
        let result: EngineResult<()> = retry_once_on_stale_key(
            move || async move {
                versuche.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(EngineError::Relay(RelayError::Transport("weg".into())))
            },
            move || async move {
                refreshes.fetch_add(1, Ordering::SeqCst);
                Ok::<(), EngineError>(())
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(versuche.load(Ordering::SeqCst), 1);
        assert_eq!(refreshes.load(Ordering::SeqCst), 0);
    }
}
