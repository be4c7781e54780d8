//! Schluesselring fuer Live-Frames
//!
//! Der Ring wird als ganzes `Arc` ausgetauscht. Frame-Pfade lesen genau
//! einen Snapshot, ein Schluesselwechsel ist eine einzige Ersetzung unter
//! dem Schreib-Lock.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tresor_core::types::KeyId;
use tresor_crypto::{decrypt_frame, encrypt_frame, ContentKey, EncryptedPayload};

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Default)]
struct KeyRing {
    active: Option<KeyId>,
    keys: HashMap<KeyId, ContentKey>,
    retired: HashSet<KeyId>,
}

impl KeyRing {
    fn aktiv(&self) -> Option<&ContentKey> {
        self.active.as_ref().and_then(|id| self.keys.get(id))
    }
}

#[derive(Debug, Default)]
pub struct FrameKeyRing {
    inner: RwLock<Arc<KeyRing>>,
}

impl FrameKeyRing {
    pub fn neu() -> Self {
        Self::default()
    }

    pub fn aktiv(&self) -> Option<ContentKey> {
        self.snapshot().aktiv().cloned()
    }

    pub fn aktive_key_id(&self) -> Option<KeyId> {
        self.snapshot().active.clone()
    }

    pub fn kennt(&self, key_id: &KeyId) -> bool {
        self.snapshot().keys.contains_key(key_id)
    }

    /// Macht einen Schluessel bekannt, ohne ihn zu aktivieren
    ///
    /// Zurueckgezogene KeyIds werden nicht wieder aufgenommen.
    pub fn bekannt_machen(&self, key: ContentKey) -> bool {
        let mut guard = self.inner.write();
        if guard.retired.contains(&key.key_id) {
            return false;
        }
        let mut ring = KeyRing::clone(&guard);
        ring.keys.insert(key.key_id.clone(), key);
        *guard = Arc::new(ring);
        true
    }

    /// Aktiviert eine bekannte Generation
    pub fn aktivieren(&self, key_id: &KeyId) -> EngineResult<()> {
        let mut guard = self.inner.write();
        if guard.retired.contains(key_id) {
            return Err(EngineError::SchluesselZurueckgezogen(key_id.clone()));
        }
        if !guard.keys.contains_key(key_id) {
            return Err(EngineError::UnbekannteKeyId(key_id.clone()));
        }
        let mut ring = KeyRing::clone(&guard);
        ring.active = Some(key_id.clone());
        *guard = Arc::new(ring);
        Ok(())
    }

    /// Bekannt machen und aktivieren in einem Schritt
    pub fn installieren(&self, key: ContentKey) -> EngineResult<()> {
        let key_id = key.key_id.clone();
        if !self.bekannt_machen(key) {
            return Err(EngineError::SchluesselZurueckgezogen(key_id));
        }
        self.aktivieren(&key_id)
    }

    /// Verwirft eine fruehere Generation endgueltig
    ///
    /// Der aktive Schluessel kann nicht zurueckgezogen werden.
    pub fn zurueckziehen(&self, key_id: &KeyId) -> EngineResult<()> {
        let mut guard = self.inner.write();
        if guard.active.as_ref() == Some(key_id) {
            return Err(EngineError::AktiverSchluessel(key_id.clone()));
        }
        let mut ring = KeyRing::clone(&guard);
        ring.keys.remove(key_id);
        ring.retired.insert(key_id.clone());
        *guard = Arc::new(ring);
        Ok(())
    }

    pub fn verschluesseln(&self, plaintext: &[u8], seq: u32) -> EngineResult<Vec<u8>> {
        let ring = self.snapshot();
        let key = ring
            .aktiv()
            .ok_or_else(|| EngineError::SideChannel("kein aktiver Live-Schluessel".into()))?;
        Ok(encrypt_frame(plaintext, key, seq)?.to_bytes())
    }

    /// Entschluesselt mit der im Frame genannten Generation
    pub fn entschluesseln(&self, data: &[u8]) -> EngineResult<Vec<u8>> {
        let payload = EncryptedPayload::from_bytes(data)
            .ok_or_else(|| {
                tresor_crypto::CryptoError::UngueltigeDaten("Ungueltiger Frame".into())
            })?;
        let key_id = payload
            .key_id()
            .ok_or_else(|| tresor_crypto::CryptoError::UngueltigeDaten("Frame ohne KeyId".into()))?;

        let ring = self.snapshot();
        if ring.retired.contains(&key_id) {
            return Err(EngineError::SchluesselZurueckgezogen(key_id));
        }
        let key = ring
            .keys
            .get(&key_id)
            .ok_or(EngineError::UnbekannteKeyId(key_id))?;
        Ok(decrypt_frame(&payload, key)?)
    }

    fn snapshot(&self) -> Arc<KeyRing> {
        Arc::clone(&self.inner.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tresor_crypto::KeySchema;

    #[test]
    fn vorherige_generation_bleibt_bis_zum_zurueckziehen_lesbar() {
        let ring = FrameKeyRing::neu();
        let k1 = ContentKey::generate(KeySchema::AKTUELL);
        let k2 = ContentKey::generate(KeySchema::AKTUELL);

        ring.installieren(k1.clone()).unwrap();
        let alt = ring.verschluesseln(b"frame-1", 1).unwrap();
        ring.installieren(k2.clone()).unwrap();
        let neu = ring.verschluesseln(b"frame-2", 2).unwrap();

        assert_eq!(ring.entschluesseln(&alt).unwrap(), b"frame-1");
        assert_eq!(ring.entschluesseln(&neu).unwrap(), b"frame-2");

        ring.zurueckziehen(&k1.key_id).unwrap();
        assert!(matches!(
            ring.entschluesseln(&alt),
            Err(EngineError::SchluesselZurueckgezogen(_))
        ));
        assert!(!ring.bekannt_machen(k1), "zurueckgezogen bleibt zurueckgezogen");
    }

    #[test]
    fn aktiver_schluessel_kann_nicht_zurueckgezogen_werden() {
        let ring = FrameKeyRing::neu();
        let k = ContentKey::generate(KeySchema::AKTUELL);
        ring.installieren(k.clone()).unwrap();
        assert!(matches!(
            ring.zurueckziehen(&k.key_id),
            Err(EngineError::AktiverSchluessel(_))
        ));
        assert_eq!(ring.aktive_key_id(), Some(k.key_id));
    }

    #[test]
    fn unbekannte_generation_und_fehlender_schluessel() {
        let ring = FrameKeyRing::neu();
        assert!(ring.verschluesseln(b"x", 0).is_err());

        let fremd = FrameKeyRing::neu();
        fremd.installieren(ContentKey::generate(KeySchema::AKTUELL)).unwrap();
        let frame = fremd.verschluesseln(b"x", 0).unwrap();
        assert!(matches!(
            ring.entschluesseln(&frame),
            Err(EngineError::UnbekannteKeyId(_))
        ));
    }

    #[test]
    fn bekannt_aber_nicht_aktiv() {
        let ring = FrameKeyRing::neu();
        let k1 = ContentKey::generate(KeySchema::AKTUELL);
        let k2 = ContentKey::generate(KeySchema::AKTUELL);
        ring.installieren(k1.clone()).unwrap();
        assert!(ring.bekannt_machen(k2.clone()));
        assert!(ring.kennt(&k2.key_id));
        assert_eq!(ring.aktive_key_id(), Some(k1.key_id));
        ring.aktivieren(&k2.key_id).unwrap();
        assert_eq!(ring.aktiv(), Some(k2));
    }
}
