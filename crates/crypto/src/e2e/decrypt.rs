//! Entschluesselung mit einem Content-Key
//!
//! Verifiziert den Auth-Tag und prueft vorab, dass die KeyId in der AAD zur
//! Generation des uebergebenen Schluessels passt.

use super::aead;
use crate::error::{CryptoError, CryptoResult};
use crate::types::{ContentKey, EncryptedPayload};

pub(crate) fn decrypt_with_key(
    payload: &EncryptedPayload,
    key: &ContentKey,
) -> CryptoResult<Vec<u8>> {
    let payload_key_id = payload
        .key_id()
        .ok_or_else(|| CryptoError::UngueltigeDaten("AAD ohne KeyId".to_string()))?;
    if payload_key_id != key.key_id {
        return Err(CryptoError::KeyIdMismatch {
            erwartet: key.key_id.to_string(),
            erhalten: payload_key_id.to_string(),
        });
    }

    aead::decrypt(
        key.algorithm(),
        key.key.as_bytes(),
        payload.nonce.as_bytes(),
        &payload.ciphertext,
        &payload.aad,
    )
}

/// Entschluesselt einen Live-Frame
pub fn decrypt_frame(payload: &EncryptedPayload, key: &ContentKey) -> CryptoResult<Vec<u8>> {
    decrypt_with_key(payload, key)
}

/// Entschluesselt rohe Bytes (ohne EncryptedPayload-Wrapper)
pub fn decrypt_frame_bytes(data: &[u8], key: &ContentKey) -> CryptoResult<Vec<u8>> {
    let payload = EncryptedPayload::from_bytes(data)
        .ok_or_else(|| CryptoError::UngueltigeDaten("Ungueltige Payload-Struktur".to_string()))?;
    decrypt_with_key(&payload, key)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::e2e::encrypt::encrypt_frame;
    use crate::types::KeySchema;

    #[test]
    fn roundtrip_aktuelles_schema() {
        let key = ContentKey::generate(KeySchema::Bound);
        let payload = encrypt_frame(b"Hallo Frame", &key, 1).unwrap();
        assert_eq!(decrypt_frame(&payload, &key).unwrap(), b"Hallo Frame");
    }

    #[test]
    fn roundtrip_legacy_schema_ueber_bytes() {
        let key = ContentKey::generate(KeySchema::Legacy);
        let bytes = encrypt_frame(b"ChaCha-Frame", &key, 3).unwrap().to_bytes();
        assert_eq!(decrypt_frame_bytes(&bytes, &key).unwrap(), b"ChaCha-Frame");
    }

    #[test]
    fn andere_generation_liefert_key_id_mismatch() {
        let k1 = ContentKey::generate(KeySchema::Bound);
        let k2 = ContentKey::generate(KeySchema::Bound);
        let payload = encrypt_frame(b"x", &k1, 1).unwrap();
        assert!(matches!(
            decrypt_frame(&payload, &k2),
            Err(CryptoError::KeyIdMismatch { .. })
        ));
    }

    #[test]
    fn manipulierter_ciphertext_schlaegt_fehl() {
        let key = ContentKey::generate(KeySchema::Bound);
        let mut payload = encrypt_frame(b"Originaldaten", &key, 1).unwrap();
        payload.ciphertext[0] ^= 0x01;
        assert!(matches!(
            decrypt_frame(&payload, &key),
            Err(CryptoError::Entschluesselung(_))
        ));
    }

    #[test]
    fn ungueltige_bytes_schlagen_fehl() {
        let key = ContentKey::generate(KeySchema::Bound);
        assert!(decrypt_frame_bytes(&[0u8; 3], &key).is_err());
    }
}
