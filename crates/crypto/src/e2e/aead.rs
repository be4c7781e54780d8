//! AEAD-Primitive (AES-256-GCM und ChaCha20-Poly1305)

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Key, Nonce as AesNonce,
};
use chacha20poly1305::{ChaCha20Poly1305, Key as ChaChaKey, Nonce as ChaChaNonce};

use crate::error::{CryptoError, CryptoResult};
use crate::types::AeadAlgorithm;

fn schluessel_laenge_pruefen(key_bytes: &[u8]) -> CryptoResult<()> {
    if key_bytes.len() != 32 {
        return Err(CryptoError::UngueltigeSchluesselLaenge {
            erwartet: 32,
            erhalten: key_bytes.len(),
        });
    }
    Ok(())
}

pub(crate) fn encrypt(
    algorithm: AeadAlgorithm,
    key_bytes: &[u8],
    nonce_bytes: &[u8; 12],
    plaintext: &[u8],
    aad: &[u8],
) -> CryptoResult<Vec<u8>> {
    schluessel_laenge_pruefen(key_bytes)?;
    let payload = Payload { msg: plaintext, aad };
    match algorithm {
        AeadAlgorithm::Aes256Gcm => {
            let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key_bytes));
            cipher.encrypt(AesNonce::from_slice(nonce_bytes), payload)
        }
        AeadAlgorithm::ChaCha20Poly1305 => {
            let cipher = ChaCha20Poly1305::new(ChaChaKey::from_slice(key_bytes));
            cipher.encrypt(ChaChaNonce::from_slice(nonce_bytes), payload)
        }
    }
    .map_err(|e| CryptoError::Verschluesselung(e.to_string()))
}

pub(crate) fn decrypt(
    algorithm: AeadAlgorithm,
    key_bytes: &[u8],
    nonce_bytes: &[u8; 12],
    ciphertext: &[u8],
    aad: &[u8],
) -> CryptoResult<Vec<u8>> {
    schluessel_laenge_pruefen(key_bytes)?;
    let payload = Payload {
        msg: ciphertext,
        aad,
    };
    match algorithm {
        AeadAlgorithm::Aes256Gcm => {
            let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key_bytes));
            cipher.decrypt(AesNonce::from_slice(nonce_bytes), payload)
        }
        AeadAlgorithm::ChaCha20Poly1305 => {
            let cipher = ChaCha20Poly1305::new(ChaChaKey::from_slice(key_bytes));
            cipher.decrypt(ChaChaNonce::from_slice(nonce_bytes), payload)
        }
    }
    .map_err(|e| CryptoError::Entschluesselung(e.to_string()))
}
