//! Einwickeln von Schluessel-Paketen fuer einzelne Empfaenger
//!
//! ECIES-aehnliches Schema:
//! 1. Ephemeres X25519-Schluessel-Paar generieren
//! 2. DH mit dem (aus Ed25519 abgeleiteten) X25519-Key des Empfaengers
//! 3. HKDF -> Wrapping Key
//! 4. AES-256-GCM mit Aufrufer-AAD verschluesseln
//!
//! ## Format
//! ```text
//! [ephemeral_public(32)] [nonce(12)] [ciphertext + auth_tag(16)]
//! ```

use rand_core::OsRng;
use x25519_dalek::{EphemeralSecret, PublicKey as X25519PublicKey, StaticSecret};

use super::aead;
use super::kdf::hkdf_derive;
use crate::error::{CryptoError, CryptoResult};
use crate::types::{AeadAlgorithm, Nonce, SecretBytes};

const WRAP_INFO: &[u8] = b"tresor-key-wrap-v1";
const MIN_LAENGE: usize = 32 + 12 + 16;

/// Wickelt `plaintext` fuer einen Empfaenger ein
///
/// `aad` wird authentifiziert, aber nicht mitgesendet: der Empfaenger muss
/// dieselbe AAD rekonstruieren koennen.
pub fn wrap_for_recipient(
    plaintext: &[u8],
    recipient: &X25519PublicKey,
    aad: &[u8],
) -> CryptoResult<Vec<u8>> {
    let ephemeral_secret = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_public = X25519PublicKey::from(&ephemeral_secret);

    let dh_output = ephemeral_secret.diffie_hellman(recipient);
    if !dh_output.was_contributory() {
        return Err(CryptoError::UngueltigerSchluessel(
            "Empfaenger-Schluessel liefert kein DH-Geheimnis".to_string(),
        ));
    }

    let wrapping_key = hkdf_derive(dh_output.as_bytes(), recipient.as_bytes(), WRAP_INFO, 32)?;
    let nonce = Nonce::zufaellig();
    let ciphertext = aead::encrypt(
        AeadAlgorithm::Aes256Gcm,
        &wrapping_key,
        nonce.as_bytes(),
        plaintext,
        aad,
    )?;

    let mut out = Vec::with_capacity(32 + 12 + ciphertext.len());
    out.extend_from_slice(ephemeral_public.as_bytes());
    out.extend_from_slice(nonce.as_bytes());
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Wickelt ein Paket mit dem eigenen X25519-Geheimnis aus
pub fn unwrap_for_recipient(
    wrapped: &[u8],
    secret: &StaticSecret,
    aad: &[u8],
) -> CryptoResult<SecretBytes> {
    if wrapped.len() < MIN_LAENGE {
        return Err(CryptoError::UngueltigeDaten(
            "Zu kurzer wrapped key".to_string(),
        ));
    }

    let mut ephemeral_pub_bytes = [0u8; 32];
    ephemeral_pub_bytes.copy_from_slice(&wrapped[0..32]);
    let mut nonce_bytes = [0u8; 12];
    nonce_bytes.copy_from_slice(&wrapped[32..44]);
    let ciphertext = &wrapped[44..];

    let ephemeral_pub = X25519PublicKey::from(ephemeral_pub_bytes);
    let dh_output = secret.diffie_hellman(&ephemeral_pub);

    let recipient_pub = X25519PublicKey::from(secret);
    let wrapping_key = hkdf_derive(dh_output.as_bytes(), recipient_pub.as_bytes(), WRAP_INFO, 32)?;

    let plaintext = aead::decrypt(
        AeadAlgorithm::Aes256Gcm,
        &wrapping_key,
        &nonce_bytes,
        ciphertext,
        aad,
    )?;
    Ok(SecretBytes::new(plaintext))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;

    #[test]
    fn wrap_und_unwrap_roundtrip() {
        let empfaenger = Identity::generate();
        let wrapped =
            wrap_for_recipient(b"schluessel-paket", &empfaenger.public_identity().x25519(), b"aad")
                .unwrap();

        let unwrapped =
            unwrap_for_recipient(&wrapped, &empfaenger.x25519_secret(), b"aad").unwrap();
        assert_eq!(unwrapped.as_bytes(), b"schluessel-paket");
    }

    #[test]
    fn falscher_empfaenger_schlaegt_fehl() {
        let empfaenger = Identity::generate();
        let fremder = Identity::generate();
        let wrapped =
            wrap_for_recipient(b"paket", &empfaenger.public_identity().x25519(), b"aad").unwrap();

        assert!(unwrap_for_recipient(&wrapped, &fremder.x25519_secret(), b"aad").is_err());
    }

    #[test]
    fn falsche_aad_schlaegt_fehl() {
        let empfaenger = Identity::generate();
        let wrapped =
            wrap_for_recipient(b"paket", &empfaenger.public_identity().x25519(), b"ort-a").unwrap();

        assert!(unwrap_for_recipient(&wrapped, &empfaenger.x25519_secret(), b"ort-b").is_err());
    }

    #[test]
    fn zu_kurzer_wrapped_key_schlaegt_fehl() {
        let empfaenger = Identity::generate();
        let result = unwrap_for_recipient(&[0u8; 10], &empfaenger.x25519_secret(), b"");
        assert!(matches!(result, Err(CryptoError::UngueltigeDaten(_))));
    }

    #[test]
    fn nullpunkt_wird_abgelehnt() {
        let null = X25519PublicKey::from([0u8; 32]);
        assert!(wrap_for_recipient(b"paket", &null, b"").is_err());
    }
}
