//! Langzeit-Identitaetsschluessel (Ed25519)
//!
//! Jeder Benutzer besitzt bereits ein Ed25519-Schluessel-Paar. Der
//! oeffentliche Schluessel wird als Base58 der DER-kodierten
//! SubjectPublicKeyInfo ausgetauscht. Fuer das Einwickeln von Schluesseln
//! wird daraus ein X25519-Schluessel abgeleitet (Edwards -> Montgomery).

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::OsRng;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

use crate::error::{CryptoError, CryptoResult};

/// DER-Praefix einer Ed25519-SubjectPublicKeyInfo (OID 1.3.101.112)
const SPKI_PRAEFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
];

/// Langzeit-Identitaet eines Benutzers (Ed25519)
pub struct Identity {
    signing_key: SigningKey,
}

/// Oeffentliche Identitaet (nur Verifying Key)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicIdentity {
    verifying_key: VerifyingKey,
}

impl Identity {
    /// Generiert ein neues Ed25519-Schluessel-Paar
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Erstellt eine Identity aus einem privaten Schluessel (32 Bytes)
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(bytes),
        }
    }

    /// Gibt den privaten Schluessel als Bytes zurueck
    pub fn private_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Gibt die oeffentliche Identitaet zurueck
    pub fn public_identity(&self) -> PublicIdentity {
        PublicIdentity {
            verifying_key: self.signing_key.verifying_key(),
        }
    }

    /// Signiert Daten mit dem privaten Schluessel
    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        self.signing_key.sign(data).to_bytes().to_vec()
    }

    /// X25519-Geheimnis fuer das Auswickeln von Schluessel-Eintraegen
    pub fn x25519_secret(&self) -> StaticSecret {
        StaticSecret::from(self.signing_key.to_scalar_bytes())
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Identity {{ public_key: {} }}", self.public_identity().to_base58())
    }
}

impl PublicIdentity {
    /// Erstellt eine oeffentliche Identitaet aus rohen 32 Bytes
    ///
    /// Schlaegt fehl wenn die Bytes keinen gueltigen Edwards-Punkt darstellen.
    pub fn from_bytes(bytes: &[u8; 32]) -> CryptoResult<Self> {
        let verifying_key = VerifyingKey::from_bytes(bytes)
            .map_err(|e| CryptoError::UngueltigerSchluessel(e.to_string()))?;
        Ok(Self { verifying_key })
    }

    /// Parst das Base58-SPKI-Format
    pub fn from_base58(s: &str) -> CryptoResult<Self> {
        let der = bs58::decode(s)
            .into_vec()
            .map_err(|e| CryptoError::UngueltigerSchluessel(format!("Base58: {e}")))?;
        if der.len() != SPKI_PRAEFIX.len() + 32 || der[..SPKI_PRAEFIX.len()] != SPKI_PRAEFIX {
            return Err(CryptoError::UngueltigerSchluessel(
                "keine Ed25519-SubjectPublicKeyInfo".to_string(),
            ));
        }
        let mut raw = [0u8; 32];
        raw.copy_from_slice(&der[SPKI_PRAEFIX.len()..]);
        Self::from_bytes(&raw)
    }

    /// Base58 der DER-kodierten SubjectPublicKeyInfo
    pub fn to_base58(&self) -> String {
        let mut der = Vec::with_capacity(SPKI_PRAEFIX.len() + 32);
        der.extend_from_slice(&SPKI_PRAEFIX);
        der.extend_from_slice(self.verifying_key.as_bytes());
        bs58::encode(der).into_string()
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Abgeleiteter X25519-Schluessel fuer das Einwickeln
    pub fn x25519(&self) -> X25519PublicKey {
        X25519PublicKey::from(self.verifying_key.to_montgomery().to_bytes())
    }

    /// Verifiziert eine Ed25519-Signatur
    pub fn verify(&self, data: &[u8], signature_bytes: &[u8]) -> bool {
        let Ok(sig_array) = <[u8; 64]>::try_from(signature_bytes) else {
            return false;
        };
        let signature = Signature::from_bytes(&sig_array);
        self.verifying_key.verify(data, &signature).is_ok()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
