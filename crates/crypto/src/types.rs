//! Gemeinsame Typen fuer das Kryptografie-Subsystem

use rand_core::{OsRng, RngCore};
use tresor_core::types::KeyId;

use crate::error::{CryptoError, CryptoResult};

/// Sicherer Schluessel-Container (wird beim Drop genullt)
#[derive(Clone, PartialEq, Eq)]
pub struct SecretBytes(Vec<u8>);

impl Drop for SecretBytes {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretBytes([REDACTED] {} bytes)", self.0.len())
    }
}

impl SecretBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// 32 zufaellige Bytes aus dem OS-Zufallsgenerator
    pub fn random_32() -> Self {
        let mut bytes = vec![0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// AEAD-Algorithmus fuer Inhalte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AeadAlgorithm {
    #[default]
    Aes256Gcm,
    ChaCha20Poly1305,
}

/// Schema-Version eines Content-Keys
///
/// Die Container-Art ist Daten, keine Vererbung: das Schema legt den
/// Inhalts-Algorithmus fest. Neue Schluessel werden immer mit dem aktuellen
/// Schema erzeugt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeySchema {
    /// Version 1: ChaCha20-Poly1305
    Legacy,
    /// Version 2: AES-256-GCM
    Bound,
}

impl KeySchema {
    pub const AKTUELL: KeySchema = KeySchema::Bound;

    pub fn version(self) -> u32 {
        match self {
            Self::Legacy => 1,
            Self::Bound => 2,
        }
    }

    pub fn from_version(version: u32) -> CryptoResult<Self> {
        match version {
            1 => Ok(Self::Legacy),
            2 => Ok(Self::Bound),
            other => Err(CryptoError::UnbekanntesSchema(other)),
        }
    }

    pub fn algorithm(self) -> AeadAlgorithm {
        match self {
            Self::Legacy => AeadAlgorithm::ChaCha20Poly1305,
            Self::Bound => AeadAlgorithm::Aes256Gcm,
        }
    }
}

// ---------------------------------------------------------------------------
// ContentKey
// ---------------------------------------------------------------------------

/// Symmetrischer 256-Bit Content-Key einer Generation
///
/// Unveraenderlich und nur im Speicher. Das Schluessel-Material wird beim
/// Drop genullt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentKey {
    pub key_id: KeyId,
    pub key: SecretBytes,
    pub schema: KeySchema,
}

impl ContentKey {
    /// Erstellt einen neuen zufaelligen Schluessel mit frischer KeyId
    pub fn generate(schema: KeySchema) -> Self {
        Self {
            key_id: KeyId::generate(),
            key: SecretBytes::random_32(),
            schema,
        }
    }

    /// Baut einen Schluessel aus bereits bekanntem Material (nach dem Auswickeln)
    pub fn from_parts(key_id: KeyId, key: Vec<u8>, schema: KeySchema) -> CryptoResult<Self> {
        if key.len() != 32 {
            return Err(CryptoError::UngueltigeSchluesselLaenge {
                erwartet: 32,
                erhalten: key.len(),
            });
        }
        Ok(Self {
            key_id,
            key: SecretBytes::new(key),
            schema,
        })
    }

    pub fn algorithm(&self) -> AeadAlgorithm {
        self.schema.algorithm()
    }
}

// ---------------------------------------------------------------------------
// ContainerSecret
// ---------------------------------------------------------------------------

/// Zufaelliger 256-Bit-Wert, einmal pro Container erzeugt
///
/// Jede Schluessel-Generation des Containers ist ueber einen Hash an dieses
/// Secret gebunden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSecret(SecretBytes);

impl ContainerSecret {
    pub fn generate() -> Self {
        Self(SecretBytes::random_32())
    }

    pub fn from_bytes(bytes: Vec<u8>) -> CryptoResult<Self> {
        if bytes.len() != 32 {
            return Err(CryptoError::UngueltigeSchluesselLaenge {
                erwartet: 32,
                erhalten: bytes.len(),
            });
        }
        Ok(Self(SecretBytes::new(bytes)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn to_base64(&self) -> String {
        tresor_protocol::b64::encode(self.as_bytes())
    }

    pub fn from_base64(s: &str) -> CryptoResult<Self> {
        Self::from_bytes(tresor_protocol::b64::decode(s)?)
    }
}

// ---------------------------------------------------------------------------
// Nonce / EncryptedPayload
// ---------------------------------------------------------------------------

/// Eine kryptografische Nonce (Number used once)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonce {
    pub bytes: [u8; 12],
}

impl Nonce {
    /// Erstellt eine Nonce aus Sequenz-Nummer + Zufalls-Bytes
    pub fn aus_seq(seq: u32, random: [u8; 8]) -> Self {
        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&seq.to_be_bytes());
        bytes[4..12].copy_from_slice(&random);
        Self { bytes }
    }

    /// Vollstaendig zufaellige Nonce
    pub fn zufaellig() -> Self {
        let mut bytes = [0u8; 12];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.bytes
    }

    /// Liest die Sequenz-Nummer aus der Nonce
    pub fn seq(&self) -> u32 {
        u32::from_be_bytes([self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3]])
    }
}

/// Verschluesselter Payload (Nonce + Ciphertext + Auth-Tag)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    /// 12 Bytes Nonce
    pub nonce: Nonce,
    /// Verschluesselter Inhalt inkl. 16 Bytes Auth-Tag (angehaengt)
    pub ciphertext: Vec<u8>,
    /// Authenticated Additional Data (enthaelt die KeyId)
    pub aad: Vec<u8>,
}

impl EncryptedPayload {
    /// Serialisiert zu Bytes: [nonce(12)] + [aad_len(2)] + [aad] + [ciphertext]
    pub fn to_bytes(&self) -> Vec<u8> {
        let aad_len = self.aad.len() as u16;
        let mut out = Vec::with_capacity(12 + 2 + self.aad.len() + self.ciphertext.len());
        out.extend_from_slice(&self.nonce.bytes);
        out.extend_from_slice(&aad_len.to_be_bytes());
        out.extend_from_slice(&self.aad);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Deserialisiert aus Bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 14 {
            return None;
        }
        let mut nonce_bytes = [0u8; 12];
        nonce_bytes.copy_from_slice(&bytes[0..12]);
        let nonce = Nonce { bytes: nonce_bytes };

        let aad_len = u16::from_be_bytes([bytes[12], bytes[13]]) as usize;
        if bytes.len() < 14 + aad_len {
            return None;
        }
        let aad = bytes[14..14 + aad_len].to_vec();
        let ciphertext = bytes[14 + aad_len..].to_vec();

        Some(Self { nonce, ciphertext, aad })
    }

    /// KeyId aus der AAD (Praefix `[key_id_len u8][key_id]`)
    pub fn key_id(&self) -> Option<KeyId> {
        let len = *self.aad.first()? as usize;
        let raw = self.aad.get(1..1 + len)?;
        std::str::from_utf8(raw).ok().map(KeyId::new)
    }
}
