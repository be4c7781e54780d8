//! Gemeinsame Identifikationstypen fuer Tresor
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen. Auf dem Draht
//! sind alle IDs einfache Strings (`#[serde(transparent)]`), da der Relay
//! sie vergibt und das Format nicht vorschreibt.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige Benutzer-ID (vom Relay vergeben)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

/// ID eines Kontexts (Organisation/Arbeitsbereich, dem Container angehoeren)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(pub String);

impl ContextId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "context:{}", self.0)
    }
}

/// ID einer Ressource (Container oder Element innerhalb eines Containers)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Erstellt eine neue zufaellige ResourceId
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "resource:{}", self.0)
    }
}

/// Opake Schluessel-ID einer Content-Key-Generation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId(pub String);

impl KeyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Erstellt eine neue zufaellige KeyId (32 Hex-Zeichen)
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Zusammengesetzte Identitaet `(contextId, resourceId)` eines Schluessels
///
/// Verbindet einen verschluesselten Payload mit dem Schluessel-Satz, der ihn
/// oeffnen kann. Wird in jeden eingewickelten Schluessel eingebunden, damit
/// ein Schluessel einer Ressource nicht fuer eine andere verwendet wird.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyLocation {
    pub context_id: ContextId,
    pub resource_id: ResourceId,
}

impl KeyLocation {
    pub fn new(context_id: ContextId, resource_id: ResourceId) -> Self {
        Self {
            context_id,
            resource_id,
        }
    }

    /// Kanonische Byte-Darstellung fuer AAD und Hashes
    ///
    /// Laengen-praefixiert, damit `("ab", "c")` und `("a", "bc")` verschieden sind.
    pub fn to_bytes(&self) -> Vec<u8> {
        let ctx = self.context_id.as_str().as_bytes();
        let res = self.resource_id.as_str().as_bytes();
        let mut out = Vec::with_capacity(8 + ctx.len() + res.len());
        out.extend_from_slice(&(ctx.len() as u32).to_be_bytes());
        out.extend_from_slice(ctx);
        out.extend_from_slice(&(res.len() as u32).to_be_bytes());
        out.extend_from_slice(res);
        out
    }
}

impl std::fmt::Display for KeyLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.context_id.as_str(), self.resource_id.as_str())
    }
}
