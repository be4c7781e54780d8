//! Side-Channel-Nachrichten fuer das Live-Rekeying
//!
//! ## Ablauf
//! - `key_request`: neues Mitglied fragt "wer hat den Schluessel?" (signiert)
//! - `key_response`: Schluessel-Halter antwortet mit frisch eingewickeltem Eintrag
//! - `key_proposal`: Initiator schlaegt neue Generation vor (ein Eintrag pro Mitglied)
//! - `key_ack`: Mitglied bestaetigt die Installation des vorgeschlagenen Schluessels (signiert)
//! - `key_retire`: alte Generation wird endgueltig verworfen
//!
//! Alle Nachrichten tragen den Raum (`room`), damit ein Side-Channel mehrere
//! Raeume multiplexen kann.

use serde::{Deserialize, Serialize};
use tresor_core::types::{KeyId, KeyLocation, UserId};

use crate::error::WireResult;
use crate::keys::WrappedKeyEntry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LiveKeyMessage {
    #[serde(rename_all = "camelCase")]
    KeyRequest {
        request_id: String,
        room: KeyLocation,
        requester: UserId,
        /// Base58-SPKI des Anfragenden
        requester_pub_key: String,
        timestamp: i64,
        /// Ed25519-Signatur ueber `request_signing_bytes`
        #[serde(with = "crate::b64")]
        signature: Vec<u8>,
    },
    #[serde(rename_all = "camelCase")]
    KeyResponse {
        request_id: String,
        room: KeyLocation,
        key_id: KeyId,
        entry: WrappedKeyEntry,
        responder: UserId,
    },
    #[serde(rename_all = "camelCase")]
    KeyProposal {
        proposal_id: String,
        room: KeyLocation,
        key_id: KeyId,
        entries: Vec<WrappedKeyEntry>,
        initiator: UserId,
    },
    #[serde(rename_all = "camelCase")]
    KeyAck {
        proposal_id: String,
        room: KeyLocation,
        key_id: KeyId,
        member: UserId,
        /// Ed25519-Signatur ueber `ack_signing_bytes`
        #[serde(with = "crate::b64")]
        signature: Vec<u8>,
    },
    #[serde(rename_all = "camelCase")]
    KeyRetire {
        room: KeyLocation,
        key_id: KeyId,
        initiator: UserId,
    },
}

impl LiveKeyMessage {
    /// Raum, auf den sich die Nachricht bezieht
    pub fn room(&self) -> &KeyLocation {
        match self {
            Self::KeyRequest { room, .. }
            | Self::KeyResponse { room, .. }
            | Self::KeyProposal { room, .. }
            | Self::KeyAck { room, .. }
            | Self::KeyRetire { room, .. } => room,
        }
    }

    /// Kurzname fuer Logs
    pub fn op(&self) -> &'static str {
        match self {
            Self::KeyRequest { .. } => "key_request",
            Self::KeyResponse { .. } => "key_response",
            Self::KeyProposal { .. } => "key_proposal",
            Self::KeyAck { .. } => "key_ack",
            Self::KeyRetire { .. } => "key_retire",
        }
    }

    pub fn to_json(&self) -> WireResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(s: &str) -> WireResult<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Kanonische Bytes, die der Anfragende einer `key_request` signiert
pub fn request_signing_bytes(
    request_id: &str,
    room: &KeyLocation,
    requester: &UserId,
    timestamp: i64,
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"tresor-live-request-v1");
    out.extend_from_slice(&(request_id.len() as u32).to_be_bytes());
    out.extend_from_slice(request_id.as_bytes());
    out.extend_from_slice(&room.to_bytes());
    out.extend_from_slice(&(requester.as_str().len() as u32).to_be_bytes());
    out.extend_from_slice(requester.as_str().as_bytes());
    out.extend_from_slice(&timestamp.to_be_bytes());
    out
}

/// Kanonische Bytes, die ein Mitglied fuer seinen `key_ack` signiert
pub fn ack_signing_bytes(
    proposal_id: &str,
    room: &KeyLocation,
    key_id: &KeyId,
    member: &UserId,
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"tresor-live-ack-v1");
    out.extend_from_slice(&(proposal_id.len() as u32).to_be_bytes());
    out.extend_from_slice(proposal_id.as_bytes());
    out.extend_from_slice(&room.to_bytes());
    out.extend_from_slice(&(key_id.as_str().len() as u32).to_be_bytes());
    out.extend_from_slice(key_id.as_str().as_bytes());
    out.extend_from_slice(&(member.as_str().len() as u32).to_be_bytes());
    out.extend_from_slice(member.as_str().as_bytes());
    out
}
