//! tresor-engine – Gruppen-Schluesselverwaltung und Inhalts-Integritaet
//!
//! Mitglieder eines Containers teilen einen symmetrischen Content-Key, der
//! pro Mitglied mit dessen oeffentlichem Schluessel eingewickelt wird. Der
//! Relay speichert und verteilt nur Chiffrate und eingewickelte Eintraege.
//!
//! ## Architektur
//!
//! ```text
//! EngineSession (pro Anmeldung, mit shutdown())
//!     |
//!     +-- KeyProvider          (erzeugen, einwickeln, aufloesen, Secret-Bindung)
//!     +-- IntegrityValidator   (Provenienz erstellen, Bindung, Duplikate)
//!     +-- VerifierHandle       (austauschbarer Authentizitaets-Pruefer)
//!     +-- KeyCache             (Snapshots pro Location, Rotations-Sperre)
//!     +-- RekeyProtocol        (Rotation oder Ergaenzung bei Mitgliederaenderung)
//!     +-- LiveGroupRekeying    (pro Live-Raum, Side-Channel)
//!     |
//!     v
//! RelayGateway (RPC, von der Einbettung bereitgestellt)
//! ```

pub mod error;
pub mod events;
pub mod gateway;
pub mod integrity;
pub mod key_cache;
pub mod key_provider;
pub mod live;
pub mod rekey;
pub mod session;
pub mod verifier;

// Bequeme Re-Exporte
pub use error::{EngineError, EngineResult};
pub use events::EventBus;
pub use gateway::{retry_once_on_stale_key, RelayError, RelayGateway};
pub use integrity::{CreateOptions, CreatorOverride, IntegrityValidator};
pub use key_cache::{ContainerKeys, KeyCache};
pub use key_provider::{
    KeyIdSelector, KeyProvider, KeyResolution, KeyResolutionRequest, ResolutionMap,
};
pub use live::{LiveGroupRekeying, LiveSignaling, LiveState, UpdateOutcome};
pub use rekey::{MembershipChange, RekeyPlan, RekeyProtocol};
pub use session::EngineSession;
pub use verifier::{AcceptAllVerifier, UserVerifier, VerifierHandle};
