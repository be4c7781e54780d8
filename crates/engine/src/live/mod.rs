//! Live-Gruppen-Rekeying fuer Echtzeit-Raeume

pub mod ring;
pub mod room;
pub mod signaling;
pub mod state;

pub use ring::FrameKeyRing;
pub use room::{LiveGroupRekeying, RaumKontext, UpdateOutcome};
pub use signaling::LiveSignaling;
pub use state::LiveState;
