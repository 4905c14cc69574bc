//! Game simulation modules

pub mod actions;
pub mod catalog;
pub mod combat;
pub mod entity;
pub mod r#match;
pub mod physics;
pub mod shop;
pub mod snapshot;
pub mod tick;
pub mod timers;

pub use actions::ActionError;
pub use r#match::{Match, MatchOutcome};
pub use timers::{Deferred, TimerTask};

use uuid::Uuid;

use crate::ws::protocol::ServerMsg;

/// Connection identity; stable for the lifetime of a socket
pub type ConnId = Uuid;

/// Registry-issued match number
pub type MatchId = u64;

/// Recipient of an outbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Player(ConnId),
    /// Everyone joined to the match channel
    Room,
    RoomExcept(ConnId),
}

#[derive(Debug, Clone)]
pub struct Envelope {
    pub target: Target,
    pub msg: ServerMsg,
}

/// Side effects collected while a match is locked, delivered by the matchmaker
#[derive(Debug, Default)]
pub struct Outbox {
    pub envelopes: Vec<Envelope>,
    pub deferred: Vec<Deferred>,
    pub outcome: Option<MatchOutcome>,
}

impl Outbox {
    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty() && self.deferred.is_empty() && self.outcome.is_none()
    }
}
