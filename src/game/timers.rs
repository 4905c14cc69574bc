//! Deferred match callbacks
//!
//! Timers are requested by match code and run later by the matchmaker. A
//! timer that fires after its match went inactive does nothing.

use crate::ws::protocol::EndReason;

use super::ConnId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimerTask {
    EndMatch(EndReason),
    Respawn(ConnId),
    /// Final-stats notice for a player out of lives
    Eliminated(ConnId),
    GrenadeDetonate { owner: ConnId, x: f32, z: f32 },
    AirstrikeBlast { owner: ConnId, x: f32, z: f32 },
    PickupRespawn(u32),
    /// Remove a transient pickup nobody claimed
    PickupDespawn(u32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deferred {
    pub delay_ms: u64,
    pub task: TimerTask,
}
