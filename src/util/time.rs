//! Time utilities for game simulation

use std::sync::OnceLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time. Measured on the tokio clock so paused test runtimes
/// see advanced time.
static SERVER_START: OnceLock<Instant> = OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Milliseconds since server start. All game timestamps use this clock.
pub fn server_millis() -> u64 {
    let start = *SERVER_START.get_or_init(Instant::now);
    Instant::now().saturating_duration_since(start).as_millis() as u64
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    server_millis() / 1000
}

/// Tick rate configuration
pub const SIMULATION_TPS: u32 = 20; // 20 ticks per second
pub const TICK_MS: u64 = 1000 / SIMULATION_TPS as u64;

/// A simple timer for measuring durations
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_micros(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn server_clock_follows_tokio_time() {
        init_server_time();
        tokio::time::advance(Duration::from_secs(10)).await;

        let before = server_millis();
        tokio::time::advance(Duration::from_millis(2_600)).await;
        assert_eq!(server_millis() - before, 2_600);
    }
}
