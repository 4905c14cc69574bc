//! WebSocket surface

pub mod handler;
pub mod protocol;
pub mod transport;
