//! Matchmaking, map rotation and post-match bookkeeping

pub mod leaderboard;
pub mod registry;
pub mod service;
pub mod vote;

pub use leaderboard::LeaderboardEntry;
pub use registry::MatchRegistry;
pub use service::MatchmakingService;
