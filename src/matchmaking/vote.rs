//! Post-match map vote

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;

use crate::game::catalog::{timing, MapId, Mode};
use crate::game::ConnId;
use crate::ws::protocol::VoteCount;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoteError {
    #[error("No vote in progress")]
    NoSession,
    #[error("Unknown map: {0}")]
    UnknownMap(String),
    #[error("Map is not on the ballot")]
    NotCandidate,
    #[error("Already voted")]
    AlreadyVoted,
}

/// Draw distinct maps for the ballot
pub fn pick_candidates<R: Rng + ?Sized>(rng: &mut R) -> Vec<MapId> {
    MapId::ALL
        .choose_multiple(rng, timing::VOTE_CANDIDATES)
        .copied()
        .collect()
}

/// One open ballot, keyed by the match that just ended
#[derive(Debug, Clone)]
pub struct VoteSession {
    pub mode: Mode,
    pub candidates: Vec<MapId>,
    ballots: HashMap<ConnId, MapId>,
}

impl VoteSession {
    pub fn new(mode: Mode, candidates: Vec<MapId>) -> Self {
        Self {
            mode,
            candidates,
            ballots: HashMap::new(),
        }
    }

    /// Record a ballot and return the updated tally
    pub fn cast(&mut self, conn: ConnId, map: &str) -> Result<Vec<VoteCount>, VoteError> {
        let map: MapId = map.parse().map_err(|_| VoteError::UnknownMap(map.to_string()))?;
        if !self.candidates.contains(&map) {
            return Err(VoteError::NotCandidate);
        }
        if self.ballots.contains_key(&conn) {
            return Err(VoteError::AlreadyVoted);
        }
        self.ballots.insert(conn, map);
        Ok(self.tally())
    }

    /// Votes per candidate, in ballot order
    pub fn tally(&self) -> Vec<VoteCount> {
        self.candidates
            .iter()
            .map(|&map| VoteCount {
                map,
                votes: self.ballots.values().filter(|&&m| m == map).count() as u32,
            })
            .collect()
    }

    /// Plurality winner; earlier candidates win ties
    pub fn winner(&self) -> Option<MapId> {
        let mut best: Option<VoteCount> = None;
        for count in self.tally() {
            match &best {
                Some(b) if b.votes >= count.votes => {}
                _ => best = Some(count),
            }
        }
        best.map(|c| c.map)
    }
}
