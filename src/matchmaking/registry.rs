//! Live match registry and map rotation

use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use crate::game::catalog::{MapId, Mode};
use crate::game::r#match::MatchHandle;
use crate::game::{Match, MatchId};
use crate::util::time::server_millis;

/// Players per match before a new one is opened
pub const DEFAULT_MATCH_CAPACITY: usize = 50;

pub struct MatchRegistry {
    matches: DashMap<MatchId, MatchHandle>,
    next_id: AtomicU64,
    capacity: usize,
    /// Serializes creation; holds per-mode rotation cursors
    rotation: Mutex<HashMap<Mode, usize>>,
    /// Vote winners waiting for the next match of their mode
    next_maps: DashMap<Mode, MapId>,
}

impl MatchRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            matches: DashMap::new(),
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
            rotation: Mutex::new(HashMap::new()),
            next_maps: DashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Lowest-id open match of `mode` with room, or a fresh one
    pub fn find_or_create(&self, mode: Mode) -> MatchHandle {
        let mut rotation = self.rotation.lock();

        let open = self
            .matches
            .iter()
            .filter(|h| h.mode == mode && h.is_active() && h.player_count() < self.capacity)
            .min_by_key(|h| h.id)
            .map(|h| h.clone());
        if let Some(handle) = open {
            return handle;
        }

        let map = match self.next_maps.remove(&mode) {
            Some((_, voted)) => voted,
            None => {
                let cursor = rotation.entry(mode).or_insert(0);
                let map = MapId::ALL[*cursor % MapId::ALL.len()];
                *cursor += 1;
                map
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let seed = rand::random::<u64>();
        let handle = MatchHandle::new(Match::new(id, mode, map, seed, server_millis()));
        self.matches.insert(id, handle.clone());

        info!(match_id = id, mode = %mode, map = %map, "Created new match");
        handle
    }

    pub fn get(&self, id: &MatchId) -> Option<MatchHandle> {
        self.matches.get(id).map(|h| h.clone())
    }

    pub fn remove(&self, id: &MatchId) -> Option<MatchHandle> {
        self.matches.remove(id).map(|(_, h)| h)
    }

    /// Map the next match of `mode` is created on
    pub fn set_next_map(&self, mode: Mode, map: MapId) {
        self.next_maps.insert(mode, map);
    }

    pub fn next_map_override(&self, mode: Mode) -> Option<MapId> {
        self.next_maps.get(&mode).map(|m| *m)
    }

    /// Active handles, lowest id first
    pub fn active_handles(&self) -> Vec<MatchHandle> {
        let mut handles: Vec<MatchHandle> = self
            .matches
            .iter()
            .filter(|h| h.is_active())
            .map(|h| h.clone())
            .collect();
        handles.sort_by_key(|h| h.id);
        handles
    }

    pub fn active_matches(&self) -> usize {
        self.matches.iter().filter(|h| h.is_active()).count()
    }

    pub fn total_players(&self) -> usize {
        self.matches
            .iter()
            .filter(|h| h.is_active())
            .map(|h| h.player_count())
            .sum()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }
}

impl Default for MatchRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_CAPACITY)
    }
}
