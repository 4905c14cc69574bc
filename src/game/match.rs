//! Match state and lifecycle

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f32::consts::TAU;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::ws::protocol::{EndReason, HazardView, PlayerResult, ServerMsg, TeamScore};

use super::catalog::{player as tuning, timing, MapId, Mode, ModeRules, WeaponKey, LAYOUT_PICKUP_CYCLE};
use super::entity::{Hazard, Pickup, Player, Projectile, Team};
use super::snapshot::SnapshotBuilder;
use super::timers::{Deferred, TimerTask};
use super::{ConnId, Envelope, MatchId, Outbox, Target};

/// Team base centres for TDM spawns
const RED_BASE: (f32, f32) = (-30.0, 0.0);
const BLUE_BASE: (f32, f32) = (30.0, 0.0);
const TEAM_SPAWN_SCATTER: f32 = 10.0;
/// Ring FFA/LMS spawns are drawn from
const SPAWN_RING: (f32, f32) = (6.0, 26.0);
/// Pickup ids at or above this are transient (drops, supply crates)
pub const TRANSIENT_PICKUP_BASE: u32 = 10_000;

/// How a match stopped being playable
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Finished(MatchSummary),
    /// Last player left before the end
    Abandoned,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchSummary {
    pub mode: Mode,
    pub map: MapId,
    pub reason: EndReason,
    pub results: Vec<PlayerResult>,
}

/// Authoritative state of one match. Every method is synchronous and takes
/// the current server time; effects are queued in the outbox.
pub struct Match {
    pub id: MatchId,
    pub mode: Mode,
    pub map: MapId,
    pub rules: ModeRules,
    pub active: bool,
    /// LMS end is scheduled
    pub ending: bool,
    pub start_ms: u64,
    /// Join order; "first found" target selection depends on it
    pub players: Vec<Player>,
    pub projectiles: Vec<Projectile>,
    pub hazards: Vec<Hazard>,
    pub pickups: Vec<Pickup>,
    pub zone_radius: Option<f32>,
    pub team_score: Option<TeamScore>,
    pub next_supply_ms: u64,
    next_projectile_id: u32,
    next_pickup_id: u32,
    rng: ChaCha8Rng,
    outbox: Outbox,
}

impl Match {
    pub fn new(id: MatchId, mode: Mode, map: MapId, seed: u64, now: u64) -> Self {
        let rules = mode.rules();

        let pickups = map
            .pickup_spots()
            .iter()
            .enumerate()
            .map(|(i, &(x, z))| Pickup {
                id: i as u32,
                kind: LAYOUT_PICKUP_CYCLE[i % LAYOUT_PICKUP_CYCLE.len()],
                x,
                z,
                active: true,
                transient: false,
            })
            .collect();

        let hazards = map
            .barrel_spots()
            .iter()
            .enumerate()
            .map(|(i, &(x, z))| Hazard {
                id: i as u32,
                x,
                z,
                alive: true,
            })
            .collect();

        let mut game = Self {
            id,
            mode,
            map,
            rules,
            active: true,
            ending: false,
            start_ms: now,
            players: Vec::new(),
            projectiles: Vec::new(),
            hazards,
            pickups,
            zone_radius: rules.zone.map(|z| z.full_radius),
            team_score: (mode == Mode::Tdm).then(TeamScore::default),
            next_supply_ms: now + timing::SUPPLY_INTERVAL_MS,
            next_projectile_id: 0,
            next_pickup_id: TRANSIENT_PICKUP_BASE,
            rng: ChaCha8Rng::seed_from_u64(seed),
            outbox: Outbox::default(),
        };

        if let Some(duration) = rules.duration_ms {
            game.defer(duration, TimerTask::EndMatch(EndReason::TimeUp));
        }

        info!(match_id = id, mode = %mode, map = %map, "Match created");
        game
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    pub fn player(&self, id: &ConnId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == *id)
    }

    pub fn player_mut(&mut self, id: &ConnId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == *id)
    }

    pub(crate) fn player_index(&self, id: &ConnId) -> Option<usize> {
        self.players.iter().position(|p| p.id == *id)
    }

    pub fn alive_count(&self) -> usize {
        self.players.iter().filter(|p| !p.dead).count()
    }

    pub fn elapsed_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.start_ms)
    }

    /// Milliseconds left on the clock, if the mode has one
    pub fn time_left_ms(&self, now: u64) -> Option<u64> {
        self.rules
            .duration_ms
            .map(|d| d.saturating_sub(self.elapsed_ms(now)))
    }

    pub fn hazard_views(&self) -> Vec<HazardView> {
        self.hazards
            .iter()
            .filter(|h| h.alive)
            .map(|h| HazardView { i: h.id, x: h.x, z: h.z })
            .collect()
    }

    // ------------------------------------------------------------------
    // Outbox
    // ------------------------------------------------------------------

    pub(crate) fn send_to(&mut self, id: ConnId, msg: ServerMsg) {
        self.outbox.envelopes.push(Envelope {
            target: Target::Player(id),
            msg,
        });
    }

    pub(crate) fn broadcast(&mut self, msg: ServerMsg) {
        self.outbox.envelopes.push(Envelope {
            target: Target::Room,
            msg,
        });
    }

    pub(crate) fn broadcast_except(&mut self, except: ConnId, msg: ServerMsg) {
        self.outbox.envelopes.push(Envelope {
            target: Target::RoomExcept(except),
            msg,
        });
    }

    pub(crate) fn defer(&mut self, delay_ms: u64, task: TimerTask) {
        self.outbox.deferred.push(Deferred { delay_ms, task });
    }

    /// Drain everything queued since the last call
    pub fn take_outbox(&mut self) -> Outbox {
        std::mem::take(&mut self.outbox)
    }

    pub(crate) fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    pub(crate) fn next_projectile_id(&mut self) -> u32 {
        let id = self.next_projectile_id;
        self.next_projectile_id = self.next_projectile_id.wrapping_add(1);
        id
    }

    pub(crate) fn next_pickup_id(&mut self) -> u32 {
        let id = self.next_pickup_id;
        self.next_pickup_id += 1;
        id
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    /// Add a connection as a player and send it the initial state.
    /// Returns false once the match has ended.
    pub fn join(&mut self, conn: ConnId, name: Option<&str>, now: u64) -> bool {
        if !self.active {
            return false;
        }
        if self.player(&conn).is_some() {
            return true;
        }

        let name = self.sanitize_name(name);
        let team = (self.mode == Mode::Tdm).then(|| self.smaller_team());
        let (x, z) = self.spawn_point(team);

        self.players
            .push(Player::new(conn, name.clone(), team, self.rules.lives, x, z));

        let Some(player) = self.player(&conn) else {
            return false;
        };
        let joined = ServerMsg::Joined {
            player_id: conn,
            match_id: self.id,
            map: self.map,
            mode: self.mode,
            team,
            spawn_x: x,
            spawn_z: z,
            lives: player.lives,
            money: player.money,
            inventory: player.inventory.clone(),
            pickups: self.pickups.iter().filter(|p| p.active).cloned().collect(),
            hazards: self.hazard_views(),
            time_left: self.time_left_ms(now).map(|ms| ms / 1000),
            player_count: self.players.len(),
            snapshot: SnapshotBuilder::build(self, now),
        };

        self.send_to(conn, joined);
        self.broadcast_except(conn, ServerMsg::PJoin { id: conn, name: name.clone(), team });

        info!(
            match_id = self.id,
            conn_id = %conn,
            name = %name,
            player_count = self.players.len(),
            "Player joined match"
        );
        true
    }

    /// Remove a player. Returns true if they were in the match.
    pub fn leave(&mut self, conn: ConnId) -> bool {
        let Some(idx) = self.player_index(&conn) else {
            return false;
        };
        let player = self.players.remove(idx);

        self.broadcast_except(conn, ServerMsg::PLeave { id: conn, name: player.name });

        info!(
            match_id = self.id,
            conn_id = %conn,
            player_count = self.players.len(),
            "Player left match"
        );

        if self.players.is_empty() {
            if self.active {
                self.active = false;
                self.projectiles.clear();
                self.outbox.outcome = Some(MatchOutcome::Abandoned);
            }
        } else {
            self.check_last_standing();
        }
        true
    }

    pub fn is_full(&self, capacity: usize) -> bool {
        self.players.len() >= capacity
    }

    fn sanitize_name(&mut self, name: Option<&str>) -> String {
        let trimmed: String = name
            .unwrap_or_default()
            .trim()
            .chars()
            .take(tuning::MAX_NAME_CHARS)
            .collect();
        if trimmed.is_empty() {
            format!("Player{}", self.rng.gen_range(1000..10_000))
        } else {
            trimmed
        }
    }

    fn smaller_team(&self) -> Team {
        let red = self.players.iter().filter(|p| p.team == Some(Team::Red)).count();
        let blue = self.players.iter().filter(|p| p.team == Some(Team::Blue)).count();
        if red <= blue {
            Team::Red
        } else {
            Team::Blue
        }
    }

    /// Random spawn near the team base, or on the open ring
    pub(crate) fn spawn_point(&mut self, team: Option<Team>) -> (f32, f32) {
        let angle = self.rng.gen_range(0.0..TAU);
        let (cx, cz, dist) = match team {
            Some(t) => {
                let (cx, cz) = if t == Team::Red { RED_BASE } else { BLUE_BASE };
                (cx, cz, self.rng.gen_range(0.0..TEAM_SPAWN_SCATTER))
            }
            None => (0.0, 0.0, self.rng.gen_range(SPAWN_RING.0..SPAWN_RING.1)),
        };
        (cx + angle.sin() * dist, cz + angle.cos() * dist)
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    /// Run a deferred callback. Inactive matches ignore all timers.
    pub fn fire_timer(&mut self, task: TimerTask, now: u64) {
        if !self.active {
            return;
        }

        match task {
            TimerTask::EndMatch(reason) => self.end_match(reason),
            TimerTask::Respawn(id) => self.respawn(id),
            TimerTask::Eliminated(id) => {
                if let Some(p) = self.player(&id) {
                    let msg = ServerMsg::Eliminated { kills: p.kills, deaths: p.deaths };
                    self.send_to(id, msg);
                }
            }
            TimerTask::GrenadeDetonate { owner, x, z } => self.detonate_grenade(owner, x, z, now),
            TimerTask::AirstrikeBlast { owner, x, z } => self.airstrike_blast(owner, x, z, now),
            TimerTask::PickupRespawn(id) => {
                if let Some(p) = self.pickups.iter_mut().find(|p| p.id == id) {
                    p.active = true;
                    let msg = ServerMsg::PickupBack { id, kind: p.kind, x: p.x, z: p.z };
                    self.broadcast(msg);
                }
            }
            TimerTask::PickupDespawn(id) => {
                if let Some(idx) = self.pickups.iter().position(|p| p.id == id && p.active) {
                    self.pickups.remove(idx);
                    self.broadcast(ServerMsg::PickupGone { id });
                }
            }
        }
    }

    fn respawn(&mut self, id: ConnId) {
        let Some(idx) = self.player_index(&id) else {
            return;
        };
        if !self.players[idx].dead || self.players[idx].lives == 0 {
            return;
        }

        let (x, z) = self.spawn_point(self.players[idx].team);
        let p = &mut self.players[idx];
        p.x = x;
        p.z = z;
        p.health = tuning::MAX_HEALTH;
        p.dead = false;
        p.invincible_ms = timing::RESPAWN_INVINCIBLE_MS;
        p.last_damager = None;
        if let Some(grenades) = p.slot_mut(WeaponKey::Grenade) {
            let count = grenades.ammo.get_or_insert(0);
            if *count < tuning::STARTING_GRENADES {
                *count += 1;
            }
        }

        let msg = ServerMsg::Respawned {
            x,
            z,
            inventory: p.inventory.clone(),
            money: p.money,
        };
        self.send_to(id, msg);
    }

    /// Schedule the LMS end once at most one player is standing
    pub(crate) fn check_last_standing(&mut self) {
        if self.mode != Mode::Lms || !self.active || self.ending {
            return;
        }
        if self.alive_count() <= 1 {
            self.ending = true;
            self.defer(timing::LMS_END_DELAY_MS, TimerTask::EndMatch(EndReason::LastStanding));
        }
    }

    /// Stop the match and publish results. Only the first call has effect.
    pub fn end_match(&mut self, reason: EndReason) {
        if !self.active {
            return;
        }
        self.active = false;
        self.projectiles.clear();

        let results = self.results();
        let (winner, winning_team) = match self.mode {
            Mode::Lms => (
                self.players.iter().find(|p| !p.dead).map(|p| p.name.clone()),
                None,
            ),
            Mode::Tdm => {
                let team = self.team_score.and_then(|s| s.leader());
                let best = team.and_then(|t| results.iter().find(|r| r.team == Some(t)));
                (best.map(|r| r.name.clone()), team)
            }
            Mode::Ffa => (results.first().map(|r| r.name.clone()), None),
        };

        info!(
            match_id = self.id,
            reason = ?reason,
            winner = ?winner,
            players = self.players.len(),
            "Match ended"
        );

        self.broadcast(ServerMsg::MatchEnd {
            reason,
            winner,
            winning_team,
            results: results.clone(),
        });

        self.outbox.outcome = Some(MatchOutcome::Finished(MatchSummary {
            mode: self.mode,
            map: self.map,
            reason,
            results,
        }));
    }

    /// Final standings, best killer first
    pub fn results(&self) -> Vec<PlayerResult> {
        let mut rows: Vec<PlayerResult> = self
            .players
            .iter()
            .map(|p| PlayerResult {
                name: p.name.clone(),
                kills: p.kills,
                deaths: p.deaths,
                assists: p.assists,
                money: p.money,
                team: p.team,
            })
            .collect();
        rows.sort_by(|a, b| b.kills.cmp(&a.kills));
        rows
    }
}

/// Shared handle to a live match
#[derive(Clone)]
pub struct MatchHandle {
    pub id: MatchId,
    pub mode: Mode,
    pub map: MapId,
    pub state: Arc<Mutex<Match>>,
    pub player_count: Arc<AtomicUsize>,
    pub active: Arc<AtomicBool>,
}

impl MatchHandle {
    pub fn new(game: Match) -> Self {
        Self {
            id: game.id,
            mode: game.mode,
            map: game.map,
            player_count: Arc::new(AtomicUsize::new(game.players.len())),
            active: Arc::new(AtomicBool::new(game.active)),
            state: Arc::new(Mutex::new(game)),
        }
    }

    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    /// Mirror lock-protected counters for lock-free readers
    pub fn sync_counters(&self, game: &Match) {
        self.player_count.store(game.players.len(), Ordering::Relaxed);
        self.active.store(game.active, Ordering::Relaxed);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use uuid::Uuid;

    pub(crate) fn new_match(mode: Mode) -> Match {
        Match::new(1, mode, MapId::Forest, 7, 0)
    }

    /// Join `n` players and clear the outbox
    pub(crate) fn with_players(mode: Mode, n: usize) -> (Match, Vec<ConnId>) {
        let mut game = new_match(mode);
        let ids: Vec<ConnId> = (0..n).map(|_| Uuid::new_v4()).collect();
        for (i, id) in ids.iter().enumerate() {
            game.join(*id, Some(&format!("p{i}")), 0);
        }
        game.take_outbox();
        (game, ids)
    }

    /// Put a player at a fixed spot, out of spawn protection
    pub(crate) fn place(game: &mut Match, id: ConnId, x: f32, z: f32) {
        let p = game.player_mut(&id).unwrap();
        p.x = x;
        p.z = z;
        p.invincible_ms = 0;
    }

    #[test]
    fn new_match_lays_out_map() {
        let game = new_match(Mode::Ffa);
        assert_eq!(game.pickups.len(), MapId::Forest.pickup_spots().len());
        assert_eq!(game.hazards.len(), MapId::Forest.barrel_spots().len());
        assert!(game.pickups.iter().all(|p| p.active && !p.transient));
        assert_eq!(game.zone_radius, None);
        assert_eq!(game.team_score, None);
        assert_eq!(game.time_left_ms(1_000), Some(599_000));
    }

    #[test]
    fn timed_modes_schedule_their_end() {
        let mut ffa = new_match(Mode::Ffa);
        let out = ffa.take_outbox();
        assert_eq!(
            out.deferred,
            vec![Deferred {
                delay_ms: 600_000,
                task: TimerTask::EndMatch(EndReason::TimeUp)
            }]
        );

        let mut lms = new_match(Mode::Lms);
        assert!(lms.take_outbox().deferred.is_empty());
        assert_eq!(lms.zone_radius, Some(60.0));
    }

    #[test]
    fn join_sends_state_and_announces() {
        let mut game = new_match(Mode::Ffa);
        game.take_outbox();
        let a = Uuid::new_v4();
        game.join(a, Some("  alice  "), 0);

        let out = game.take_outbox();
        assert_eq!(out.envelopes.len(), 2);
        assert_eq!(out.envelopes[0].target, Target::Player(a));
        assert!(matches!(out.envelopes[0].msg, ServerMsg::Joined { lives: 3, money: 200, .. }));
        assert_eq!(out.envelopes[1].target, Target::RoomExcept(a));
        assert_eq!(game.player(&a).unwrap().name, "alice");
    }

    #[test]
    fn ended_match_refuses_joins() {
        let (mut game, _) = with_players(Mode::Ffa, 1);
        game.end_match(EndReason::TimeUp);
        game.take_outbox();

        assert!(!game.join(Uuid::new_v4(), Some("late"), 0));
        assert_eq!(game.players.len(), 1);
        assert!(game.take_outbox().envelopes.is_empty());
    }

    #[test]
    fn names_are_trimmed_capped_or_generated() {
        let mut game = new_match(Mode::Ffa);
        let long = Uuid::new_v4();
        let blank = Uuid::new_v4();
        game.join(long, Some("abcdefghijklmnopqrstuvwxyz"), 0);
        game.join(blank, Some("   "), 0);
        assert_eq!(game.player(&long).unwrap().name.chars().count(), 20);
        assert!(game.player(&blank).unwrap().name.starts_with("Player"));
    }

    #[test]
    fn tdm_balances_teams() {
        let (game, ids) = with_players(Mode::Tdm, 4);
        let red = ids
            .iter()
            .filter(|id| game.player(id).unwrap().team == Some(Team::Red))
            .count();
        assert_eq!(red, 2);
        assert_eq!(game.player(&ids[0]).unwrap().team, Some(Team::Red));
        assert_eq!(game.player(&ids[1]).unwrap().team, Some(Team::Blue));
    }

    #[test]
    fn lms_players_get_one_life() {
        let (game, ids) = with_players(Mode::Lms, 2);
        assert_eq!(game.player(&ids[0]).unwrap().lives, 1);
    }

    #[test]
    fn last_leaver_abandons_the_match() {
        let (mut game, ids) = with_players(Mode::Ffa, 2);
        assert!(game.leave(ids[0]));
        assert!(game.active);
        assert!(game.leave(ids[1]));
        assert!(!game.active);
        assert_eq!(game.take_outbox().outcome, Some(MatchOutcome::Abandoned));
        assert!(!game.leave(ids[1]));
    }

    #[test]
    fn lms_departure_can_leave_one_standing() {
        let (mut game, ids) = with_players(Mode::Lms, 2);
        game.leave(ids[0]);
        assert!(game.ending);
        let out = game.take_outbox();
        assert!(out.deferred.contains(&Deferred {
            delay_ms: timing::LMS_END_DELAY_MS,
            task: TimerTask::EndMatch(EndReason::LastStanding),
        }));
    }

    #[test]
    fn end_match_runs_once() {
        let (mut game, ids) = with_players(Mode::Ffa, 2);
        game.player_mut(&ids[1]).unwrap().kills = 4;
        game.end_match(EndReason::TimeUp);
        game.end_match(EndReason::TimeUp);

        let out = game.take_outbox();
        let ends: Vec<_> = out
            .envelopes
            .iter()
            .filter(|e| matches!(e.msg, ServerMsg::MatchEnd { .. }))
            .collect();
        assert_eq!(ends.len(), 1);
        match &ends[0].msg {
            ServerMsg::MatchEnd { winner, results, .. } => {
                assert_eq!(winner.as_deref(), Some("p1"));
                assert_eq!(results[0].kills, 4);
            }
            _ => unreachable!(),
        }
        assert!(matches!(out.outcome, Some(MatchOutcome::Finished(_))));
    }

    #[test]
    fn timers_are_ignored_once_inactive() {
        let (mut game, ids) = with_players(Mode::Ffa, 2);
        game.player_mut(&ids[0]).unwrap().dead = true;
        game.end_match(EndReason::TimeUp);
        game.take_outbox();

        game.fire_timer(TimerTask::Respawn(ids[0]), 5_000);
        assert!(game.player(&ids[0]).unwrap().dead);
        assert!(game.take_outbox().is_empty());
    }

    #[test]
    fn respawn_restores_player() {
        let (mut game, ids) = with_players(Mode::Ffa, 2);
        {
            let p = game.player_mut(&ids[0]).unwrap();
            p.dead = true;
            p.health = 0.0;
            p.lives = 2;
            p.last_damager = Some(ids[1]);
            p.slot_mut(WeaponKey::Grenade).unwrap().ammo = Some(0);
        }
        game.fire_timer(TimerTask::Respawn(ids[0]), 3_000);

        let p = game.player(&ids[0]).unwrap();
        assert!(!p.dead);
        assert_eq!(p.health, 100.0);
        assert_eq!(p.invincible_ms, timing::RESPAWN_INVINCIBLE_MS);
        assert_eq!(p.last_damager, None);
        assert_eq!(p.slot(WeaponKey::Grenade).unwrap().ammo, Some(1));
        let out = game.take_outbox();
        assert!(matches!(out.envelopes[0].msg, ServerMsg::Respawned { .. }));
    }

    #[test]
    fn despawn_only_removes_unclaimed_pickups() {
        let mut game = new_match(Mode::Ffa);
        game.take_outbox();
        let id = game.next_pickup_id();
        game.pickups.push(Pickup {
            id,
            kind: crate::game::catalog::PickupKind::Supply,
            x: 24.0,
            z: 0.0,
            active: true,
            transient: true,
        });
        game.fire_timer(TimerTask::PickupDespawn(id), 60_000);
        assert!(game.pickups.iter().all(|p| p.id != id));
        assert_eq!(game.take_outbox().envelopes.len(), 1);

        game.fire_timer(TimerTask::PickupDespawn(id), 60_000);
        assert!(game.take_outbox().is_empty());
    }

    #[test]
    fn handle_mirrors_counters() {
        let (game, _) = with_players(Mode::Ffa, 3);
        let handle = MatchHandle::new(game);
        assert_eq!(handle.player_count(), 3);
        assert!(handle.is_active());

        let mut game = handle.state.lock();
        game.end_match(EndReason::TimeUp);
        handle.sync_counters(&game);
        drop(game);
        assert!(!handle.is_active());
    }
}
