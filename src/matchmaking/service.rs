//! Matchmaking service - places connections into matches and drives them

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::time::{sleep_until, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::game::catalog::{timing, Mode};
use crate::game::r#match::MatchHandle;
use crate::game::{
    ActionError, ConnId, Deferred, Envelope, Match, MatchId, MatchOutcome, Target, TimerTask,
};
use crate::util::time::{server_millis, Timer, SIMULATION_TPS, TICK_MS};
use crate::ws::protocol::{ClientMsg, ServerMsg};
use crate::ws::transport::Transport;

use super::leaderboard::Leaderboard;
use super::registry::MatchRegistry;
use super::vote::{pick_candidates, VoteError, VoteSession};

/// Matchmaking service
pub struct MatchmakingService {
    registry: Arc<MatchRegistry>,
    transport: Arc<dyn Transport>,
    leaderboard: Leaderboard,
    /// Open ballots keyed by the match that ended
    votes: DashMap<MatchId, VoteSession>,
    /// Map of connection -> current match
    members: DashMap<ConnId, MatchId>,
    /// Held from capacity check to join so matches never overfill
    placement: Mutex<()>,
}

impl MatchmakingService {
    pub fn new(registry: Arc<MatchRegistry>, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
            leaderboard: Leaderboard::new(),
            votes: DashMap::new(),
            members: DashMap::new(),
            placement: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &MatchRegistry {
        &self.registry
    }

    pub fn leaderboard(&self) -> &Leaderboard {
        &self.leaderboard
    }

    /// Get connection's current match
    pub fn current_match(&self, conn: &ConnId) -> Option<MatchHandle> {
        let id = *self.members.get(conn)?;
        self.registry.get(&id)
    }

    /// Route one parsed client message
    pub fn dispatch(self: &Arc<Self>, conn: ConnId, msg: ClientMsg) {
        match msg {
            ClientMsg::Join { name, mode } => {
                self.join(conn, name.as_deref(), mode.unwrap_or_default());
            }
            ClientMsg::Leave => self.leave(conn),
            ClientMsg::Vote { map } => {
                if let Err(e) = self.vote(conn, &map) {
                    debug!(conn_id = %conn, map = %map, error = %e, "Vote rejected");
                }
            }
            intent => {
                let Some(handle) = self.current_match(&conn) else {
                    debug!(conn_id = %conn, "Intent from connection outside any match");
                    return;
                };
                let result = self.with_match(&handle, |game, now| apply_intent(game, conn, intent, now));
                if let Err(e) = result {
                    debug!(match_id = handle.id, conn_id = %conn, error = %e, "Intent rejected");
                }
            }
        }
    }

    /// Place a connection in a match of `mode`
    pub fn join(self: &Arc<Self>, conn: ConnId, name: Option<&str>, mode: Mode) -> MatchHandle {
        if self.members.contains_key(&conn) {
            self.leave(conn);
        }

        let _placement = self.placement.lock();
        loop {
            let handle = self.registry.find_or_create(mode);
            self.transport.join_room(handle.id, conn);
            // A fresh match also flushes its creation outbox (the clock expiry) here
            if self.with_match(&handle, |game, now| game.join(conn, name, now)) {
                self.members.insert(conn, handle.id);
                return handle;
            }
            // Ended between lookup and lock; the synced flag keeps it out of the next lookup
            self.transport.leave_room(handle.id, conn);
            debug!(match_id = handle.id, conn_id = %conn, "Match ended during placement, retrying");
        }
    }

    /// Remove a connection from its match, if any
    pub fn leave(self: &Arc<Self>, conn: ConnId) {
        let Some((_, match_id)) = self.members.remove(&conn) else {
            return;
        };
        self.transport.leave_room(match_id, conn);
        if let Some(handle) = self.registry.get(&match_id) {
            self.with_match(&handle, |game, _| game.leave(conn));
        }
    }

    /// Socket closed
    pub fn disconnect(self: &Arc<Self>, conn: ConnId) {
        self.leave(conn);
    }

    pub fn vote(&self, conn: ConnId, map: &str) -> Result<(), VoteError> {
        let match_id = self.members.get(&conn).map(|m| *m).ok_or(VoteError::NoSession)?;
        let tally = {
            let mut session = self.votes.get_mut(&match_id).ok_or(VoteError::NoSession)?;
            session.cast(conn, map)?
        };
        self.transport
            .broadcast(match_id, &ServerMsg::VoteUpdate { tally }, None);
        Ok(())
    }

    /// Run `f` under the match lock and carry out everything it produced
    pub fn with_match<R>(
        self: &Arc<Self>,
        handle: &MatchHandle,
        f: impl FnOnce(&mut Match, u64) -> R,
    ) -> R {
        let (result, deferred, outcome) = {
            let mut game = handle.state.lock();
            let result = f(&mut game, server_millis());
            handle.sync_counters(&game);

            let outbox = game.take_outbox();
            // Delivered under the lock so per-match ordering holds
            for envelope in outbox.envelopes {
                self.deliver(handle.id, envelope);
            }
            (result, outbox.deferred, outbox.outcome)
        };

        for task in deferred {
            self.schedule(handle, task);
        }
        if let Some(outcome) = outcome {
            self.conclude(handle, outcome);
        }
        result
    }

    fn deliver(&self, match_id: MatchId, envelope: Envelope) {
        match envelope.target {
            Target::Player(conn) => self.transport.send_to(conn, &envelope.msg),
            Target::Room => self.transport.broadcast(match_id, &envelope.msg, None),
            Target::RoomExcept(conn) => {
                self.transport.broadcast(match_id, &envelope.msg, Some(conn))
            }
        }
    }

    fn schedule(self: &Arc<Self>, handle: &MatchHandle, deferred: Deferred) {
        let deadline = Instant::now() + Duration::from_millis(deferred.delay_ms);
        let service = Arc::clone(self);
        let match_id = handle.id;
        let task: TimerTask = deferred.task;
        tokio::spawn(async move {
            sleep_until(deadline).await;
            // Retired matches drop their pending timers
            let Some(handle) = service.registry.get(&match_id) else {
                debug!(match_id, task = ?task, "Timer fired for retired match");
                return;
            };
            service.with_match(&handle, |game, now| game.fire_timer(task, now));
        });
    }

    fn after(self: &Arc<Self>, delay_ms: u64, job: impl FnOnce(&Arc<Self>) + Send + 'static) {
        let deadline = Instant::now() + Duration::from_millis(delay_ms);
        let service = Arc::clone(self);
        tokio::spawn(async move {
            sleep_until(deadline).await;
            job(&service);
        });
    }

    fn conclude(self: &Arc<Self>, handle: &MatchHandle, outcome: MatchOutcome) {
        let match_id = handle.id;
        match outcome {
            MatchOutcome::Finished(summary) => {
                self.leaderboard.record(&summary.results);
                let mode = summary.mode;
                self.after(timing::VOTE_OPEN_DELAY_MS, move |s| s.open_vote(match_id, mode));
                self.after(timing::RESULT_GRACE_MS, move |s| s.retire(match_id));
            }
            MatchOutcome::Abandoned => {
                info!(match_id, mode = %handle.mode, "Match abandoned");
                self.retire(match_id);
            }
        }
    }

    fn open_vote(self: &Arc<Self>, match_id: MatchId, mode: Mode) {
        let candidates = pick_candidates(&mut rand::thread_rng());
        self.votes
            .insert(match_id, VoteSession::new(mode, candidates.clone()));

        info!(match_id, mode = %mode, candidates = ?candidates, "Map vote opened");
        let seconds = timing::VOTE_WINDOW_MS / 1000;
        self.transport
            .broadcast(match_id, &ServerMsg::VoteStart { candidates, seconds }, None);
        self.after(timing::VOTE_WINDOW_MS, move |s| s.close_vote(match_id));
    }

    fn close_vote(&self, match_id: MatchId) {
        let Some((_, session)) = self.votes.remove(&match_id) else {
            return;
        };
        let Some(winner) = session.winner() else {
            return;
        };

        info!(match_id, mode = %session.mode, map = %winner, "Map vote closed");
        self.registry.set_next_map(session.mode, winner);
        self.transport.broadcast(
            match_id,
            &ServerMsg::VoteEnd { winner, mode: session.mode },
            None,
        );
    }

    fn retire(&self, match_id: MatchId) {
        self.registry.remove(&match_id);
        self.transport.close_room(match_id);
        self.members.retain(|_, m| *m != match_id);
        debug!(match_id, "Match removed from registry");
    }

    /// Run the simulation loop at the fixed tick rate
    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(tps = SIMULATION_TPS, "Simulation loop started");

        loop {
            interval.tick().await;
            let timer = Timer::new();

            let handles = self.registry.active_handles();
            for handle in &handles {
                self.with_match(handle, |game, now| game.tick(now));
            }

            let elapsed = timer.elapsed_micros();
            if elapsed > TICK_MS * 1000 {
                warn!(elapsed_us = elapsed, matches = handles.len(), "Simulation tick overran");
            }
        }
    }
}

fn apply_intent(game: &mut Match, conn: ConnId, intent: ClientMsg, now: u64) -> Result<(), ActionError> {
    match intent {
        ClientMsg::Move { x, z, angle } => game.move_player(conn, x, z, angle, now),
        ClientMsg::Shoot { weapon_key, angle, pitch } => {
            game.shoot(conn, &weapon_key, angle, pitch, now).map(|_| ())
        }
        ClientMsg::Melee => game.melee(conn, now).map(|_| ()),
        ClientMsg::Grenade { x, z, vx, vy, vz } => game.throw_grenade(conn, x, z, (vx, vy, vz), now),
        ClientMsg::Airstrike { x, z } => game.call_airstrike(conn, x, z),
        ClientMsg::Pickup { id } => game.take_pickup(conn, id),
        ClientMsg::SwitchWeapon { index } => game.switch_weapon(conn, index),
        ClientMsg::DropWeapon { index } => game.drop_weapon(conn, index).map(|_| ()),
        ClientMsg::BuyItem { item_key } => {
            // Refusals are answered with shopResult by the shop itself
            let _ = game.buy(conn, &item_key, now);
            Ok(())
        }
        ClientMsg::Join { .. } | ClientMsg::Leave | ClientMsg::Vote { .. } => Ok(()),
    }
}
