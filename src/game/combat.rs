//! Combat resolution - damage, kills, economy, killstreaks, blasts

use tracing::debug;

use crate::ws::protocol::{EndReason, ServerMsg, StreakReward};

use super::catalog::{blast, economy, timing, Falloff, Mode, WeaponKey, WeaponKind};
use super::entity::{ArmorTier, InventorySlot};
use super::physics::PhysicsSystem;
use super::timers::TimerTask;
use super::{ConnId, Match};

/// What dealt the damage, for the kill feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cause {
    Weapon(WeaponKey),
    Barrel,
    Airstrike,
    Zone,
}

impl Cause {
    pub fn label(self) -> &'static str {
        match self {
            Cause::Weapon(key) => key.as_str(),
            Cause::Barrel => "barrel",
            Cause::Airstrike => "airstrike",
            Cause::Zone => "zone",
        }
    }
}

/// One damage request against a victim
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Strike {
    pub attacker: Option<ConnId>,
    pub amount: u32,
    /// Set when the hit landed in the head band
    pub headshot_mult: Option<f32>,
    pub cause: Cause,
}

impl Strike {
    pub fn new(attacker: Option<ConnId>, amount: u32, cause: Cause) -> Self {
        Self {
            attacker,
            amount,
            headshot_mult: None,
            cause,
        }
    }

    pub fn headshot(mut self, mult: f32) -> Self {
        self.headshot_mult = Some(mult);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageOutcome {
    pub dealt: u32,
    pub killed: bool,
}

/// Stateless damage arithmetic
pub struct CombatSystem;

impl CombatSystem {
    /// Base damage scaled by distance travelled
    pub fn ranged_damage(base: u32, falloff: Option<&Falloff>, traveled: f32) -> u32 {
        let factor = falloff.map_or(1.0, |f| f.factor(traveled));
        (base as f32 * factor).round() as u32
    }

    /// Headshot multiplier, then armor, each rounded
    pub fn final_damage(amount: u32, headshot_mult: Option<f32>, armor: ArmorTier) -> u32 {
        let mut dmg = amount as f32;
        if let Some(mult) = headshot_mult {
            dmg = (dmg * mult).round();
        }
        if let Some(factor) = armor.mitigation() {
            dmg = (dmg * factor).round();
        }
        dmg as u32
    }

    /// Linear falloff from the centre, zero at and past the radius
    pub fn blast_damage(damage: u32, distance: f32, radius: f32) -> u32 {
        if distance >= radius {
            return 0;
        }
        (damage as f32 * (1.0 - distance / radius)).round() as u32
    }
}

impl Match {
    /// Run one hit through the damage pipeline. Returns `None` when the
    /// strike was ignored.
    pub fn apply_damage(&mut self, victim: ConnId, strike: Strike, now: u64) -> Option<DamageOutcome> {
        if !self.active {
            return None;
        }

        let attacker_team = strike
            .attacker
            .and_then(|a| self.player(&a))
            .and_then(|a| a.team);
        let idx = self.player_index(&victim)?;
        let target = &mut self.players[idx];
        if !target.is_targetable() {
            return None;
        }
        if self.mode == Mode::Tdm && attacker_team.is_some() && attacker_team == target.team {
            return None;
        }

        let dealt = CombatSystem::final_damage(strike.amount, strike.headshot_mult, target.upgrades.armor);
        let previous_damager = target.last_damager;
        if let Some(attacker) = strike.attacker {
            target.last_damager = Some(attacker);
        }
        target.health = (target.health - dealt as f32).max(0.0);
        let hp = target.health;
        let killed = hp <= 0.0;
        let headshot = strike.headshot_mult.is_some();

        self.send_to(victim, ServerMsg::Hit { hp, dmg: dealt, headshot });
        if let Some(attacker) = strike.attacker.filter(|a| *a != victim) {
            self.send_to(
                attacker,
                ServerMsg::HitMarker {
                    target: victim,
                    dmg: dealt,
                    headshot,
                    kill: killed,
                },
            );
        }

        if killed {
            self.resolve_kill(idx, strike, previous_damager, now);
        } else {
            self.broadcast(ServerMsg::PHurt { id: victim, hp });
        }

        Some(DamageOutcome { dealt, killed })
    }

    fn resolve_kill(&mut self, victim_idx: usize, strike: Strike, previous_damager: Option<ConnId>, now: u64) {
        let victim = &mut self.players[victim_idx];
        victim.dead = true;
        victim.health = 0.0;
        victim.lives = victim.lives.saturating_sub(1);
        victim.deaths += 1;
        victim.streak = 0;
        victim.speed_until = 0;
        victim.minigun_until = 0;
        victim.airstrike_ready = false;
        victim.revoke_streak_weapon();

        let victim_id = victim.id;
        let victim_name = victim.name.clone();
        let lives = victim.lives;

        let killer_idx = strike
            .attacker
            .filter(|a| *a != victim_id)
            .and_then(|a| self.player_index(&a));

        let mut killer_name = None;
        if let Some(k) = killer_idx {
            let killer_id = self.players[k].id;
            killer_name = Some(self.players[k].name.clone());
            self.award(k, economy::KILL_BOUNTY, "KILL");
            self.players[k].kills += 1;

            let assister = previous_damager
                .filter(|p| *p != killer_id && *p != victim_id)
                .and_then(|p| self.player_index(&p));
            if let Some(a) = assister {
                self.players[a].assists += 1;
                self.award(a, economy::ASSIST_BOUNTY, "ASSIST");
            }

            // A grenade can land after its thrower died
            if !self.players[k].dead {
                self.advance_streak(k, now);
            }
        }

        debug!(
            match_id = self.id,
            victim = %victim_id,
            killer = ?strike.attacker,
            cause = strike.cause.label(),
            "Player killed"
        );

        let killer = killer_idx.map(|k| self.players[k].id);
        self.broadcast(ServerMsg::Kill {
            killer,
            killer_name,
            victim: victim_id,
            victim_name,
            cause: strike.cause.label(),
        });
        let money = self.players[victim_idx].money;
        self.send_to(victim_id, ServerMsg::YouDied { lives, money });

        if lives > 0 {
            self.defer(timing::RESPAWN_DELAY_MS, TimerTask::Respawn(victim_id));
        } else {
            self.defer(timing::ELIMINATION_NOTICE_MS, TimerTask::Eliminated(victim_id));
        }

        if let Some(k) = killer_idx {
            self.score_team_kill(k);
        }
        self.check_last_standing();
    }

    fn award(&mut self, idx: usize, amount: u32, reason: &'static str) {
        let p = &mut self.players[idx];
        p.money += amount;
        let msg = ServerMsg::EarnMoney {
            amount,
            total: p.money,
            reason,
        };
        let id = p.id;
        self.send_to(id, msg);
    }

    /// Kill ladder; each threshold is crossed once per life
    fn advance_streak(&mut self, idx: usize, now: u64) {
        let match_id = self.id;
        let p = &mut self.players[idx];
        p.streak += 1;
        let streak = p.streak;

        let reward = match streak {
            economy::STREAK_SPEED_AT => {
                p.speed_until = now + economy::STREAK_SPEED_MS;
                StreakReward::Speed
            }
            economy::STREAK_AIRSTRIKE_AT => {
                p.airstrike_ready = true;
                StreakReward::Airstrike
            }
            economy::STREAK_MINIGUN_AT => {
                if let Some(slot) = p.slot_mut(WeaponKey::Minigun) {
                    let ammo = slot.ammo.get_or_insert(0);
                    *ammo += economy::STREAK_MINIGUN_AMMO;
                    p.streak_bonus_ammo += economy::STREAK_MINIGUN_AMMO;
                } else if !p.slots_full() {
                    p.inventory.push(InventorySlot {
                        weapon: WeaponKey::Minigun,
                        ammo: Some(economy::STREAK_MINIGUN_AMMO),
                        streak_grant: true,
                    });
                } else {
                    debug!(match_id, conn_id = %p.id, "No free slot for streak minigun");
                    return;
                }
                p.minigun_until = now + economy::STREAK_MINIGUN_MS;
                StreakReward::Minigun
            }
            _ => return,
        };

        let id = p.id;
        self.send_to(id, ServerMsg::StreakReward { streak, reward });
    }

    fn score_team_kill(&mut self, killer_idx: usize) {
        let (Some(team), Some(mut score)) = (self.players[killer_idx].team, self.team_score) else {
            return;
        };
        let total = score.add(team);
        self.team_score = Some(score);
        self.broadcast(ServerMsg::TeamScore(score));

        if self.rules.score_limit.is_some_and(|limit| total >= limit) {
            self.end_match(EndReason::ScoreLimit);
        }
    }

    /// Radial damage to every player inside `radius`, owner included
    pub(crate) fn area_damage(
        &mut self,
        x: f32,
        z: f32,
        radius: f32,
        damage: u32,
        attacker: Option<ConnId>,
        cause: Cause,
        now: u64,
    ) {
        let hits: Vec<(ConnId, u32)> = self
            .players
            .iter()
            .map(|p| (p.id, CombatSystem::blast_damage(damage, p.horizontal_dist(x, z), radius)))
            .filter(|(_, amount)| *amount > 0)
            .collect();

        for (victim, amount) in hits {
            self.apply_damage(victim, Strike::new(attacker, amount, cause), now);
        }
    }

    /// Blow up a barrel once and pulse its blast
    pub(crate) fn destroy_hazard(&mut self, idx: usize, destroyer: Option<ConnId>, now: u64) {
        let Some(barrel) = self.hazards.get_mut(idx).filter(|h| h.alive) else {
            return;
        };
        barrel.alive = false;
        let (x, z) = (barrel.x, barrel.z);

        self.broadcast(ServerMsg::Explosion { x, z, big: true });
        self.area_damage(
            x,
            z,
            blast::BARREL_RADIUS,
            blast::BARREL_DAMAGE,
            destroyer,
            Cause::Barrel,
            now,
        );
    }

    /// Destroy every alive barrel whose centre lies inside the radius
    fn chain_hazards(&mut self, x: f32, z: f32, radius: f32, destroyer: ConnId, now: u64) {
        let caught: Vec<usize> = self
            .hazards
            .iter()
            .enumerate()
            .filter(|(_, h)| h.alive && (h.x - x).hypot(h.z - z) < radius)
            .map(|(i, _)| i)
            .collect();
        for idx in caught {
            self.destroy_hazard(idx, Some(destroyer), now);
        }
    }

    pub(crate) fn detonate_rocket(&mut self, owner: ConnId, x: f32, z: f32, now: u64) {
        let def = WeaponKey::Rocket.def();
        let WeaponKind::Rocket { blast_radius, .. } = def.kind else {
            return;
        };
        self.broadcast(ServerMsg::Explosion { x, z, big: true });
        self.area_damage(x, z, blast_radius, def.damage, Some(owner), Cause::Weapon(WeaponKey::Rocket), now);
        self.chain_hazards(x, z, blast_radius, owner, now);
    }

    pub(crate) fn detonate_grenade(&mut self, owner: ConnId, x: f32, z: f32, now: u64) {
        let def = WeaponKey::Grenade.def();
        let WeaponKind::Throw { blast_radius, .. } = def.kind else {
            return;
        };
        self.broadcast(ServerMsg::Explosion { x, z, big: false });
        self.area_damage(x, z, blast_radius, def.damage, Some(owner), Cause::Weapon(WeaponKey::Grenade), now);
        self.chain_hazards(x, z, blast_radius, owner, now);
    }

    pub(crate) fn airstrike_blast(&mut self, owner: ConnId, x: f32, z: f32, now: u64) {
        if !PhysicsSystem::in_arena(x, z) {
            return;
        }
        self.broadcast(ServerMsg::Explosion { x, z, big: true });
        self.area_damage(
            x,
            z,
            blast::AIRSTRIKE_RADIUS,
            blast::AIRSTRIKE_DAMAGE,
            Some(owner),
            Cause::Airstrike,
            now,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::r#match::tests::{place, with_players};
    use crate::game::timers::Deferred;
    use crate::game::Target;

    fn rifle(attacker: ConnId, amount: u32) -> Strike {
        Strike::new(Some(attacker), amount, Cause::Weapon(WeaponKey::Rifle))
    }

    #[test]
    fn falloff_scenario() {
        let rifle = WeaponKey::Rifle.def().ballistics().unwrap();
        assert_eq!(CombatSystem::ranged_damage(22, rifle.falloff.as_ref(), 50.0), 14);
        assert_eq!(CombatSystem::ranged_damage(22, rifle.falloff.as_ref(), 5.0), 22);
        assert_eq!(CombatSystem::ranged_damage(90, None, 80.0), 90);
    }

    #[test]
    fn headshot_then_armor() {
        assert_eq!(CombatSystem::final_damage(30, Some(2.2), ArmorTier::Heavy), 33);
        assert_eq!(CombatSystem::final_damage(22, None, ArmorTier::Light), 17);
        assert_eq!(CombatSystem::final_damage(22, None, ArmorTier::None), 22);
    }

    #[test]
    fn blast_is_zero_at_radius() {
        assert_eq!(CombatSystem::blast_damage(100, 0.0, 6.0), 100);
        assert_eq!(CombatSystem::blast_damage(100, 3.0, 6.0), 50);
        assert_eq!(CombatSystem::blast_damage(100, 6.0, 6.0), 0);
        assert_eq!(CombatSystem::blast_damage(100, 9.0, 6.0), 0);
    }

    #[test]
    fn heavy_armor_headshot_leaves_67() {
        let (mut game, ids) = with_players(Mode::Ffa, 2);
        place(&mut game, ids[1], 5.0, 5.0);
        game.player_mut(&ids[1]).unwrap().upgrades.armor = ArmorTier::Heavy;

        let out = game.apply_damage(ids[1], rifle(ids[0], 30).headshot(2.2), 0);
        assert_eq!(out, Some(DamageOutcome { dealt: 33, killed: false }));
        assert_eq!(game.player(&ids[1]).unwrap().health, 67.0);

        let msgs = game.take_outbox().envelopes;
        assert!(matches!(msgs[0].msg, ServerMsg::Hit { dmg: 33, headshot: true, .. }));
        assert_eq!(msgs[1].target, Target::Player(ids[0]));
        assert!(matches!(msgs[1].msg, ServerMsg::HitMarker { kill: false, .. }));
        assert!(matches!(msgs[2].msg, ServerMsg::PHurt { hp, .. } if hp == 67.0));
    }

    #[test]
    fn invincible_dead_and_inactive_are_ignored() {
        let (mut game, ids) = with_players(Mode::Ffa, 2);
        assert!(game.player(&ids[1]).unwrap().invincible_ms == 0);
        game.player_mut(&ids[1]).unwrap().invincible_ms = 500;
        assert_eq!(game.apply_damage(ids[1], rifle(ids[0], 10), 0), None);

        game.player_mut(&ids[1]).unwrap().invincible_ms = 0;
        game.player_mut(&ids[1]).unwrap().dead = true;
        assert_eq!(game.apply_damage(ids[1], rifle(ids[0], 10), 0), None);

        game.player_mut(&ids[1]).unwrap().dead = false;
        game.end_match(EndReason::TimeUp);
        assert_eq!(game.apply_damage(ids[1], rifle(ids[0], 10), 0), None);
    }

    #[test]
    fn no_friendly_fire_in_tdm() {
        let (mut game, ids) = with_players(Mode::Tdm, 3);
        // ids[0] and ids[2] are red
        assert_eq!(game.apply_damage(ids[2], rifle(ids[0], 50), 0), None);
        assert_eq!(game.apply_damage(ids[0], rifle(ids[0], 50), 0), None);
        assert!(game.apply_damage(ids[1], rifle(ids[0], 50), 0).is_some());
        assert_eq!(game.player(&ids[2]).unwrap().health, 100.0);
    }

    #[test]
    fn self_damage_counts_in_ffa_without_bounty() {
        let (mut game, ids) = with_players(Mode::Ffa, 2);
        let out = game.apply_damage(ids[0], rifle(ids[0], 150), 0).unwrap();
        assert!(out.killed);

        let p = game.player(&ids[0]).unwrap();
        assert_eq!(p.kills, 0);
        assert_eq!(p.money, 200);
        assert_eq!(p.deaths, 1);
        let msgs = game.take_outbox().envelopes;
        assert!(!msgs.iter().any(|e| matches!(e.msg, ServerMsg::HitMarker { .. })));
        assert!(msgs
            .iter()
            .any(|e| matches!(e.msg, ServerMsg::Kill { killer: None, .. })));
    }

    #[test]
    fn kill_pays_bounty_and_assist() {
        let (mut game, ids) = with_players(Mode::Ffa, 3);
        let (killer, helper, victim) = (ids[0], ids[1], ids[2]);

        game.apply_damage(victim, rifle(helper, 40), 0);
        let out = game.apply_damage(victim, rifle(killer, 60), 0).unwrap();
        assert!(out.killed);

        assert_eq!(game.player(&killer).unwrap().money, 350);
        assert_eq!(game.player(&killer).unwrap().kills, 1);
        assert_eq!(game.player(&helper).unwrap().money, 250);
        assert_eq!(game.player(&helper).unwrap().assists, 1);

        let v = game.player(&victim).unwrap();
        assert!(v.dead);
        assert_eq!(v.lives, 2);
        assert_eq!(v.health, 0.0);

        let out = game.take_outbox();
        assert!(out.deferred.contains(&Deferred {
            delay_ms: timing::RESPAWN_DELAY_MS,
            task: TimerTask::Respawn(victim),
        }));
    }

    #[test]
    fn no_assist_when_killer_was_last_damager() {
        let (mut game, ids) = with_players(Mode::Ffa, 2);
        game.apply_damage(ids[1], rifle(ids[0], 50), 0);
        game.apply_damage(ids[1], rifle(ids[0], 50), 0);
        assert_eq!(game.player(&ids[0]).unwrap().assists, 0);
        assert_eq!(game.player(&ids[0]).unwrap().money, 350);
    }

    #[test]
    fn streak_ladder_fires_once_per_threshold() {
        let (mut game, ids) = with_players(Mode::Ffa, 2);
        let (hunter, prey) = (ids[0], ids[1]);

        for kill in 1..=7u64 {
            let p = game.player_mut(&prey).unwrap();
            p.dead = false;
            p.health = 100.0;
            p.lives = 3;
            game.apply_damage(prey, rifle(hunter, 100), kill * 1_000);
        }

        let h = game.player(&hunter).unwrap();
        assert_eq!(h.streak, 7);
        assert!(h.speed_until > 0);
        assert!(h.airstrike_ready);
        assert_eq!(h.minigun_until, 7_000 + economy::STREAK_MINIGUN_MS);
        let mini = h.slot(WeaponKey::Minigun).unwrap();
        assert!(mini.streak_grant);
        assert_eq!(mini.ammo, Some(economy::STREAK_MINIGUN_AMMO));

        let rewards: Vec<StreakReward> = game
            .take_outbox()
            .envelopes
            .into_iter()
            .filter_map(|e| match e.msg {
                ServerMsg::StreakReward { reward, .. } => Some(reward),
                _ => None,
            })
            .collect();
        assert_eq!(
            rewards,
            vec![StreakReward::Speed, StreakReward::Airstrike, StreakReward::Minigun]
        );
    }

    fn kill_repeatedly(game: &mut Match, hunter: ConnId, prey: ConnId, kills: u64) {
        for kill in 1..=kills {
            let p = game.player_mut(&prey).unwrap();
            p.dead = false;
            p.health = 100.0;
            p.lives = 3;
            game.apply_damage(prey, rifle(hunter, 100), kill * 1_000);
        }
    }

    #[test]
    fn streak_minigun_tops_up_owned_gun() {
        let (mut game, ids) = with_players(Mode::Ffa, 2);
        game.player_mut(&ids[0])
            .unwrap()
            .inventory
            .push(InventorySlot::new(WeaponKey::Minigun, Some(50)));

        kill_repeatedly(&mut game, ids[0], ids[1], 7);
        let h = game.player(&ids[0]).unwrap();
        let mini = h.slot(WeaponKey::Minigun).unwrap();
        assert!(!mini.streak_grant);
        assert_eq!(mini.ammo, Some(50 + economy::STREAK_MINIGUN_AMMO));
        assert_eq!(h.streak_bonus_ammo, economy::STREAK_MINIGUN_AMMO);
        assert_eq!(h.minigun_until, 7_000 + economy::STREAK_MINIGUN_MS);
    }

    #[test]
    fn streak_minigun_needs_a_free_slot() {
        let (mut game, ids) = with_players(Mode::Ffa, 2);
        {
            let p = game.player_mut(&ids[0]).unwrap();
            for w in [WeaponKey::Pistol, WeaponKey::Shotgun, WeaponKey::Rifle, WeaponKey::Smg] {
                p.inventory.push(InventorySlot::new(w, Some(1)));
            }
        }

        kill_repeatedly(&mut game, ids[0], ids[1], 7);
        let h = game.player(&ids[0]).unwrap();
        assert_eq!(h.streak, 7);
        assert!(h.slot(WeaponKey::Minigun).is_none());
        assert_eq!(h.minigun_until, 0);
        assert_eq!(h.streak_bonus_ammo, 0);
        assert!(!game.take_outbox().envelopes.iter().any(|e| matches!(
            e.msg,
            ServerMsg::StreakReward { reward: StreakReward::Minigun, .. }
        )));
    }

    #[test]
    fn dead_killer_gets_kill_but_no_streak() {
        let (mut game, ids) = with_players(Mode::Ffa, 2);
        {
            let k = game.player_mut(&ids[0]).unwrap();
            k.dead = true;
            k.streak = 2;
        }

        let out = game.apply_damage(ids[1], rifle(ids[0], 100), 0).unwrap();
        assert!(out.killed);
        let k = game.player(&ids[0]).unwrap();
        assert_eq!(k.kills, 1);
        assert_eq!(k.streak, 2);
        assert_eq!(k.speed_until, 0);
    }

    #[test]
    fn death_clears_streak_rewards() {
        let (mut game, ids) = with_players(Mode::Ffa, 2);
        {
            let p = game.player_mut(&ids[0]).unwrap();
            p.streak = 7;
            p.airstrike_ready = true;
            p.speed_until = 10_000;
            p.minigun_until = 20_000;
            p.inventory.push(InventorySlot {
                weapon: WeaponKey::Minigun,
                ammo: Some(200),
                streak_grant: true,
            });
            p.weapon_idx = 3;
        }
        game.apply_damage(ids[0], rifle(ids[1], 100), 0);

        let p = game.player(&ids[0]).unwrap();
        assert_eq!(p.streak, 0);
        assert!(!p.airstrike_ready);
        assert_eq!(p.speed_until, 0);
        assert!(p.slot(WeaponKey::Minigun).is_none());
        assert!(p.weapon_idx < p.inventory.len());
    }

    #[test]
    fn tdm_score_limit_ends_match() {
        let (mut game, ids) = with_players(Mode::Tdm, 2);
        game.team_score = Some(crate::ws::protocol::TeamScore { red: 49, blue: 0 });
        game.apply_damage(ids[1], rifle(ids[0], 100), 0);

        assert!(!game.active);
        let out = game.take_outbox();
        assert!(out.envelopes.iter().any(|e| matches!(
            e.msg,
            ServerMsg::MatchEnd {
                reason: EndReason::ScoreLimit,
                winning_team: Some(crate::game::entity::Team::Red),
                ..
            }
        )));
    }

    #[test]
    fn lms_last_elimination_schedules_end() {
        let (mut game, ids) = with_players(Mode::Lms, 3);
        game.apply_damage(ids[1], rifle(ids[0], 100), 0);
        assert!(!game.ending);
        game.apply_damage(ids[2], rifle(ids[0], 100), 0);
        assert!(game.ending);

        let out = game.take_outbox();
        let ends = out
            .deferred
            .iter()
            .filter(|d| d.task == TimerTask::EndMatch(EndReason::LastStanding))
            .count();
        assert_eq!(ends, 1);
        assert!(out.deferred.contains(&Deferred {
            delay_ms: timing::ELIMINATION_NOTICE_MS,
            task: TimerTask::Eliminated(ids[2]),
        }));

        game.fire_timer(TimerTask::EndMatch(EndReason::LastStanding), 3_000);
        let out = game.take_outbox();
        assert!(out.envelopes.iter().any(|e| matches!(
            &e.msg,
            ServerMsg::MatchEnd { winner: Some(w), .. } if w == "p0"
        )));
    }

    #[test]
    fn barrel_blast_is_credited_and_chains_once() {
        let (mut game, ids) = with_players(Mode::Ffa, 2);
        let (bx, bz) = (game.hazards[0].x, game.hazards[0].z);
        place(&mut game, ids[1], bx + 1.0, bz);

        game.destroy_hazard(0, Some(ids[0]), 0);
        game.destroy_hazard(0, Some(ids[0]), 0);

        assert!(!game.hazards[0].alive);
        // 80 * (1 - 1/5)
        assert_eq!(game.player(&ids[1]).unwrap().health, 36.0);
        let explosions = game
            .take_outbox()
            .envelopes
            .iter()
            .filter(|e| matches!(e.msg, ServerMsg::Explosion { .. }))
            .count();
        assert_eq!(explosions, 1);
    }

    #[test]
    fn rocket_blast_hurts_owner_and_destroys_barrels() {
        let (mut game, ids) = with_players(Mode::Ffa, 2);
        let (bx, bz) = (game.hazards[0].x, game.hazards[0].z);
        place(&mut game, ids[0], bx + 3.0, bz);
        place(&mut game, ids[1], 50.0, 50.0);

        game.detonate_rocket(ids[0], bx, bz, 0);

        assert!(!game.hazards[0].alive);
        // Rocket 50 plus barrel 32
        assert_eq!(game.player(&ids[0]).unwrap().health, 18.0);
        assert_eq!(game.player(&ids[1]).unwrap().health, 100.0);
    }

    #[test]
    fn grenade_sets_off_barrels_for_thrower() {
        let (mut game, ids) = with_players(Mode::Ffa, 2);
        let (thrower, victim) = (ids[0], ids[1]);
        let (bx, bz) = (game.hazards[0].x, game.hazards[0].z);
        place(&mut game, thrower, 50.0, 50.0);
        place(&mut game, victim, bx, bz);
        game.player_mut(&victim).unwrap().health = 10.0;

        game.detonate_grenade(thrower, bx + 5.0, bz, 0);

        assert!(!game.hazards[0].alive);
        assert!(game.player(&victim).unwrap().dead);
        assert_eq!(game.player(&thrower).unwrap().kills, 1);
        assert_eq!(game.player(&thrower).unwrap().health, 100.0);
    }

    #[test]
    fn grenade_spares_barrel_outside_radius() {
        let (mut game, ids) = with_players(Mode::Ffa, 1);
        let (bx, bz) = (game.hazards[1].x, game.hazards[1].z);
        place(&mut game, ids[0], 50.0, 50.0);

        game.detonate_grenade(ids[0], bx + 5.6, bz, 0);
        assert!(game.hazards[1].alive);
        assert!(game.hazards.iter().all(|h| h.alive));
    }

    #[test]
    fn airstrike_blasts_spare_barrels() {
        let (mut game, ids) = with_players(Mode::Ffa, 1);
        let (bx, bz) = (game.hazards[0].x, game.hazards[0].z);
        place(&mut game, ids[0], 60.0, 60.0);
        game.airstrike_blast(ids[0], bx, bz, 0);
        assert!(game.hazards[0].alive);
    }
}
