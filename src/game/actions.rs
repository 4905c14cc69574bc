//! Validated player intents

use rand::Rng;

use crate::ws::protocol::ServerMsg;

use super::catalog::{
    blast, player as tuning, timing, Mode, PickupKind, WeaponKey, WeaponKind, SUPPLY_WEAPONS,
};
use super::combat::{Cause, Strike};
use super::entity::{InventorySlot, Pickup, Player, Projectile};
use super::physics::PhysicsSystem;
use super::timers::TimerTask;
use super::{ConnId, Match};

/// Why an intent was refused. Rejections are dropped, never fatal.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error("match is over")]
    MatchOver,
    #[error("player not in match")]
    NotInMatch,
    #[error("player is dead")]
    Dead,
    #[error("unknown weapon: {0}")]
    UnknownWeapon(String),
    #[error("{0} cannot be fired")]
    NotRanged(WeaponKey),
    #[error("{0} not in inventory")]
    NotOwned(WeaponKey),
    #[error("out of ammo")]
    NoAmmo,
    #[error("weapon cooling down")]
    Cooldown,
    #[error("non-finite or out-of-arena coordinates")]
    BadCoordinates,
    #[error("move exceeds max step")]
    ImplausibleMove,
    #[error("target too far")]
    OutOfReach,
    #[error("airstrike not ready")]
    AirstrikeNotReady,
    #[error("pickup {0} unavailable")]
    PickupUnavailable(u32),
    #[error("inventory full")]
    InventoryFull,
    #[error("no slot {0}")]
    InvalidSlot(usize),
    #[error("{0} cannot be dropped")]
    Undroppable(WeaponKey),
}

/// True while `last` is too recent for a weapon with cooldown `cd`
fn cooling_down(last: Option<u64>, cd: u64, now: u64) -> bool {
    last.is_some_and(|t| now.saturating_sub(t) < cd.saturating_sub(tuning::COOLDOWN_TOLERANCE_MS))
}

/// Ammo refill from a weapon pickup: one magazine, capped at two
fn refill(ammo: Option<u32>, max: u32) -> Option<u32> {
    ammo.map(|a| (a + max).min(2 * max))
}

impl Match {
    fn living_index(&self, conn: &ConnId) -> Result<usize, ActionError> {
        if !self.active {
            return Err(ActionError::MatchOver);
        }
        let idx = self.player_index(conn).ok_or(ActionError::NotInMatch)?;
        if self.players[idx].dead {
            return Err(ActionError::Dead);
        }
        Ok(idx)
    }

    pub fn move_player(&mut self, conn: ConnId, x: f32, z: f32, angle: f32, now: u64) -> Result<(), ActionError> {
        let idx = self.living_index(&conn)?;
        if !angle.is_finite() {
            return Err(ActionError::BadCoordinates);
        }
        let p = &mut self.players[idx];
        if !PhysicsSystem::is_plausible_move((p.x, p.z), (x, z), p.max_step(now)) {
            return Err(ActionError::ImplausibleMove);
        }
        p.x = x;
        p.z = z;
        p.angle = angle;
        Ok(())
    }

    /// Fire a gun or rocket. Returns the number of projectiles spawned.
    pub fn shoot(
        &mut self,
        conn: ConnId,
        weapon_key: &str,
        angle: f32,
        pitch: Option<f32>,
        now: u64,
    ) -> Result<usize, ActionError> {
        let weapon: WeaponKey = weapon_key
            .parse()
            .map_err(|_| ActionError::UnknownWeapon(weapon_key.to_string()))?;
        let def = weapon.def();
        let ballistics = *def.ballistics().ok_or(ActionError::NotRanged(weapon))?;

        let idx = self.living_index(&conn)?;
        let pitch = pitch.unwrap_or(0.0);
        if !angle.is_finite() || !pitch.is_finite() {
            return Err(ActionError::BadCoordinates);
        }

        let p = &mut self.players[idx];
        let slot = p.slot(weapon).ok_or(ActionError::NotOwned(weapon))?;
        if !slot.has_ammo() {
            return Err(ActionError::NoAmmo);
        }
        if cooling_down(p.last_shot_ms, def.cooldown_ms, now) {
            return Err(ActionError::Cooldown);
        }

        p.last_shot_ms = Some(now);
        if let Some(ammo) = p.slot_mut(weapon).and_then(|s| s.ammo.as_mut()) {
            *ammo -= 1;
        }
        let (x, z) = (p.x, p.z);

        let pellets = if matches!(def.kind, WeaponKind::Rocket { .. }) {
            1
        } else {
            ballistics.pellets
        };
        for _ in 0..pellets {
            let spread = if ballistics.spread > 0.0 {
                self.rng().gen_range(-ballistics.spread..=ballistics.spread)
            } else {
                0.0
            };
            let id = self.next_projectile_id();
            if let Some(projectile) = Projectile::launch(id, conn, weapon, x, z, angle + spread, pitch) {
                self.projectiles.push(projectile);
            }
        }
        Ok(pellets as usize)
    }

    /// Swing the selected melee weapon, or fists. Returns the victim, if any.
    pub fn melee(&mut self, conn: ConnId, now: u64) -> Result<Option<ConnId>, ActionError> {
        let idx = self.living_index(&conn)?;
        let p = &mut self.players[idx];

        let weapon = p
            .selected()
            .map(|s| s.weapon)
            .filter(|w| matches!(w.def().kind, WeaponKind::Melee { .. }))
            .unwrap_or(WeaponKey::Fists);
        let def = weapon.def();
        let WeaponKind::Melee { range } = def.kind else {
            return Ok(None);
        };
        if cooling_down(p.last_melee_ms, def.cooldown_ms, now) {
            return Err(ActionError::Cooldown);
        }
        p.last_melee_ms = Some(now);
        let (x, z, team) = (p.x, p.z, p.team);
        let spares_team = self.mode == Mode::Tdm;

        // First qualifying player in join order, not the nearest
        let target = self
            .players
            .iter()
            .find(|t| {
                t.id != conn
                    && t.is_targetable()
                    && !(spares_team && t.team == team)
                    && t.horizontal_dist(x, z) < range
            })
            .map(|t| t.id);

        if let Some(victim) = target {
            self.apply_damage(victim, Strike::new(Some(conn), def.damage, Cause::Weapon(weapon)), now);
        }
        Ok(target)
    }

    pub fn throw_grenade(
        &mut self,
        conn: ConnId,
        x: f32,
        z: f32,
        velocity: (f32, Option<f32>, f32),
        now: u64,
    ) -> Result<(), ActionError> {
        let idx = self.living_index(&conn)?;
        let (vx, vy, vz) = velocity;
        let vy = vy.unwrap_or(0.18);
        if ![vx, vy, vz].iter().all(|v| v.is_finite()) || !x.is_finite() || !z.is_finite() {
            return Err(ActionError::BadCoordinates);
        }
        if !PhysicsSystem::in_arena(x, z) {
            return Err(ActionError::BadCoordinates);
        }

        let def = WeaponKey::Grenade.def();
        let WeaponKind::Throw { fuse_ms, .. } = def.kind else {
            return Err(ActionError::NotRanged(WeaponKey::Grenade));
        };

        let p = &mut self.players[idx];
        if p.horizontal_dist(x, z) > tuning::GRENADE_MAX_THROW {
            return Err(ActionError::OutOfReach);
        }
        let slot = p.slot(WeaponKey::Grenade).ok_or(ActionError::NoAmmo)?;
        if !slot.has_ammo() {
            return Err(ActionError::NoAmmo);
        }
        if cooling_down(p.last_throw_ms, def.cooldown_ms, now) {
            return Err(ActionError::Cooldown);
        }

        p.last_throw_ms = Some(now);
        if let Some(ammo) = p.slot_mut(WeaponKey::Grenade).and_then(|s| s.ammo.as_mut()) {
            *ammo -= 1;
        }
        let (ox, oz) = (p.x, p.z);

        self.broadcast(ServerMsg::GrenadeFly { ox, oz, vx, vy, vz });
        self.defer(fuse_ms, TimerTask::GrenadeDetonate { owner: conn, x, z });
        Ok(())
    }

    pub fn call_airstrike(&mut self, conn: ConnId, x: f32, z: f32) -> Result<(), ActionError> {
        let idx = self.living_index(&conn)?;
        if !x.is_finite() || !z.is_finite() || !PhysicsSystem::in_arena(x, z) {
            return Err(ActionError::BadCoordinates);
        }
        let p = &mut self.players[idx];
        if !p.airstrike_ready {
            return Err(ActionError::AirstrikeNotReady);
        }
        p.airstrike_ready = false;

        self.broadcast(ServerMsg::Airstrike { caller: conn, x, z });
        for i in 0..blast::AIRSTRIKE_BLASTS {
            let scatter = blast::AIRSTRIKE_SCATTER;
            let bx = x + self.rng().gen_range(-scatter..=scatter);
            let bz = z + self.rng().gen_range(-scatter..=scatter);
            let delay = blast::AIRSTRIKE_FIRST_MS + u64::from(i) * blast::AIRSTRIKE_STAGGER_MS;
            self.defer(delay, TimerTask::AirstrikeBlast { owner: conn, x: bx, z: bz });
        }
        Ok(())
    }

    pub fn take_pickup(&mut self, conn: ConnId, pickup_id: u32) -> Result<(), ActionError> {
        let idx = self.living_index(&conn)?;
        let pickup_idx = self
            .pickups
            .iter()
            .position(|p| p.id == pickup_id && p.active)
            .ok_or(ActionError::PickupUnavailable(pickup_id))?;
        let Pickup { kind, x, z, transient, .. } = self.pickups[pickup_idx].clone();

        if self.players[idx].horizontal_dist(x, z) > tuning::PICKUP_RANGE {
            return Err(ActionError::OutOfReach);
        }

        let msg = match kind {
            PickupKind::Ammo => {
                top_up_guns(&mut self.players[idx]);
                "AMMO CRATE".to_string()
            }
            PickupKind::Weapon(weapon) => {
                grant_weapon(&mut self.players[idx], weapon)?;
                format!("{} PICKED UP", weapon.as_str().to_uppercase())
            }
            PickupKind::Supply => {
                let weapon = SUPPLY_WEAPONS[self.rng().gen_range(0..SUPPLY_WEAPONS.len())];
                grant_weapon(&mut self.players[idx], weapon)?;
                format!("SUPPLY: {}", weapon.as_str().to_uppercase())
            }
        };

        if transient {
            self.pickups.remove(pickup_idx);
        } else {
            self.pickups[pickup_idx].active = false;
            self.defer(timing::PICKUP_RESPAWN_MS, TimerTask::PickupRespawn(pickup_id));
        }

        let inventory = self.players[idx].inventory.clone();
        self.send_to(
            conn,
            ServerMsg::PickupOk {
                id: Some(pickup_id),
                inventory,
                msg,
            },
        );
        self.broadcast(ServerMsg::PickupGone { id: pickup_id });
        Ok(())
    }

    pub fn switch_weapon(&mut self, conn: ConnId, index: usize) -> Result<(), ActionError> {
        if !self.active {
            return Err(ActionError::MatchOver);
        }
        let p = self.player_mut(&conn).ok_or(ActionError::NotInMatch)?;
        if index >= p.inventory.len() {
            return Err(ActionError::InvalidSlot(index));
        }
        p.weapon_idx = index;
        Ok(())
    }

    /// Drop a weapon on the floor as a transient pickup. Returns its id.
    pub fn drop_weapon(&mut self, conn: ConnId, index: usize) -> Result<u32, ActionError> {
        let idx = self.living_index(&conn)?;
        let p = &self.players[idx];
        let slot = p.inventory.get(index).ok_or(ActionError::InvalidSlot(index))?;
        if slot.weapon.is_permanent() || slot.streak_grant {
            return Err(ActionError::Undroppable(slot.weapon));
        }
        let weapon = slot.weapon;
        let (px, pz) = (p.x, p.z);

        let p = &mut self.players[idx];
        p.remove_slot(index);
        let inventory = p.inventory.clone();

        let jitter = 0.75;
        let x = px + self.rng().gen_range(-jitter..=jitter);
        let z = pz + self.rng().gen_range(-jitter..=jitter);
        let id = self.next_pickup_id();
        let kind = PickupKind::Weapon(weapon);
        self.pickups.push(Pickup {
            id,
            kind,
            x,
            z,
            active: true,
            transient: true,
        });

        self.broadcast(ServerMsg::PickupBack { id, kind, x, z });
        self.send_to(
            conn,
            ServerMsg::PickupOk {
                id: None,
                inventory,
                msg: format!("{} DROPPED", weapon.as_str().to_uppercase()),
            },
        );
        self.defer(timing::DROPPED_DESPAWN_MS, TimerTask::PickupDespawn(id));
        Ok(id)
    }
}

/// Refill an owned weapon or add it to a free slot
fn grant_weapon(player: &mut Player, weapon: WeaponKey) -> Result<(), ActionError> {
    let max = weapon.def().max_ammo;
    if let Some(slot) = player.slot_mut(weapon) {
        if let Some(max) = max {
            slot.ammo = refill(slot.ammo, max);
        }
        return Ok(());
    }
    if player.slots_full() {
        return Err(ActionError::InventoryFull);
    }
    player.inventory.push(InventorySlot::new(weapon, max));
    Ok(())
}

/// Ammo crate: each gun gains 60% of a magazine, capped at two
fn top_up_guns(player: &mut Player) {
    for slot in player.inventory.iter_mut() {
        let def = slot.weapon.def();
        let (true, Some(max), Some(ammo)) = (def.is_ranged(), def.max_ammo, slot.ammo.as_mut()) else {
            continue;
        };
        // ceil(0.6 * max) without float error
        let bonus = (max * 3 + 4) / 5;
        *ammo = (*ammo + bonus).min(2 * max);
    }
}
