//! One fixed simulation step of a match

use rand::Rng;
use std::f32::consts::TAU;
use tracing::debug;

use crate::util::time::TICK_MS;
use crate::ws::protocol::ServerMsg;

use super::catalog::{arena, collision, player as tuning, timing, PickupKind};
use super::combat::{Cause, CombatSystem, Strike};
use super::entity::{Pickup, Projectile};
use super::physics::{FlightEnd, PhysicsSystem};
use super::snapshot::SnapshotBuilder;
use super::timers::TimerTask;
use super::{ConnId, Match};

impl Match {
    /// Advance the match by one tick and broadcast the snapshot
    pub fn tick(&mut self, now: u64) {
        if !self.active {
            return;
        }

        self.tick_vitals(now);
        self.tick_zone(now);
        self.expire_streak_buffs(now);
        self.advance_projectiles(now);
        self.tick_supply_drop(now);

        if self.active {
            let snapshot = SnapshotBuilder::build(self, now);
            self.broadcast(ServerMsg::Snapshot(snapshot));
        }
    }

    fn tick_vitals(&mut self, now: u64) {
        for p in self.players.iter_mut() {
            p.invincible_ms = p.invincible_ms.saturating_sub(TICK_MS);
            if !p.dead && p.regen_until > now {
                p.health = (p.health + tuning::REGEN_PER_TICK).min(tuning::MAX_HEALTH);
            }
        }
    }

    fn tick_zone(&mut self, now: u64) {
        let Some(zone) = self.rules.zone else {
            return;
        };
        let radius = zone.radius_at(self.elapsed_ms(now));
        self.zone_radius = Some(radius);

        let outside: Vec<ConnId> = self
            .players
            .iter()
            .filter(|p| !p.dead && !PhysicsSystem::is_in_zone(p.x, p.z, radius))
            .map(|p| p.id)
            .collect();
        for id in outside {
            self.apply_damage(id, Strike::new(None, zone.tick_damage, Cause::Zone), now);
        }
    }

    fn expire_streak_buffs(&mut self, now: u64) {
        let mut expired = Vec::new();
        for p in self.players.iter_mut() {
            if p.speed_until != 0 && p.speed_until <= now {
                p.speed_until = 0;
            }
            if p.minigun_until != 0 && p.minigun_until <= now {
                p.minigun_until = 0;
                p.revoke_streak_weapon();
                expired.push((p.id, p.inventory.clone()));
            }
        }
        for (id, inventory) in expired {
            self.send_to(
                id,
                ServerMsg::PickupOk {
                    id: None,
                    inventory,
                    msg: "MINIGUN EXPIRED".to_string(),
                },
            );
        }
    }

    fn advance_projectiles(&mut self, now: u64) {
        let flying = std::mem::take(&mut self.projectiles);
        let mut survivors = Vec::with_capacity(flying.len());

        for mut projectile in flying {
            if !self.active {
                break;
            }
            PhysicsSystem::advance(&mut projectile);
            let spent = if projectile.is_rocket() {
                self.resolve_rocket(&projectile, now)
            } else {
                self.resolve_bullet(&projectile, now)
            };
            if !spent {
                survivors.push(projectile);
            }
        }

        if self.active {
            self.projectiles = survivors;
        }
    }

    /// Returns true when the bullet is used up
    fn resolve_bullet(&mut self, b: &Projectile, now: u64) -> bool {
        if let Some(end) = PhysicsSystem::flight_end(b) {
            if end == FlightEnd::Ground {
                self.broadcast(ServerMsg::BulletImpact { x: b.x, y: 0.0, z: b.z });
            }
            return true;
        }

        let barrel = self
            .hazards
            .iter()
            .position(|h| h.alive && b.horizontal_dist_sq(h.x, h.z) < collision::BULLET_HAZARD_SQ);
        if let Some(idx) = barrel {
            self.broadcast(ServerMsg::BulletImpact { x: b.x, y: b.y, z: b.z });
            self.destroy_hazard(idx, Some(b.owner), now);
            return true;
        }

        let victim = self
            .players
            .iter()
            .find(|t| {
                t.id != b.owner
                    && t.is_targetable()
                    && b.horizontal_dist_sq(t.x, t.z) < collision::BULLET_PLAYER_SQ
            })
            .map(|t| (t.id, t.y));
        let Some((victim, target_y)) = victim else {
            return false;
        };

        let Some(ballistics) = b.weapon.def().ballistics() else {
            return true;
        };
        let amount = CombatSystem::ranged_damage(b.damage, ballistics.falloff.as_ref(), b.traveled);
        let mut strike = Strike::new(Some(b.owner), amount, Cause::Weapon(b.weapon));
        if PhysicsSystem::is_headshot(b.y, target_y) {
            strike = strike.headshot(ballistics.headshot_mult);
        }
        self.apply_damage(victim, strike, now);
        true
    }

    /// Returns true when the rocket detonated
    fn resolve_rocket(&mut self, r: &Projectile, now: u64) -> bool {
        let detonate = PhysicsSystem::flight_end(r).is_some()
            || self.players.iter().any(|t| {
                t.id != r.owner && !t.dead && r.horizontal_dist_sq(t.x, t.z) < collision::ROCKET_PLAYER_SQ
            })
            || self
                .hazards
                .iter()
                .any(|h| h.alive && r.horizontal_dist_sq(h.x, h.z) < collision::ROCKET_HAZARD_SQ);

        if detonate {
            self.detonate_rocket(r.owner, r.x, r.z, now);
        }
        detonate
    }

    fn tick_supply_drop(&mut self, now: u64) {
        if now < self.next_supply_ms {
            return;
        }
        self.next_supply_ms += timing::SUPPLY_INTERVAL_MS;

        let radius = self.zone_radius.unwrap_or(arena::PLAYABLE_RADIUS);
        let (x, z) = self.supply_position(radius);
        let id = self.next_pickup_id();
        self.pickups.push(Pickup {
            id,
            kind: PickupKind::Supply,
            x,
            z,
            active: true,
            transient: true,
        });

        debug!(match_id = self.id, pickup_id = id, x, z, "Supply drop");
        self.broadcast(ServerMsg::SupplyDrop { id, x, z });
        self.defer(timing::SUPPLY_DESPAWN_MS, TimerTask::PickupDespawn(id));
    }

    /// Random point in the disc, clear of the central box
    fn supply_position(&mut self, radius: f32) -> (f32, f32) {
        let half = arena::SUPPLY_EXCLUSION_HALF;
        for _ in 0..arena::SUPPLY_PLACEMENT_TRIES {
            let angle = self.rng().gen_range(0.0..TAU);
            let dist = radius * self.rng().gen::<f32>().sqrt();
            let (x, z) = (angle.sin() * dist, angle.cos() * dist);
            if !(x.abs() < half && z.abs() < half) {
                return (x, z);
            }
        }
        arena::SUPPLY_FALLBACK
    }
}
