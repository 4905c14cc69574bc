//! Projectile flight, arena bounds and movement constraints

use super::catalog::{arena, WeaponKey};
use super::entity::Projectile;

/// Why a projectile stopped flying this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightEnd {
    OutOfRange,
    OutOfBounds,
    Ground,
    Ceiling,
}

/// Physics system for projectile motion and position checks
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Advance one tick: gravity (if the weapon drops), integrate, accumulate distance
    pub fn advance(projectile: &mut Projectile) {
        if let Some(gravity) = Self::gravity(projectile.weapon) {
            projectile.vy -= gravity;
        }

        projectile.x += projectile.vx;
        projectile.y += projectile.vy;
        projectile.z += projectile.vz;
        projectile.traveled += Self::step_length(projectile);
    }

    /// Distance covered per tick at the current velocity
    pub fn step_length(projectile: &Projectile) -> f32 {
        (projectile.vx * projectile.vx + projectile.vy * projectile.vy + projectile.vz * projectile.vz)
            .sqrt()
    }

    fn gravity(weapon: WeaponKey) -> Option<f32> {
        weapon.def().ballistics().and_then(|b| b.gravity)
    }

    /// Check whether the projectile has left its valid flight envelope
    pub fn flight_end(projectile: &Projectile) -> Option<FlightEnd> {
        if projectile.traveled > projectile.max_range {
            Some(FlightEnd::OutOfRange)
        } else if !Self::in_arena(projectile.x, projectile.z) {
            Some(FlightEnd::OutOfBounds)
        } else if projectile.y < 0.0 {
            Some(FlightEnd::Ground)
        } else if projectile.y > arena::CEILING {
            Some(FlightEnd::Ceiling)
        } else {
            None
        }
    }

    /// Inside the bounded square play area
    pub fn in_arena(x: f32, z: f32) -> bool {
        x.abs() <= arena::HALF_EXTENT && z.abs() <= arena::HALF_EXTENT
    }

    /// Check if a point is inside a zone centred on the origin
    pub fn is_in_zone(x: f32, z: f32, zone_radius: f32) -> bool {
        x * x + z * z <= zone_radius * zone_radius
    }

    /// A move intent is plausible when finite, in the arena, and within `max_step`
    pub fn is_plausible_move(from: (f32, f32), to: (f32, f32), max_step: f32) -> bool {
        if !to.0.is_finite() || !to.1.is_finite() || !Self::in_arena(to.0, to.1) {
            return false;
        }
        (to.0 - from.0).hypot(to.1 - from.1) <= max_step
    }

    /// Altitude above the target's feet falls inside the head band
    pub fn is_headshot(projectile_y: f32, target_y: f32) -> bool {
        let rel = projectile_y - target_y;
        (arena::HEAD_MIN..=arena::HEAD_MAX).contains(&rel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn fire(weapon: WeaponKey, pitch: f32) -> Projectile {
        Projectile::launch(1, Uuid::new_v4(), weapon, 0.0, 0.0, 0.0, pitch).unwrap()
    }

    #[test]
    fn traveled_matches_integrated_speed() {
        let mut p = fire(WeaponKey::Crossbow, 0.2);
        let mut expected = 0.0;
        for _ in 0..30 {
            let before = (p.x, p.y, p.z);
            PhysicsSystem::advance(&mut p);
            let dx = p.x - before.0;
            let dy = p.y - before.1;
            let dz = p.z - before.2;
            expected += (dx * dx + dy * dy + dz * dz).sqrt();
        }
        assert!((p.traveled - expected).abs() < 1e-3);
    }

    #[test]
    fn gravity_only_for_dropping_weapons() {
        let mut rifle = fire(WeaponKey::Rifle, 0.0);
        let mut bolt = fire(WeaponKey::Crossbow, 0.0);
        for _ in 0..10 {
            PhysicsSystem::advance(&mut rifle);
            PhysicsSystem::advance(&mut bolt);
        }
        assert_eq!(rifle.y, arena::MUZZLE_HEIGHT);
        assert!(bolt.y < arena::MUZZLE_HEIGHT);
    }

    #[test]
    fn flight_ends_on_the_tick_range_is_exceeded() {
        let mut p = fire(WeaponKey::Flamethrower, 0.0);
        let speed = PhysicsSystem::step_length(&p);
        let ticks_in_range = (p.max_range / speed).floor() as u32;
        for _ in 0..ticks_in_range {
            PhysicsSystem::advance(&mut p);
            assert_eq!(PhysicsSystem::flight_end(&p), None);
        }
        PhysicsSystem::advance(&mut p);
        assert_eq!(PhysicsSystem::flight_end(&p), Some(FlightEnd::OutOfRange));
    }

    #[test]
    fn leaving_the_square_ends_flight() {
        let mut p = fire(WeaponKey::Sniper, 0.0);
        p.z = arena::HALF_EXTENT - 0.5;
        PhysicsSystem::advance(&mut p);
        assert_eq!(PhysicsSystem::flight_end(&p), Some(FlightEnd::OutOfBounds));
    }

    #[test]
    fn steep_shots_hit_ceiling_and_ground() {
        let mut up = fire(WeaponKey::Rifle, 1.4);
        let mut down = fire(WeaponKey::Rifle, -1.4);
        for _ in 0..12 {
            PhysicsSystem::advance(&mut up);
        }
        PhysicsSystem::advance(&mut down);
        PhysicsSystem::advance(&mut down);
        assert_eq!(PhysicsSystem::flight_end(&up), Some(FlightEnd::Ceiling));
        assert_eq!(PhysicsSystem::flight_end(&down), Some(FlightEnd::Ground));
    }

    #[test]
    fn move_validation() {
        assert!(PhysicsSystem::is_plausible_move((0.0, 0.0), (1.5, 2.0), 2.5));
        assert!(!PhysicsSystem::is_plausible_move((0.0, 0.0), (2.0, 2.0), 2.5));
        assert!(!PhysicsSystem::is_plausible_move((0.0, 0.0), (f32::NAN, 0.0), 2.5));
        assert!(!PhysicsSystem::is_plausible_move((71.0, 0.0), (73.0, 0.0), 2.5));
    }

    #[test]
    fn head_band() {
        assert!(!PhysicsSystem::is_headshot(arena::MUZZLE_HEIGHT, 0.0));
        assert!(PhysicsSystem::is_headshot(1.8, 0.0));
        assert!(!PhysicsSystem::is_headshot(2.5, 0.0));
    }
}
