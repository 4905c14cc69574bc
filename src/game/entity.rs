//! Entities owned by a match: players, projectiles, barrels, pickups

use serde::{Deserialize, Serialize};

use super::catalog::{arena, player as tuning, PickupKind, WeaponKey};
use super::ConnId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Red,
    Blue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArmorTier {
    #[default]
    None,
    Light,
    Heavy,
}

impl ArmorTier {
    /// Damage multiplier applied after headshots
    pub fn mitigation(self) -> Option<f32> {
        match self {
            ArmorTier::None => None,
            ArmorTier::Light => Some(0.75),
            ArmorTier::Heavy => Some(0.5),
        }
    }

    pub fn level(self) -> u8 {
        match self {
            ArmorTier::None => 0,
            ArmorTier::Light => 1,
            ArmorTier::Heavy => 2,
        }
    }
}

/// Persistent shop upgrades
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Upgrades {
    pub armor: ArmorTier,
    pub speed: bool,
    pub radar: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventorySlot {
    pub weapon: WeaponKey,
    /// `None` means unlimited
    pub ammo: Option<u32>,
    /// Granted by a killstreak and removed when it expires
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub streak_grant: bool,
}

impl InventorySlot {
    pub fn new(weapon: WeaponKey, ammo: Option<u32>) -> Self {
        Self {
            weapon,
            ammo,
            streak_grant: false,
        }
    }

    pub fn has_ammo(&self) -> bool {
        self.ammo.map_or(true, |a| a > 0)
    }
}

/// Authoritative player state inside a match
#[derive(Debug, Clone)]
pub struct Player {
    pub id: ConnId,
    pub name: String,
    pub team: Option<Team>,

    // Position
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub angle: f32,

    // Vitals
    pub health: f32,
    pub lives: u32,
    pub dead: bool,
    pub invincible_ms: u64,
    pub regen_until: u64,
    pub last_damager: Option<ConnId>,

    // Score and economy
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub money: u32,

    // Killstreak
    pub streak: u32,
    pub speed_until: u64,
    pub minigun_until: u64,
    /// Streak ammo added on top of a minigun the player already carried
    pub streak_bonus_ammo: u32,
    pub airstrike_ready: bool,

    pub upgrades: Upgrades,

    // Arsenal
    pub inventory: Vec<InventorySlot>,
    pub weapon_idx: usize,
    pub last_shot_ms: Option<u64>,
    pub last_melee_ms: Option<u64>,
    pub last_throw_ms: Option<u64>,
}

impl Player {
    pub fn new(id: ConnId, name: String, team: Option<Team>, lives: u32, x: f32, z: f32) -> Self {
        Self {
            id,
            name,
            team,
            x,
            y: 0.0,
            z,
            angle: 0.0,
            health: tuning::MAX_HEALTH,
            lives,
            dead: false,
            invincible_ms: 0,
            regen_until: 0,
            last_damager: None,
            kills: 0,
            deaths: 0,
            assists: 0,
            money: tuning::STARTING_MONEY,
            streak: 0,
            speed_until: 0,
            minigun_until: 0,
            streak_bonus_ammo: 0,
            airstrike_ready: false,
            upgrades: Upgrades::default(),
            inventory: vec![
                InventorySlot::new(WeaponKey::Fists, None),
                InventorySlot::new(WeaponKey::Knife, None),
                InventorySlot::new(WeaponKey::Grenade, Some(tuning::STARTING_GRENADES)),
            ],
            weapon_idx: 0,
            last_shot_ms: None,
            last_melee_ms: None,
            last_throw_ms: None,
        }
    }

    pub fn is_targetable(&self) -> bool {
        !self.dead && self.invincible_ms == 0
    }

    pub fn selected(&self) -> Option<&InventorySlot> {
        self.inventory.get(self.weapon_idx)
    }

    pub fn slot(&self, weapon: WeaponKey) -> Option<&InventorySlot> {
        self.inventory.iter().find(|s| s.weapon == weapon)
    }

    pub fn slot_mut(&mut self, weapon: WeaponKey) -> Option<&mut InventorySlot> {
        self.inventory.iter_mut().find(|s| s.weapon == weapon)
    }

    pub fn slots_full(&self) -> bool {
        self.inventory.len() >= tuning::MAX_SLOTS
    }

    /// Keep the selected index inside the inventory after removals
    pub fn clamp_weapon_idx(&mut self) {
        if self.weapon_idx >= self.inventory.len() {
            self.weapon_idx = self.inventory.len().saturating_sub(1);
        }
    }

    /// Remove a slot while keeping the same weapon selected when possible
    pub fn remove_slot(&mut self, index: usize) -> Option<InventorySlot> {
        if index >= self.inventory.len() {
            return None;
        }
        let slot = self.inventory.remove(index);
        if index < self.weapon_idx {
            self.weapon_idx -= 1;
        }
        self.clamp_weapon_idx();
        Some(slot)
    }

    /// Take back the killstreak minigun: the granted slot, or the bonus
    /// ammo loaded into one the player already owned
    pub fn revoke_streak_weapon(&mut self) {
        if let Some(idx) = self.inventory.iter().position(|s| s.streak_grant) {
            self.remove_slot(idx);
        }
        let bonus = std::mem::take(&mut self.streak_bonus_ammo);
        if bonus > 0 {
            if let Some(ammo) = self.slot_mut(WeaponKey::Minigun).and_then(|s| s.ammo.as_mut()) {
                *ammo = ammo.saturating_sub(bonus);
            }
        }
    }

    /// Max step a single move intent may cover
    pub fn max_step(&self, now: u64) -> f32 {
        let mut step = tuning::MOVE_MAX_STEP;
        if self.upgrades.speed {
            step *= tuning::SPEED_UPGRADE_MULT;
        }
        if self.speed_until > now {
            step *= tuning::STREAK_SPEED_MULT;
        }
        step
    }

    pub fn horizontal_dist(&self, x: f32, z: f32) -> f32 {
        (self.x - x).hypot(self.z - z)
    }
}

/// Bullet or rocket in flight
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
    pub traveled: f32,
    pub max_range: f32,
    pub owner: ConnId,
    pub damage: u32,
    pub weapon: WeaponKey,
    pub color: u32,
}

impl Projectile {
    /// Launch from `(x, z)` along `angle` (0 = +z) with optional upward pitch
    pub fn launch(id: u32, owner: ConnId, weapon: WeaponKey, x: f32, z: f32, angle: f32, pitch: f32) -> Option<Self> {
        let def = weapon.def();
        let ballistics = def.ballistics()?;
        let horizontal = pitch.cos() * ballistics.speed;
        Some(Self {
            id,
            x: x + angle.sin() * arena::MUZZLE_OFFSET,
            y: arena::MUZZLE_HEIGHT,
            z: z + angle.cos() * arena::MUZZLE_OFFSET,
            vx: angle.sin() * horizontal,
            vy: pitch.sin() * ballistics.speed,
            vz: angle.cos() * horizontal,
            traveled: 0.0,
            max_range: ballistics.max_range,
            owner,
            damage: def.damage,
            weapon,
            color: ballistics.color,
        })
    }

    pub fn is_rocket(&self) -> bool {
        self.weapon == WeaponKey::Rocket
    }

    pub fn horizontal_dist_sq(&self, x: f32, z: f32) -> f32 {
        (self.x - x).powi(2) + (self.z - z).powi(2)
    }
}

/// Explosive barrel
#[derive(Debug, Clone)]
pub struct Hazard {
    pub id: u32,
    pub x: f32,
    pub z: f32,
    pub alive: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Pickup {
    pub id: u32,
    #[serde(flatten)]
    pub kind: PickupKind,
    pub x: f32,
    pub z: f32,
    pub active: bool,
    /// Dropped weapons and supply crates vanish once taken
    #[serde(skip)]
    pub transient: bool,
}
