//! Static weapon, shop, mode and map data

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Arena geometry
pub mod arena {
    /// Half extent of the square play area; projectiles past this are gone
    pub const HALF_EXTENT: f32 = 72.0;
    /// Radius supply drops may land within (outside LMS)
    pub const PLAYABLE_RADIUS: f32 = 60.0;
    /// Central box supply drops must avoid
    pub const SUPPLY_EXCLUSION_HALF: f32 = 8.0;
    /// Fallback supply position when random placement keeps failing
    pub const SUPPLY_FALLBACK: (f32, f32) = (24.0, 0.0);
    pub const SUPPLY_PLACEMENT_TRIES: u32 = 12;
    /// Projectiles above this altitude are discarded
    pub const CEILING: f32 = 12.0;
    /// Height projectiles leave the muzzle at
    pub const MUZZLE_HEIGHT: f32 = 1.3;
    /// Forward offset of the muzzle from the shooter
    pub const MUZZLE_OFFSET: f32 = 0.9;
    /// Head band relative to a player's feet
    pub const HEAD_MIN: f32 = 1.6;
    pub const HEAD_MAX: f32 = 2.1;
}

/// Collision thresholds (squared horizontal distances)
pub mod collision {
    pub const BULLET_PLAYER_SQ: f32 = 0.9;
    pub const BULLET_HAZARD_SQ: f32 = 1.0;
    pub const ROCKET_PLAYER_SQ: f32 = 1.4;
    pub const ROCKET_HAZARD_SQ: f32 = 1.6;
}

/// Player tuning
pub mod player {
    pub const MAX_HEALTH: f32 = 100.0;
    pub const MAX_NAME_CHARS: usize = 20;
    pub const STARTING_MONEY: u32 = 200;
    pub const MAX_SLOTS: usize = 7;
    pub const STARTING_GRENADES: u32 = 2;
    /// Max accepted displacement per move intent at base speed
    pub const MOVE_MAX_STEP: f32 = 2.5;
    pub const SPEED_UPGRADE_MULT: f32 = 1.25;
    pub const STREAK_SPEED_MULT: f32 = 1.3;
    pub const REGEN_PER_TICK: f32 = 0.15;
    pub const STIMPACK_MS: u64 = 12_000;
    pub const HEALTH_KIT_HP: f32 = 50.0;
    pub const GREN_PACK_COUNT: u32 = 2;
    /// Slack granted on weapon cooldowns for network jitter
    pub const COOLDOWN_TOLERANCE_MS: u64 = 30;
    pub const PICKUP_RANGE: f32 = 3.5;
    pub const GRENADE_MAX_THROW: f32 = 30.0;
}

/// Match lifecycle timings
pub mod timing {
    pub const RESPAWN_DELAY_MS: u64 = 3_000;
    pub const RESPAWN_INVINCIBLE_MS: u64 = 3_500;
    pub const ELIMINATION_NOTICE_MS: u64 = 600;
    pub const LMS_END_DELAY_MS: u64 = 3_000;
    pub const RESULT_GRACE_MS: u64 = 60_000;
    pub const PICKUP_RESPAWN_MS: u64 = 20_000;
    pub const DROPPED_DESPAWN_MS: u64 = 30_000;
    pub const SUPPLY_DESPAWN_MS: u64 = 60_000;
    pub const SUPPLY_INTERVAL_MS: u64 = 120_000;
    pub const VOTE_OPEN_DELAY_MS: u64 = 5_000;
    pub const VOTE_WINDOW_MS: u64 = 15_000;
    pub const VOTE_CANDIDATES: usize = 3;
}

/// Money and killstreaks
pub mod economy {
    pub const KILL_BOUNTY: u32 = 150;
    pub const ASSIST_BOUNTY: u32 = 50;
    pub const STREAK_SPEED_AT: u32 = 3;
    pub const STREAK_SPEED_MS: u64 = 15_000;
    pub const STREAK_AIRSTRIKE_AT: u32 = 5;
    pub const STREAK_MINIGUN_AT: u32 = 7;
    pub const STREAK_MINIGUN_MS: u64 = 30_000;
    pub const STREAK_MINIGUN_AMMO: u32 = 200;
}

/// Area effects other than weapon blasts
pub mod blast {
    pub const BARREL_DAMAGE: u32 = 80;
    pub const BARREL_RADIUS: f32 = 5.0;
    pub const AIRSTRIKE_BLASTS: u32 = 6;
    pub const AIRSTRIKE_FIRST_MS: u64 = 1_200;
    pub const AIRSTRIKE_STAGGER_MS: u64 = 250;
    pub const AIRSTRIKE_SCATTER: f32 = 6.0;
    pub const AIRSTRIKE_DAMAGE: u32 = 70;
    pub const AIRSTRIKE_RADIUS: f32 = 5.0;
}

/// Error returned when a wire key names nothing in the catalog
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown key: {0}")]
pub struct UnknownKey(pub String);

// ============================================================================
// Weapons
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponKey {
    Fists,
    Knife,
    Grenade,
    Pistol,
    Shotgun,
    Rifle,
    Smg,
    Sniper,
    Minigun,
    Crossbow,
    Rocket,
    Flamethrower,
}

impl WeaponKey {
    pub const ALL: [WeaponKey; 12] = [
        WeaponKey::Fists,
        WeaponKey::Knife,
        WeaponKey::Grenade,
        WeaponKey::Pistol,
        WeaponKey::Shotgun,
        WeaponKey::Rifle,
        WeaponKey::Smg,
        WeaponKey::Sniper,
        WeaponKey::Minigun,
        WeaponKey::Crossbow,
        WeaponKey::Rocket,
        WeaponKey::Flamethrower,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WeaponKey::Fists => "fists",
            WeaponKey::Knife => "knife",
            WeaponKey::Grenade => "grenade",
            WeaponKey::Pistol => "pistol",
            WeaponKey::Shotgun => "shotgun",
            WeaponKey::Rifle => "rifle",
            WeaponKey::Smg => "smg",
            WeaponKey::Sniper => "sniper",
            WeaponKey::Minigun => "minigun",
            WeaponKey::Crossbow => "crossbow",
            WeaponKey::Rocket => "rocket",
            WeaponKey::Flamethrower => "flamethrower",
        }
    }

    /// Fists, knife and grenade can never leave the inventory
    pub fn is_permanent(self) -> bool {
        matches!(self, WeaponKey::Fists | WeaponKey::Knife | WeaponKey::Grenade)
    }

    pub fn def(self) -> &'static WeaponDef {
        match self {
            WeaponKey::Fists => &FISTS,
            WeaponKey::Knife => &KNIFE,
            WeaponKey::Grenade => &GRENADE,
            WeaponKey::Pistol => &PISTOL,
            WeaponKey::Shotgun => &SHOTGUN,
            WeaponKey::Rifle => &RIFLE,
            WeaponKey::Smg => &SMG,
            WeaponKey::Sniper => &SNIPER,
            WeaponKey::Minigun => &MINIGUN,
            WeaponKey::Crossbow => &CROSSBOW,
            WeaponKey::Rocket => &ROCKET,
            WeaponKey::Flamethrower => &FLAMETHROWER,
        }
    }
}

impl fmt::Display for WeaponKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeaponKey {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WeaponKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownKey(s.to_string()))
    }
}

/// Distance-based damage reduction for ranged weapons
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Falloff {
    /// Full damage up to this distance
    pub start: f32,
    /// Minimum damage from this distance on
    pub end: f32,
    /// Fraction of base damage at and past `end`
    pub min_pct: f32,
}

impl Falloff {
    pub fn factor(&self, traveled: f32) -> f32 {
        if traveled <= self.start {
            1.0
        } else if traveled >= self.end {
            self.min_pct
        } else {
            let t = (traveled - self.start) / (self.end - self.start);
            1.0 + (self.min_pct - 1.0) * t
        }
    }
}

/// Flight parameters shared by guns and rockets
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ballistics {
    /// Units per tick
    pub speed: f32,
    pub max_range: f32,
    pub pellets: u32,
    /// Max angular deviation either side, radians
    pub spread: f32,
    pub color: u32,
    pub falloff: Option<Falloff>,
    /// Downward acceleration per tick; `None` flies straight
    pub gravity: Option<f32>,
    pub headshot_mult: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeaponKind {
    Melee { range: f32 },
    Throw { blast_radius: f32, fuse_ms: u64 },
    Gun(Ballistics),
    Rocket { ballistics: Ballistics, blast_radius: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponDef {
    pub key: WeaponKey,
    pub damage: u32,
    pub cooldown_ms: u64,
    /// `None` for unlimited use
    pub max_ammo: Option<u32>,
    pub kind: WeaponKind,
}

impl WeaponDef {
    pub fn ballistics(&self) -> Option<&Ballistics> {
        match &self.kind {
            WeaponKind::Gun(b) => Some(b),
            WeaponKind::Rocket { ballistics, .. } => Some(ballistics),
            WeaponKind::Melee { .. } | WeaponKind::Throw { .. } => None,
        }
    }

    pub fn is_ranged(&self) -> bool {
        self.ballistics().is_some()
    }
}

const fn gun(
    speed: f32,
    max_range: f32,
    pellets: u32,
    spread: f32,
    color: u32,
    falloff: Option<Falloff>,
    gravity: Option<f32>,
    headshot_mult: f32,
) -> Ballistics {
    Ballistics {
        speed,
        max_range,
        pellets,
        spread,
        color,
        falloff,
        gravity,
        headshot_mult,
    }
}

const fn falloff(start: f32, end: f32, min_pct: f32) -> Option<Falloff> {
    Some(Falloff { start, end, min_pct })
}

const DEFAULT_SPREAD: f32 = 0.025;

static FISTS: WeaponDef = WeaponDef {
    key: WeaponKey::Fists,
    damage: 15,
    cooldown_ms: 450,
    max_ammo: None,
    kind: WeaponKind::Melee { range: 2.0 },
};

static KNIFE: WeaponDef = WeaponDef {
    key: WeaponKey::Knife,
    damage: 45,
    cooldown_ms: 380,
    max_ammo: None,
    kind: WeaponKind::Melee { range: 2.2 },
};

static GRENADE: WeaponDef = WeaponDef {
    key: WeaponKey::Grenade,
    damage: 95,
    cooldown_ms: 800,
    max_ammo: Some(player::STARTING_GRENADES),
    kind: WeaponKind::Throw { blast_radius: 5.5, fuse_ms: 2_600 },
};

static PISTOL: WeaponDef = WeaponDef {
    key: WeaponKey::Pistol,
    damage: 30,
    cooldown_ms: 340,
    max_ammo: Some(12),
    kind: WeaponKind::Gun(gun(0.80, 35.0, 1, DEFAULT_SPREAD, 0xffee00, falloff(10.0, 30.0, 0.70), None, 2.2)),
};

static SHOTGUN: WeaponDef = WeaponDef {
    key: WeaponKey::Shotgun,
    damage: 22,
    cooldown_ms: 680,
    max_ammo: Some(8),
    kind: WeaponKind::Gun(gun(0.76, 22.0, 6, 0.22, 0xff8800, falloff(6.0, 18.0, 0.40), None, 1.5)),
};

static RIFLE: WeaponDef = WeaponDef {
    key: WeaponKey::Rifle,
    damage: 22,
    cooldown_ms: 120,
    max_ammo: Some(30),
    kind: WeaponKind::Gun(gun(1.20, 55.0, 1, DEFAULT_SPREAD, 0x00ffcc, falloff(20.0, 45.0, 0.65), None, 2.0)),
};

static SMG: WeaponDef = WeaponDef {
    key: WeaponKey::Smg,
    damage: 10,
    cooldown_ms: 75,
    max_ammo: Some(45),
    kind: WeaponKind::Gun(gun(1.00, 28.0, 1, DEFAULT_SPREAD, 0xcc88ff, falloff(10.0, 25.0, 0.60), None, 2.0)),
};

static SNIPER: WeaponDef = WeaponDef {
    key: WeaponKey::Sniper,
    damage: 90,
    cooldown_ms: 900,
    max_ammo: Some(5),
    kind: WeaponKind::Gun(gun(1.60, 90.0, 1, 0.0, 0xffffff, None, None, 2.5)),
};

static MINIGUN: WeaponDef = WeaponDef {
    key: WeaponKey::Minigun,
    damage: 7,
    cooldown_ms: 45,
    max_ammo: Some(120),
    kind: WeaponKind::Gun(gun(1.05, 30.0, 1, 0.18, 0xffaa00, falloff(12.0, 28.0, 0.60), None, 1.5)),
};

static CROSSBOW: WeaponDef = WeaponDef {
    key: WeaponKey::Crossbow,
    damage: 65,
    cooldown_ms: 950,
    max_ammo: Some(8),
    kind: WeaponKind::Gun(gun(0.85, 50.0, 1, 0.0, 0x88ff44, None, Some(0.0015), 2.0)),
};

static ROCKET: WeaponDef = WeaponDef {
    key: WeaponKey::Rocket,
    damage: 100,
    cooldown_ms: 2_200,
    max_ammo: Some(4),
    kind: WeaponKind::Rocket {
        ballistics: gun(0.55, 60.0, 1, 0.0, 0xff4400, None, Some(0.0005), 1.0),
        blast_radius: 6.0,
    },
};

static FLAMETHROWER: WeaponDef = WeaponDef {
    key: WeaponKey::Flamethrower,
    damage: 5,
    cooldown_ms: 60,
    max_ammo: Some(80),
    kind: WeaponKind::Gun(gun(0.55, 14.0, 4, 0.4, 0xff6600, falloff(6.0, 14.0, 0.50), None, 1.0)),
};

/// Rare weapons a supply crate can contain
pub const SUPPLY_WEAPONS: [WeaponKey; 4] = [
    WeaponKey::Sniper,
    WeaponKey::Minigun,
    WeaponKey::Rocket,
    WeaponKey::Crossbow,
];

// ============================================================================
// Shop
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShopItem {
    Armor,
    HeavyArmor,
    Speed,
    HealthKit,
    GrenPack,
    AmmoCrate,
    Stimpack,
    Radar,
}

impl ShopItem {
    pub const ALL: [ShopItem; 8] = [
        ShopItem::Armor,
        ShopItem::HeavyArmor,
        ShopItem::Speed,
        ShopItem::HealthKit,
        ShopItem::GrenPack,
        ShopItem::AmmoCrate,
        ShopItem::Stimpack,
        ShopItem::Radar,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ShopItem::Armor => "armor",
            ShopItem::HeavyArmor => "heavy_armor",
            ShopItem::Speed => "speed",
            ShopItem::HealthKit => "health_kit",
            ShopItem::GrenPack => "gren_pack",
            ShopItem::AmmoCrate => "ammo_crate",
            ShopItem::Stimpack => "stimpack",
            ShopItem::Radar => "radar",
        }
    }

    pub fn price(self) -> u32 {
        match self {
            ShopItem::Armor => 200,
            ShopItem::HeavyArmor => 400,
            ShopItem::Speed => 150,
            ShopItem::HealthKit => 80,
            ShopItem::GrenPack => 100,
            ShopItem::AmmoCrate => 120,
            ShopItem::Stimpack => 180,
            ShopItem::Radar => 250,
        }
    }

    /// Upgrade that must already be owned
    pub fn requires(self) -> Option<ShopItem> {
        match self {
            ShopItem::HeavyArmor => Some(ShopItem::Armor),
            _ => None,
        }
    }

    /// Upgrades persist for the match; everything else is consumed on purchase
    pub fn is_upgrade(self) -> bool {
        matches!(
            self,
            ShopItem::Armor | ShopItem::HeavyArmor | ShopItem::Speed | ShopItem::Radar
        )
    }
}

impl FromStr for ShopItem {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShopItem::ALL
            .into_iter()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| UnknownKey(s.to_string()))
    }
}

// ============================================================================
// Modes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Free-for-all deathmatch
    #[default]
    Ffa,
    /// Red versus blue, no friendly fire
    Tdm,
    /// One life, shrinking zone
    Lms,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Ffa, Mode::Tdm, Mode::Lms];

    pub fn rules(self) -> ModeRules {
        match self {
            Mode::Ffa => ModeRules {
                duration_ms: Some(600_000),
                lives: 3,
                score_limit: None,
                zone: None,
            },
            Mode::Tdm => ModeRules {
                duration_ms: Some(480_000),
                lives: 3,
                score_limit: Some(50),
                zone: None,
            },
            Mode::Lms => ModeRules {
                duration_ms: None,
                lives: 1,
                score_limit: None,
                zone: Some(ZoneRules {
                    full_radius: arena::PLAYABLE_RADIUS,
                    min_radius: 8.0,
                    shrink_ms: 300_000,
                    tick_damage: 2,
                }),
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Ffa => "ffa",
            Mode::Tdm => "tdm",
            Mode::Lms => "lms",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeRules {
    /// Fixed match length; `None` ends on elimination only
    pub duration_ms: Option<u64>,
    pub lives: u32,
    /// Team score that ends the match
    pub score_limit: Option<u32>,
    pub zone: Option<ZoneRules>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneRules {
    pub full_radius: f32,
    pub min_radius: f32,
    pub shrink_ms: u64,
    pub tick_damage: u32,
}

impl ZoneRules {
    /// Linear shrink from full to min radius over `shrink_ms`
    pub fn radius_at(&self, elapsed_ms: u64) -> f32 {
        let t = (elapsed_ms as f32 / self.shrink_ms as f32).clamp(0.0, 1.0);
        self.full_radius + (self.min_radius - self.full_radius) * t
    }
}

// ============================================================================
// Maps
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapId {
    Forest,
    City,
    Warehouse,
    Desert,
    Arctic,
    Rooftop,
}

impl MapId {
    /// Rotation order
    pub const ALL: [MapId; 6] = [
        MapId::Forest,
        MapId::City,
        MapId::Warehouse,
        MapId::Desert,
        MapId::Arctic,
        MapId::Rooftop,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MapId::Forest => "forest",
            MapId::City => "city",
            MapId::Warehouse => "warehouse",
            MapId::Desert => "desert",
            MapId::Arctic => "arctic",
            MapId::Rooftop => "rooftop",
        }
    }

    pub fn pickup_spots(self) -> &'static [(f32, f32)] {
        match self {
            MapId::Forest => &[
                (-20.0, 0.0), (20.0, 0.0), (0.0, 20.0), (0.0, -20.0), (-14.0, 14.0), (14.0, 14.0),
                (-14.0, -14.0), (14.0, -14.0), (-24.0, 8.0), (24.0, 8.0), (8.0, 24.0), (-8.0, -24.0),
                (-10.0, 22.0), (10.0, -22.0), (22.0, -10.0), (-22.0, 10.0), (0.0, 0.0),
            ],
            MapId::City => &[
                (-16.0, 0.0), (16.0, 0.0), (0.0, 16.0), (0.0, -16.0), (-22.0, -22.0), (22.0, 22.0),
                (-22.0, 22.0), (22.0, -22.0), (-8.0, 8.0), (8.0, -8.0), (8.0, 8.0), (-8.0, -8.0),
                (0.0, 28.0), (0.0, -28.0), (28.0, 0.0), (-28.0, 0.0), (0.0, 0.0),
            ],
            MapId::Warehouse => &[
                (-10.0, 0.0), (10.0, 0.0), (0.0, 10.0), (0.0, -10.0), (-6.0, 6.0), (6.0, -6.0),
                (6.0, 6.0), (-6.0, -6.0), (-16.0, 0.0), (16.0, 0.0), (0.0, 16.0), (0.0, -16.0),
                (-12.0, 12.0), (12.0, -12.0), (-12.0, -12.0), (12.0, 12.0), (0.0, 0.0),
            ],
            MapId::Desert => &[
                (-18.0, 0.0), (18.0, 0.0), (0.0, 18.0), (0.0, -18.0), (-12.0, 12.0), (12.0, -12.0),
                (12.0, 12.0), (-12.0, -12.0), (-24.0, 6.0), (24.0, -6.0), (6.0, -24.0), (-6.0, 24.0),
                (-18.0, -18.0), (18.0, 18.0), (-18.0, 18.0), (18.0, -18.0), (0.0, 0.0),
            ],
            MapId::Arctic => &[
                (-15.0, 0.0), (15.0, 0.0), (0.0, 15.0), (0.0, -15.0), (-10.0, 10.0), (10.0, -10.0),
                (-10.0, -10.0), (10.0, 10.0), (-20.0, 5.0), (20.0, -5.0), (5.0, -20.0), (-5.0, 20.0),
                (-16.0, -16.0), (16.0, 16.0), (-20.0, 0.0), (20.0, 0.0), (0.0, 0.0),
            ],
            MapId::Rooftop => &[
                (-14.0, 0.0), (14.0, 0.0), (0.0, 14.0), (0.0, -14.0), (-10.0, 10.0), (10.0, -10.0),
                (10.0, 10.0), (-10.0, -10.0), (-18.0, 0.0), (18.0, 0.0), (0.0, -18.0), (0.0, 18.0),
                (-14.0, -14.0), (14.0, 14.0), (-8.0, 0.0), (8.0, 0.0), (0.0, 0.0),
            ],
        }
    }

    pub fn barrel_spots(self) -> &'static [(f32, f32)] {
        match self {
            MapId::Forest => &[(-6.0, 12.0), (6.0, -12.0), (18.0, 18.0), (-18.0, -18.0), (30.0, -4.0), (-30.0, 4.0)],
            MapId::City => &[(-12.0, 4.0), (12.0, -4.0), (4.0, 20.0), (-4.0, -20.0), (26.0, 12.0), (-26.0, -12.0)],
            MapId::Warehouse => &[(-4.0, 8.0), (4.0, -8.0), (-14.0, 4.0), (14.0, -4.0), (8.0, 14.0), (-8.0, -14.0)],
            MapId::Desert => &[(-9.0, 15.0), (9.0, -15.0), (21.0, 3.0), (-21.0, -3.0), (15.0, 21.0), (-15.0, -21.0)],
            MapId::Arctic => &[(-7.0, 13.0), (7.0, -13.0), (13.0, 7.0), (-13.0, -7.0), (24.0, 18.0), (-24.0, -18.0)],
            MapId::Rooftop => &[(-5.0, 9.0), (5.0, -9.0), (12.0, 4.0), (-12.0, -4.0), (16.0, 16.0), (-16.0, -16.0)],
        }
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MapId {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MapId::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownKey(s.to_string()))
    }
}

/// What a pickup grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "weapon")]
pub enum PickupKind {
    Weapon(WeaponKey),
    Ammo,
    Supply,
}

/// Layout pickups cycle through this list by spot index
pub const LAYOUT_PICKUP_CYCLE: [PickupKind; 12] = [
    PickupKind::Weapon(WeaponKey::Pistol),
    PickupKind::Weapon(WeaponKey::Shotgun),
    PickupKind::Weapon(WeaponKey::Rifle),
    PickupKind::Weapon(WeaponKey::Smg),
    PickupKind::Weapon(WeaponKey::Sniper),
    PickupKind::Weapon(WeaponKey::Minigun),
    PickupKind::Weapon(WeaponKey::Crossbow),
    PickupKind::Weapon(WeaponKey::Rocket),
    PickupKind::Weapon(WeaponKey::Flamethrower),
    PickupKind::Weapon(WeaponKey::Pistol),
    PickupKind::Ammo,
    PickupKind::Ammo,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falloff_is_flat_then_linear_then_floored() {
        let f = Falloff { start: 20.0, end: 45.0, min_pct: 0.65 };
        assert_eq!(f.factor(0.0), 1.0);
        assert_eq!(f.factor(20.0), 1.0);
        assert!((f.factor(32.5) - 0.825).abs() < 1e-5);
        assert_eq!(f.factor(45.0), 0.65);
        assert_eq!(f.factor(80.0), 0.65);
    }

    #[test]
    fn wire_keys_parse() {
        assert_eq!("rifle".parse::<WeaponKey>(), Ok(WeaponKey::Rifle));
        assert_eq!("heavy_armor".parse::<ShopItem>(), Ok(ShopItem::HeavyArmor));
        assert_eq!("rooftop".parse::<MapId>(), Ok(MapId::Rooftop));
        assert!("laser".parse::<WeaponKey>().is_err());
        assert!("jetpack".parse::<ShopItem>().is_err());
    }

    #[test]
    fn only_ranged_weapons_have_ballistics() {
        for key in WeaponKey::ALL {
            let def = key.def();
            assert_eq!(def.key, key);
            let ranged = matches!(def.kind, WeaponKind::Gun(_) | WeaponKind::Rocket { .. });
            assert_eq!(def.is_ranged(), ranged);
        }
    }

    #[test]
    fn zone_shrinks_linearly_and_stops_at_minimum() {
        let zone = Mode::Lms.rules().zone.unwrap();
        assert_eq!(zone.radius_at(0), 60.0);
        assert!((zone.radius_at(150_000) - 34.0).abs() < 1e-4);
        assert_eq!(zone.radius_at(300_000), 8.0);
        assert_eq!(zone.radius_at(900_000), 8.0);
    }

    #[test]
    fn every_map_has_layouts() {
        for map in MapId::ALL {
            assert!(!map.pickup_spots().is_empty());
            assert!(!map.barrel_spots().is_empty());
        }
    }
}
