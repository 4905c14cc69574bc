//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

use crate::game::catalog::{MapId, Mode, PickupKind, ShopItem};
use crate::game::entity::{InventorySlot, Pickup, Team};
use crate::game::{ConnId, MatchId};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Enter matchmaking for a mode
    Join {
        #[serde(default)]
        name: Option<String>,
        /// Defaults to free-for-all
        #[serde(default)]
        mode: Option<Mode>,
    },

    /// Claimed position and facing
    Move { x: f32, z: f32, angle: f32 },

    /// Fire a ranged weapon
    #[serde(rename_all = "camelCase")]
    Shoot {
        weapon_key: String,
        angle: f32,
        #[serde(default)]
        pitch: Option<f32>,
    },

    /// Swing the selected melee weapon (fists otherwise)
    Melee,

    /// Throw a grenade that lands at (x, z)
    Grenade {
        x: f32,
        z: f32,
        vx: f32,
        #[serde(default)]
        vy: Option<f32>,
        vz: f32,
    },

    /// Call the killstreak airstrike on (x, z)
    Airstrike { x: f32, z: f32 },

    Pickup { id: u32 },

    SwitchWeapon { index: usize },

    DropWeapon { index: usize },

    #[serde(rename_all = "camelCase")]
    BuyItem { item_key: String },

    /// Vote for the next map after a match ends
    Vote { map: String },

    /// Leave current match
    Leave,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMsg {
    /// Welcome message after connection
    #[serde(rename_all = "camelCase")]
    Welcome { conn_id: ConnId, server_time: u64 },

    /// Full initial state for a player entering a match
    #[serde(rename_all = "camelCase")]
    Joined {
        player_id: ConnId,
        match_id: MatchId,
        map: MapId,
        mode: Mode,
        team: Option<Team>,
        spawn_x: f32,
        spawn_z: f32,
        lives: u32,
        money: u32,
        inventory: Vec<InventorySlot>,
        pickups: Vec<Pickup>,
        hazards: Vec<HazardView>,
        time_left: Option<u64>,
        player_count: usize,
        snapshot: Snapshot,
    },

    /// Periodic compact state
    #[serde(rename = "S")]
    Snapshot(Snapshot),

    /// Damage taken (to the victim)
    Hit { hp: f32, dmg: u32, headshot: bool },

    /// Damage dealt (to the attacker)
    HitMarker {
        target: ConnId,
        dmg: u32,
        headshot: bool,
        kill: bool,
    },

    /// Someone survived a hit
    PHurt { id: ConnId, hp: f32 },

    /// Kill feed
    #[serde(rename_all = "camelCase")]
    Kill {
        killer: Option<ConnId>,
        killer_name: Option<String>,
        victim: ConnId,
        victim_name: String,
        cause: &'static str,
    },

    YouDied { lives: u32, money: u32 },

    Respawned {
        x: f32,
        z: f32,
        inventory: Vec<InventorySlot>,
        money: u32,
    },

    Eliminated { kills: u32, deaths: u32 },

    Explosion { x: f32, z: f32, big: bool },

    GrenadeFly {
        ox: f32,
        oz: f32,
        vx: f32,
        vy: f32,
        vz: f32,
    },

    Airstrike { caller: ConnId, x: f32, z: f32 },

    SupplyDrop { id: u32, x: f32, z: f32 },

    BulletImpact { x: f32, y: f32, z: f32 },

    #[serde(rename = "pickupOK")]
    PickupOk {
        id: Option<u32>,
        inventory: Vec<InventorySlot>,
        msg: String,
    },

    PickupGone { id: u32 },

    /// A pickup became available (respawned, dropped)
    PickupBack {
        id: u32,
        #[serde(flatten)]
        kind: PickupKind,
        x: f32,
        z: f32,
    },

    EarnMoney {
        amount: u32,
        total: u32,
        reason: &'static str,
    },

    #[serde(rename_all = "camelCase")]
    ShopResult {
        item_key: String,
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        upgrade: Option<ShopItem>,
        money: u32,
        hp: f32,
        inventory: Vec<InventorySlot>,
    },

    StreakReward { streak: u32, reward: StreakReward },

    TeamScore(TeamScore),

    #[serde(rename_all = "camelCase")]
    MatchEnd {
        reason: EndReason,
        winner: Option<String>,
        winning_team: Option<Team>,
        results: Vec<PlayerResult>,
    },

    VoteStart {
        candidates: Vec<MapId>,
        seconds: u64,
    },

    VoteUpdate { tally: Vec<VoteCount> },

    VoteEnd { winner: MapId, mode: Mode },

    PJoin {
        id: ConnId,
        name: String,
        team: Option<Team>,
    },

    PLeave { id: ConnId, name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakReward {
    Speed,
    Airstrike,
    Minigun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    TimeUp,
    ScoreLimit,
    LastStanding,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TeamScore {
    pub red: u32,
    pub blue: u32,
}

impl TeamScore {
    pub fn get(&self, team: Team) -> u32 {
        match team {
            Team::Red => self.red,
            Team::Blue => self.blue,
        }
    }

    pub fn add(&mut self, team: Team) -> u32 {
        let score = match team {
            Team::Red => &mut self.red,
            Team::Blue => &mut self.blue,
        };
        *score += 1;
        *score
    }

    pub fn leader(&self) -> Option<Team> {
        match self.red.cmp(&self.blue) {
            std::cmp::Ordering::Greater => Some(Team::Red),
            std::cmp::Ordering::Less => Some(Team::Blue),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Final line for one player
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerResult {
    pub name: String,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub money: u32,
    pub team: Option<Team>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteCount {
    pub map: MapId,
    pub votes: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct HazardView {
    pub i: u32,
    pub x: f32,
    pub z: f32,
}

/// Compact per-tick state. Keys are shortened for bandwidth.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    #[serde(rename = "P")]
    pub players: Vec<PlayerSnapshot>,
    #[serde(rename = "B")]
    pub bullets: Vec<ProjectileSnapshot>,
    #[serde(rename = "R")]
    pub rockets: Vec<ProjectileSnapshot>,
    #[serde(rename = "H")]
    pub hazards: Vec<HazardView>,
    /// Seconds left; absent for modes without a clock
    #[serde(rename = "T")]
    pub time_left: Option<u64>,
    #[serde(rename = "LB")]
    pub scoreboard: Vec<ScoreRow>,
    #[serde(rename = "M")]
    pub mode: Mode,
    #[serde(rename = "Z")]
    pub zone_radius: Option<f32>,
    #[serde(rename = "TS")]
    pub team_score: Option<TeamScore>,
    #[serde(rename = "PC")]
    pub player_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerSnapshot {
    pub i: ConnId,
    pub n: String,
    pub x: f32,
    pub z: f32,
    pub a: f32,
    pub h: f32,
    pub l: u32,
    pub k: u32,
    pub d: bool,
    pub w: usize,
    pub ar: u8,
    pub t: Option<Team>,
    pub s: StreakFlags,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StreakFlags {
    pub spd: bool,
    pub air: bool,
    pub mini: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectileSnapshot {
    pub i: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreRow {
    pub n: String,
    pub k: u32,
    pub d: u32,
    pub m: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn parses_client_intents() {
        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"shoot","weaponKey":"rifle","angle":1.5}"#).unwrap();
        assert!(matches!(msg, ClientMsg::Shoot { ref weapon_key, pitch: None, .. } if weapon_key == "rifle"));

        let msg: ClientMsg = serde_json::from_str(r#"{"type":"join","mode":"lms"}"#).unwrap();
        assert!(matches!(msg, ClientMsg::Join { name: None, mode: Some(Mode::Lms) }));

        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"buyItem","itemKey":"heavy_armor"}"#).unwrap();
        assert!(matches!(msg, ClientMsg::BuyItem { ref item_key } if item_key == "heavy_armor"));

        let msg: ClientMsg = serde_json::from_str(r#"{"type":"switchWeapon","index":2}"#).unwrap();
        assert!(matches!(msg, ClientMsg::SwitchWeapon { index: 2 }));
    }

    #[test]
    fn rejects_malformed_intents() {
        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"move","x":"a","z":0,"angle":0}"#).is_err());
        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"teleport"}"#).is_err());
    }

    #[test]
    fn server_event_names() {
        let json = serde_json::to_value(ServerMsg::PHurt { id: Uuid::nil(), hp: 50.0 }).unwrap();
        assert_eq!(json["type"], "pHurt");

        let json = serde_json::to_value(ServerMsg::PickupOk {
            id: Some(3),
            inventory: vec![],
            msg: "AMMO CRATE".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "pickupOK");

        let json = serde_json::to_value(ServerMsg::PickupBack {
            id: 10_000,
            kind: PickupKind::Weapon(crate::game::catalog::WeaponKey::Rifle),
            x: 1.0,
            z: 2.0,
        })
        .unwrap();
        assert_eq!(json["type"], "pickupBack");
        assert_eq!(json["kind"], "weapon");
        assert_eq!(json["weapon"], "rifle");

        let json = serde_json::to_value(ServerMsg::TeamScore(TeamScore { red: 3, blue: 1 })).unwrap();
        assert_eq!(json["type"], "teamScore");
        assert_eq!(json["red"], 3);
    }

    #[test]
    fn team_score_leader() {
        let mut score = TeamScore::default();
        assert_eq!(score.leader(), None);
        score.add(Team::Blue);
        assert_eq!(score.leader(), Some(Team::Blue));
        assert_eq!(score.get(Team::Blue), 1);
    }
}
