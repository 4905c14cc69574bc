//! Snapshot building for network transmission

use crate::ws::protocol::{
    PlayerSnapshot, ProjectileSnapshot, ScoreRow, Snapshot, StreakFlags,
};

use super::entity::Projectile;
use super::Match;

const SCOREBOARD_ROWS: usize = 10;

/// Builds the compact per-tick state
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    pub fn build(game: &Match, now: u64) -> Snapshot {
        let players = game
            .players
            .iter()
            .map(|p| PlayerSnapshot {
                i: p.id,
                n: p.name.clone(),
                x: round2(p.x),
                z: round2(p.z),
                a: round2(p.angle),
                h: p.health.round(),
                l: p.lives,
                k: p.kills,
                d: p.dead,
                w: p.weapon_idx,
                ar: p.upgrades.armor.level(),
                t: p.team,
                s: StreakFlags {
                    spd: p.speed_until > now,
                    air: p.airstrike_ready,
                    mini: p.minigun_until > now,
                },
            })
            .collect();

        let (rockets, bullets): (Vec<&Projectile>, Vec<&Projectile>) =
            game.projectiles.iter().partition(|p| p.is_rocket());

        let mut board: Vec<ScoreRow> = game
            .players
            .iter()
            .map(|p| ScoreRow {
                n: p.name.clone(),
                k: p.kills,
                d: p.deaths,
                m: p.money,
            })
            .collect();
        board.sort_by(|a, b| b.k.cmp(&a.k));
        board.truncate(SCOREBOARD_ROWS);

        Snapshot {
            players,
            bullets: bullets.into_iter().map(|p| projectile(p, true)).collect(),
            rockets: rockets.into_iter().map(|p| projectile(p, false)).collect(),
            hazards: game.hazard_views(),
            time_left: game.time_left_ms(now).map(|ms| ms / 1000),
            scoreboard: board,
            mode: game.mode,
            zone_radius: game.zone_radius.map(round2),
            team_score: game.team_score,
            player_count: game.players.len(),
        }
    }
}

fn projectile(p: &Projectile, with_color: bool) -> ProjectileSnapshot {
    ProjectileSnapshot {
        i: p.id,
        x: round2(p.x),
        y: round2(p.y),
        z: round2(p.z),
        c: with_color.then_some(p.color),
    }
}

/// Two decimals is plenty for rendering
pub fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}
