//! Global kill leaderboard, kept in memory

use parking_lot::RwLock;
use serde::Serialize;

use crate::ws::protocol::PlayerResult;

const BOARD_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub kills: u32,
    pub matches: u32,
}

#[derive(Debug, Default)]
pub struct Leaderboard {
    entries: RwLock<Vec<LeaderboardEntry>>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a finished match into the board by display name
    pub fn record(&self, results: &[PlayerResult]) {
        let mut entries = self.entries.write();
        for row in results {
            match entries.iter_mut().find(|e| e.name == row.name) {
                Some(entry) => {
                    entry.kills += row.kills;
                    entry.matches += 1;
                }
                None => entries.push(LeaderboardEntry {
                    name: row.name.clone(),
                    kills: row.kills,
                    matches: 1,
                }),
            }
        }
        entries.sort_by(|a, b| b.kills.cmp(&a.kills));
        entries.truncate(BOARD_SIZE);
    }

    pub fn top(&self) -> Vec<LeaderboardEntry> {
        self.entries.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, kills: u32) -> PlayerResult {
        PlayerResult {
            name: name.into(),
            kills,
            deaths: 0,
            assists: 0,
            money: 0,
            team: None,
        }
    }

    #[test]
    fn merges_by_name() {
        let board = Leaderboard::new();
        board.record(&[result("ana", 3), result("bo", 5)]);
        board.record(&[result("ana", 4)]);

        let top = board.top();
        assert_eq!(top[0], LeaderboardEntry { name: "ana".into(), kills: 7, matches: 2 });
        assert_eq!(top[1], LeaderboardEntry { name: "bo".into(), kills: 5, matches: 1 });
    }

    #[test]
    fn keeps_ten_best() {
        let board = Leaderboard::new();
        let rows: Vec<PlayerResult> = (0..14).map(|i| result(&format!("p{i}"), i)).collect();
        board.record(&rows);

        let top = board.top();
        assert_eq!(top.len(), 10);
        assert_eq!(top[0].kills, 13);
        assert_eq!(top[9].kills, 4);
    }
}
