//! In-match shop

use tracing::debug;

use crate::ws::protocol::ServerMsg;

use super::catalog::{player as tuning, ShopItem, WeaponKey};
use super::entity::{ArmorTier, InventorySlot, Player};
use super::{ConnId, Match};

/// Purchase refusal; the message is shown to the buyer as-is
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShopError {
    #[error("Unknown item")]
    UnknownItem,
    #[error("Not in a match")]
    NotInMatch,
    #[error("Already owned")]
    AlreadyOwned,
    #[error("Not enough money")]
    InsufficientFunds,
    #[error("Requires {0}")]
    Requires(&'static str),
    #[error("Cannot use while dead")]
    Dead,
}

fn owns(player: &Player, item: ShopItem) -> bool {
    match item {
        ShopItem::Armor => player.upgrades.armor >= ArmorTier::Light,
        ShopItem::HeavyArmor => player.upgrades.armor == ArmorTier::Heavy,
        ShopItem::Speed => player.upgrades.speed,
        ShopItem::Radar => player.upgrades.radar,
        _ => false,
    }
}

impl Match {
    /// Validate and apply a purchase, then reply with `shopResult`
    pub fn buy(&mut self, conn: ConnId, item_key: &str, now: u64) -> Result<ShopItem, ShopError> {
        let result = self.try_buy(conn, item_key, now);

        if let Some(p) = self.player(&conn) {
            let (ok, reason, upgrade) = match &result {
                Ok(item) => (true, None, item.is_upgrade().then_some(*item)),
                Err(e) => (false, Some(e.to_string()), None),
            };
            let msg = ServerMsg::ShopResult {
                item_key: item_key.to_string(),
                ok,
                reason,
                upgrade,
                money: p.money,
                hp: p.health.round(),
                inventory: p.inventory.clone(),
            };
            self.send_to(conn, msg);
        }

        if let Err(e) = &result {
            debug!(match_id = self.id, conn_id = %conn, item = item_key, reason = %e, "Purchase refused");
        }
        result
    }

    fn try_buy(&mut self, conn: ConnId, item_key: &str, now: u64) -> Result<ShopItem, ShopError> {
        let item: ShopItem = item_key.parse().map_err(|_| ShopError::UnknownItem)?;
        let p = self.player_mut(&conn).ok_or(ShopError::NotInMatch)?;

        if owns(p, item) {
            return Err(ShopError::AlreadyOwned);
        }
        if p.money < item.price() {
            return Err(ShopError::InsufficientFunds);
        }
        if let Some(required) = item.requires() {
            if !owns(p, required) {
                return Err(ShopError::Requires(required.as_str()));
            }
        }
        if p.dead && matches!(item, ShopItem::HealthKit | ShopItem::Stimpack) {
            return Err(ShopError::Dead);
        }

        p.money -= item.price();
        match item {
            ShopItem::Armor => p.upgrades.armor = ArmorTier::Light,
            ShopItem::HeavyArmor => p.upgrades.armor = ArmorTier::Heavy,
            ShopItem::Speed => p.upgrades.speed = true,
            ShopItem::Radar => p.upgrades.radar = true,
            ShopItem::HealthKit => {
                p.health = (p.health + tuning::HEALTH_KIT_HP).min(tuning::MAX_HEALTH);
            }
            ShopItem::Stimpack => p.regen_until = now + tuning::STIMPACK_MS,
            ShopItem::GrenPack => match p.slot_mut(WeaponKey::Grenade) {
                Some(slot) => {
                    *slot.ammo.get_or_insert(0) += tuning::GREN_PACK_COUNT;
                }
                None => p.inventory.push(InventorySlot::new(
                    WeaponKey::Grenade,
                    Some(tuning::GREN_PACK_COUNT),
                )),
            },
            ShopItem::AmmoCrate => {
                for slot in p.inventory.iter_mut() {
                    let def = slot.weapon.def();
                    if def.is_ranged() && slot.ammo.is_some() {
                        slot.ammo = def.max_ammo;
                    }
                }
            }
        }
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::catalog::Mode;
    use crate::game::r#match::tests::with_players;

    fn reply(game: &mut Match) -> ServerMsg {
        game.take_outbox().envelopes.pop().unwrap().msg
    }

    #[test]
    fn armor_then_heavy_armor() {
        let (mut game, ids) = with_players(Mode::Ffa, 1);
        game.player_mut(&ids[0]).unwrap().money = 700;

        assert_eq!(game.buy(ids[0], "heavy_armor", 0), Err(ShopError::Requires("armor")));
        assert!(matches!(
            reply(&mut game),
            ServerMsg::ShopResult { ok: false, reason: Some(ref r), money: 700, .. } if r == "Requires armor"
        ));

        assert_eq!(game.buy(ids[0], "armor", 0), Ok(ShopItem::Armor));
        assert_eq!(game.buy(ids[0], "heavy_armor", 0), Ok(ShopItem::HeavyArmor));
        let p = game.player(&ids[0]).unwrap();
        assert_eq!(p.money, 100);
        assert_eq!(p.upgrades.armor, ArmorTier::Heavy);
    }

    #[test]
    fn rejects_unknown_owned_and_unaffordable() {
        let (mut game, ids) = with_players(Mode::Ffa, 1);
        assert_eq!(game.buy(ids[0], "jetpack", 0), Err(ShopError::UnknownItem));
        assert_eq!(game.buy(ids[0], "radar", 0), Err(ShopError::InsufficientFunds));
        assert_eq!(game.buy(ids[0], "speed", 0), Ok(ShopItem::Speed));
        game.player_mut(&ids[0]).unwrap().money = 500;
        assert_eq!(game.buy(ids[0], "speed", 0), Err(ShopError::AlreadyOwned));
        assert_eq!(game.player(&ids[0]).unwrap().money, 500);

        let replies = game.take_outbox().envelopes;
        assert_eq!(replies.len(), 4);
    }

    #[test]
    fn consumables_apply_immediately() {
        let (mut game, ids) = with_players(Mode::Ffa, 1);
        {
            let p = game.player_mut(&ids[0]).unwrap();
            p.money = 1_000;
            p.health = 70.0;
            p.inventory.push(InventorySlot::new(WeaponKey::Rifle, Some(3)));
        }
        game.buy(ids[0], "health_kit", 0).unwrap();
        game.buy(ids[0], "gren_pack", 0).unwrap();
        game.buy(ids[0], "ammo_crate", 0).unwrap();
        game.buy(ids[0], "stimpack", 5_000).unwrap();

        let p = game.player(&ids[0]).unwrap();
        assert_eq!(p.health, 100.0);
        assert_eq!(p.slot(WeaponKey::Grenade).unwrap().ammo, Some(4));
        assert_eq!(p.slot(WeaponKey::Rifle).unwrap().ammo, Some(30));
        assert_eq!(p.regen_until, 17_000);
        assert_eq!(p.money, 1_000 - 80 - 100 - 120 - 180);
    }

    #[test]
    fn dead_players_cannot_heal() {
        let (mut game, ids) = with_players(Mode::Ffa, 1);
        game.player_mut(&ids[0]).unwrap().dead = true;
        assert_eq!(game.buy(ids[0], "health_kit", 0), Err(ShopError::Dead));
        assert_eq!(game.buy(ids[0], "armor", 0), Ok(ShopItem::Armor));
    }
}
