use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use super::types::UpgradeId;
use super::TICKS_PER_SECOND;

pub const LEVEL_TIME_LIMIT_TICKS: u32 = 180 * TICKS_PER_SECOND;
pub const BASE_CAPACITY: u32 = 5;
pub const BAG_CAPACITY: u32 = 10;
pub const TRACTOR_CAPACITY: u32 = 15;
const THREE_STAR_SECONDS: f32 = 90.0;
const TWO_STAR_SECONDS: f32 = 120.0;

pub fn stars_for_elapsed(elapsed_seconds: f32) -> u8 {
    if elapsed_seconds <= THREE_STAR_SECONDS {
        3
    } else if elapsed_seconds <= TWO_STAR_SECONDS {
        2
    } else {
        1
    }
}

/// Countdown for the running level, in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelClock {
    remaining_ticks: u32,
}

impl Default for LevelClock {
    fn default() -> Self {
        Self {
            remaining_ticks: LEVEL_TIME_LIMIT_TICKS,
        }
    }
}

impl LevelClock {
    pub fn tick(&mut self) {
        self.remaining_ticks = self.remaining_ticks.saturating_sub(1);
    }

    pub fn expired(&self) -> bool {
        self.remaining_ticks == 0
    }

    pub fn remaining_seconds(&self) -> f32 {
        self.remaining_ticks as f32 / TICKS_PER_SECOND as f32
    }

    pub fn elapsed_seconds(&self) -> f32 {
        (LEVEL_TIME_LIMIT_TICKS - self.remaining_ticks) as f32 / TICKS_PER_SECOND as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseOutcome {
    Purchased,
    AlreadyOwned,
    InsufficientFunds,
    /// Purchases are only taken in the shop or while paused.
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelRecord {
    pub best_time_seconds: f32,
    pub best_stars: u8,
}

/// Everything that outlives a single run: coins, upgrades, and per-level
/// records. Lives for the process; nothing is written to disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerProgress {
    total_coins: u32,
    owned: BTreeSet<UpgradeId>,
    records: BTreeMap<u32, LevelRecord>,
}

impl PlayerProgress {
    pub fn total_coins(&self) -> u32 {
        self.total_coins
    }

    pub fn add_coins(&mut self, amount: u32) {
        self.total_coins = self.total_coins.saturating_add(amount);
    }

    pub fn owns(&self, upgrade: UpgradeId) -> bool {
        self.owned.contains(&upgrade)
    }

    pub fn owned_upgrades(&self) -> Vec<UpgradeId> {
        self.owned.iter().copied().collect()
    }

    pub fn purchase(&mut self, upgrade: UpgradeId) -> PurchaseOutcome {
        if self.owns(upgrade) {
            debug!(upgrade = upgrade.as_str(), "purchase_rejected_owned");
            return PurchaseOutcome::AlreadyOwned;
        }
        let price = upgrade.price();
        if self.total_coins < price {
            debug!(
                upgrade = upgrade.as_str(),
                price,
                coins = self.total_coins,
                "purchase_rejected_funds"
            );
            return PurchaseOutcome::InsufficientFunds;
        }
        self.total_coins -= price;
        self.owned.insert(upgrade);
        debug!(upgrade = upgrade.as_str(), price, "purchase_accepted");
        PurchaseOutcome::Purchased
    }

    pub fn carry_capacity(&self) -> u32 {
        if self.owns(UpgradeId::Tractor) {
            TRACTOR_CAPACITY
        } else if self.owns(UpgradeId::Bag) {
            BAG_CAPACITY
        } else {
            BASE_CAPACITY
        }
    }

    /// Keeps the faster time and the higher star count independently.
    pub fn record_level(&mut self, level: u32, elapsed_seconds: f32, stars: u8) {
        let record = self.records.entry(level).or_insert(LevelRecord {
            best_time_seconds: elapsed_seconds,
            best_stars: stars,
        });
        record.best_time_seconds = record.best_time_seconds.min(elapsed_seconds);
        record.best_stars = record.best_stars.max(stars);
    }

    pub fn record(&self, level: u32) -> Option<LevelRecord> {
        self.records.get(&level).copied()
    }
}
