use serde::Serialize;

pub const POISON_DURATION_TICKS: u32 = 300;
pub const DASH_SHAKE: u32 = 3;
const COMBO_SHAKE_MIN_MULTIPLIER: f32 = 2.0;
const MAX_SHAKE: u32 = 15;
const COMBO_FLASH_ALPHA: u32 = 50;
const FLASH_DECAY_PER_TICK: u32 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoisonStatus {
    remaining_ticks: u32,
}

impl PoisonStatus {
    /// Returns false when already poisoned; contact does not refresh.
    pub fn apply(&mut self) -> bool {
        if self.is_active() {
            return false;
        }
        self.remaining_ticks = POISON_DURATION_TICKS;
        true
    }

    pub fn cure(&mut self) -> bool {
        let was_active = self.is_active();
        self.remaining_ticks = 0;
        was_active
    }

    pub fn tick(&mut self) {
        self.remaining_ticks = self.remaining_ticks.saturating_sub(1);
    }

    pub fn is_active(&self) -> bool {
        self.remaining_ticks > 0
    }

    pub fn remaining_ticks(&self) -> u32 {
        self.remaining_ticks
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashTier {
    #[default]
    None,
    Orange,
    Red,
    Violet,
}

impl FlashTier {
    fn for_multiplier(multiplier: f32) -> Self {
        if multiplier >= 4.0 {
            Self::Violet
        } else if multiplier >= 3.0 {
            Self::Red
        } else if multiplier >= 2.0 {
            Self::Orange
        } else {
            Self::None
        }
    }
}

/// Presentation counters a renderer reads from the snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScreenEffects {
    pub shake: u32,
    pub flash_alpha: u32,
    pub flash_tier: FlashTier,
}

impl ScreenEffects {
    pub fn on_pickup(&mut self, multiplier: f32) {
        if multiplier < COMBO_SHAKE_MIN_MULTIPLIER {
            return;
        }
        self.shake = ((multiplier * 3.0).floor() as u32).min(MAX_SHAKE);
        self.flash_alpha = COMBO_FLASH_ALPHA;
        self.flash_tier = FlashTier::for_multiplier(multiplier);
    }

    pub fn on_dash(&mut self) {
        self.shake = DASH_SHAKE;
    }

    pub fn decay(&mut self) {
        self.shake = self.shake.saturating_sub(1);
        self.flash_alpha = self.flash_alpha.saturating_sub(FLASH_DECAY_PER_TICK);
        if self.flash_alpha == 0 {
            self.flash_tier = FlashTier::None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poison_does_not_refresh_while_active() {
        let mut poison = PoisonStatus::default();
        assert!(poison.apply());
        poison.tick();
        assert!(!poison.apply());
        assert_eq!(poison.remaining_ticks(), POISON_DURATION_TICKS - 1);
        assert!(poison.cure());
        assert!(!poison.is_active());
        assert!(!poison.cure());
    }

    #[test]
    fn poison_expires_after_duration() {
        let mut poison = PoisonStatus::default();
        poison.apply();
        for _ in 0..POISON_DURATION_TICKS {
            poison.tick();
        }
        assert!(!poison.is_active());
    }

    #[test]
    fn big_combo_pickup_shakes_and_flashes() {
        let mut effects = ScreenEffects::default();
        effects.on_pickup(1.5);
        assert_eq!(effects, ScreenEffects::default());

        effects.on_pickup(5.0);
        assert_eq!(effects.shake, 15);
        assert_eq!(effects.flash_alpha, 50);
        assert_eq!(effects.flash_tier, FlashTier::Violet);

        for _ in 0..5 {
            effects.decay();
        }
        assert_eq!(effects.flash_alpha, 0);
        assert_eq!(effects.flash_tier, FlashTier::None);
        assert_eq!(effects.shake, 10);
    }
}
