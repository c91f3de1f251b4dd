pub const COMBO_DECAY_TICKS: u32 = 180;
const COMBO_STEP: u32 = 3;
const COMBO_STEP_BONUS: f32 = 0.5;
const COMBO_MAX_MULTIPLIER: f32 = 5.0;

/// Score plus the streak-driven multiplier applied to most awards.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBoard {
    score: u32,
    streak: u32,
    max_streak: u32,
    decay_ticks: u32,
    multiplier: f32,
}

impl Default for ScoreBoard {
    fn default() -> Self {
        Self {
            score: 0,
            streak: 0,
            max_streak: 0,
            decay_ticks: 0,
            multiplier: 1.0,
        }
    }
}

impl ScoreBoard {
    pub fn register(&mut self, collected: u32) {
        if collected == 0 {
            return;
        }
        self.streak = self.streak.saturating_add(collected);
        self.max_streak = self.max_streak.max(self.streak);
        self.decay_ticks = COMBO_DECAY_TICKS;
        let steps = (self.streak / COMBO_STEP) as f32;
        self.multiplier = (1.0 + steps * COMBO_STEP_BONUS).min(COMBO_MAX_MULTIPLIER);
    }

    /// Adds `points` scaled by the current multiplier and returns the amount
    /// actually added.
    pub fn award(&mut self, points: u32) -> u32 {
        let scaled = (points as f32 * self.multiplier).floor() as u32;
        self.score = self.score.saturating_add(scaled);
        scaled
    }

    /// Unscaled addition, used for quest rewards.
    pub fn add_flat(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    pub fn decay(&mut self) {
        if self.decay_ticks == 0 {
            return;
        }
        self.decay_ticks -= 1;
        if self.decay_ticks == 0 {
            self.streak = 0;
            self.multiplier = 1.0;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn max_streak(&self) -> u32 {
        self.max_streak
    }

    pub fn multiplier(&self) -> f32 {
        self.multiplier
    }

    pub fn decay_ticks(&self) -> u32 {
        self.decay_ticks
    }
}
