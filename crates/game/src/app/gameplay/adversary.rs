use engine::{Rect, Vec2};
use rand::Rng;
use serde::Serialize;

pub const ADVERSARY_SIZE: (f32, f32) = (35.0, 40.0);
pub const ADVERSARY_SPEED: f32 = 1.5;
pub const STUN_DURATION_TICKS: u32 = 3600;
const WANDER_MIN_TICKS: u32 = 60;
const WANDER_MAX_TICKS: u32 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinal {
    Left,
    Right,
    Up,
    Down,
}

impl Cardinal {
    pub const ALL: [Cardinal; 4] = [Cardinal::Left, Cardinal::Right, Cardinal::Up, Cardinal::Down];

    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }

    fn step(self, speed: f32) -> Vec2 {
        match self {
            Self::Left => Vec2::new(-speed, 0.0),
            Self::Right => Vec2::new(speed, 0.0),
            Self::Up => Vec2::new(0.0, -speed),
            Self::Down => Vec2::new(0.0, speed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AdversaryMode {
    Wandering,
    Stunned { remaining: u32 },
}

/// A litterer: wanders the map, drops items on a cooldown until its cap is
/// reached, and freezes for a long stun when struck.
#[derive(Debug, Clone, PartialEq)]
pub struct Adversary {
    mode: AdversaryMode,
    direction: Cardinal,
    direction_timer: u32,
    litter_timer: u32,
    litter_cooldown: u32,
    spawned: u32,
    spawn_cap: u32,
    idle_anim: u32,
}

impl Adversary {
    pub fn new<R: Rng + ?Sized>(rng: &mut R, litter_cooldown: u32, spawn_cap: u32) -> Self {
        let litter_cooldown = litter_cooldown.max(1);
        Self {
            mode: AdversaryMode::Wandering,
            direction: Cardinal::random(rng),
            direction_timer: rng.random_range(WANDER_MIN_TICKS..=WANDER_MAX_TICKS),
            litter_timer: rng.random_range(litter_cooldown / 2..=litter_cooldown),
            litter_cooldown,
            spawned: 0,
            spawn_cap,
            idle_anim: 0,
        }
    }

    /// Returns false when already stunned; the running stun is not extended.
    pub fn stun(&mut self) -> bool {
        if self.is_stunned() {
            return false;
        }
        self.mode = AdversaryMode::Stunned {
            remaining: STUN_DURATION_TICKS,
        };
        self.idle_anim = 0;
        true
    }

    /// Advances one tick and moves `bounds` inside `world`. Returns true when
    /// an item should be dropped at the adversary's center this tick.
    pub fn update<R: Rng + ?Sized>(&mut self, bounds: &mut Rect, world: &Rect, rng: &mut R) -> bool {
        if let AdversaryMode::Stunned { remaining } = self.mode {
            let remaining = remaining.saturating_sub(1);
            self.idle_anim = self.idle_anim.wrapping_add(1);
            self.mode = if remaining == 0 {
                AdversaryMode::Wandering
            } else {
                AdversaryMode::Stunned { remaining }
            };
            return false;
        }

        self.direction_timer = self.direction_timer.saturating_sub(1);
        if self.direction_timer == 0 {
            self.direction = Cardinal::random(rng);
            self.direction_timer = rng.random_range(WANDER_MIN_TICKS..=WANDER_MAX_TICKS);
        }

        let previous = *bounds;
        bounds.translate(self.direction.step(ADVERSARY_SPEED));
        if bounds.x < world.x || bounds.x > world.right() - bounds.w {
            bounds.x = previous.x;
            self.direction = Cardinal::random(rng);
        }
        if bounds.y < world.y || bounds.y > world.bottom() - bounds.h {
            bounds.y = previous.y;
            self.direction = Cardinal::random(rng);
        }

        self.litter_timer = self.litter_timer.saturating_sub(1);
        if self.litter_timer == 0 && self.spawned < self.spawn_cap {
            self.litter_timer = self.litter_cooldown;
            self.spawned += 1;
            return true;
        }
        false
    }

    pub fn mode(&self) -> AdversaryMode {
        self.mode
    }

    pub fn is_stunned(&self) -> bool {
        matches!(self.mode, AdversaryMode::Stunned { .. })
    }

    pub fn spawned(&self) -> u32 {
        self.spawned
    }

    pub fn spawn_cap(&self) -> u32 {
        self.spawn_cap
    }

    pub fn idle_anim(&self) -> u32 {
        self.idle_anim
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn world() -> Rect {
        Rect::new(0.0, 0.0, 2400.0, 1400.0)
    }

    #[test]
    fn litter_drops_respect_cooldown_and_cap() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut adversary = Adversary::new(&mut rng, 10, 3);
        let mut bounds = Rect::new(1200.0, 700.0, 35.0, 40.0);

        let mut drops = Vec::new();
        for tick in 0..200u32 {
            if adversary.update(&mut bounds, &world(), &mut rng) {
                drops.push(tick);
            }
        }
        assert_eq!(drops.len(), 3, "cap reached");
        assert_eq!(adversary.spawned(), adversary.spawn_cap());
        assert!(drops.windows(2).all(|pair| pair[1] - pair[0] == 10));
    }

    #[test]
    fn stunned_adversary_holds_still_for_full_duration() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut adversary = Adversary::new(&mut rng, 1, 100);
        let mut bounds = Rect::new(500.0, 500.0, 35.0, 40.0);
        assert!(adversary.stun());
        assert!(!adversary.stun(), "strike on a stunned litterer is a no-op");

        for _ in 0..STUN_DURATION_TICKS - 1 {
            assert!(!adversary.update(&mut bounds, &world(), &mut rng));
        }
        assert!(adversary.is_stunned());
        assert_eq!(bounds.x, 500.0);
        assert_eq!(bounds.y, 500.0);

        assert!(!adversary.update(&mut bounds, &world(), &mut rng));
        assert_eq!(adversary.mode(), AdversaryMode::Wandering);
        assert_eq!((bounds.x, bounds.y), (500.0, 500.0), "recovery tick does not move");
        assert_eq!(adversary.idle_anim(), STUN_DURATION_TICKS);
    }

    #[test]
    fn wandering_stays_inside_world() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut adversary = Adversary::new(&mut rng, 600, 0);
        let mut bounds = Rect::new(0.0, 0.0, 35.0, 40.0);
        for _ in 0..5_000 {
            adversary.update(&mut bounds, &world(), &mut rng);
            assert!(world().contains_rect(&bounds), "left world at {bounds:?}");
        }
    }
}
