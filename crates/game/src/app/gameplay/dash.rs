use engine::Vec2;
use serde::Serialize;

use super::types::Facing;

pub const DASH_ACTIVE_TICKS: u32 = 10;
pub const DASH_COOLDOWN_TICKS: u32 = 60;
pub const DASH_SPEED: f32 = 15.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DashState {
    #[default]
    Idle,
    Active {
        remaining: u32,
        direction: Vec2,
    },
    Cooling {
        remaining: u32,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DashAbility {
    state: DashState,
}

impl DashAbility {
    /// Starts a dash along the held input, or along `facing` when no
    /// movement key is held. Returns false unless idle.
    pub fn trigger(&mut self, input_axis: Vec2, facing: Facing) -> bool {
        if self.state != DashState::Idle {
            return false;
        }
        let direction = if input_axis.is_zero() {
            facing.unit()
        } else {
            input_axis.normalized_or_zero()
        };
        self.state = DashState::Active {
            remaining: DASH_ACTIVE_TICKS,
            direction,
        };
        true
    }

    /// Velocity that overrides walking this tick, if dashing.
    pub fn velocity(&self) -> Option<Vec2> {
        match self.state {
            DashState::Active { direction, .. } => Some(direction * DASH_SPEED),
            DashState::Idle | DashState::Cooling { .. } => None,
        }
    }

    pub fn tick(&mut self) {
        self.state = match self.state {
            DashState::Idle => DashState::Idle,
            DashState::Active {
                remaining,
                direction,
            } => {
                let remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    DashState::Cooling {
                        remaining: DASH_COOLDOWN_TICKS,
                    }
                } else {
                    DashState::Active {
                        remaining,
                        direction,
                    }
                }
            }
            DashState::Cooling { remaining } => {
                let remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    DashState::Idle
                } else {
                    DashState::Cooling { remaining }
                }
            }
        };
    }

    pub fn state(&self) -> DashState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, DashState::Active { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_runs_active_then_cooling_then_idle() {
        let mut dash = DashAbility::default();
        assert!(dash.trigger(Vec2::new(1.0, 1.0), Facing::Down));

        let mut active_ticks = 0;
        while dash.is_active() {
            active_ticks += 1;
            dash.tick();
        }
        assert_eq!(active_ticks, DASH_ACTIVE_TICKS);
        assert!(!dash.trigger(Vec2::ZERO, Facing::Up), "cooling rejects");

        let mut cooling_ticks = 0;
        while dash.state() != DashState::Idle {
            cooling_ticks += 1;
            dash.tick();
        }
        assert_eq!(cooling_ticks, DASH_COOLDOWN_TICKS);
        assert!(dash.trigger(Vec2::ZERO, Facing::Up));
    }

    #[test]
    fn retrigger_while_active_keeps_state() {
        let mut dash = DashAbility::default();
        assert!(dash.trigger(Vec2::new(1.0, 0.0), Facing::Down));
        dash.tick();
        let before = dash.state();
        assert!(!dash.trigger(Vec2::new(-1.0, 0.0), Facing::Left));
        assert_eq!(dash.state(), before);
    }

    #[test]
    fn no_input_falls_back_to_facing() {
        let mut dash = DashAbility::default();
        dash.trigger(Vec2::ZERO, Facing::Left);
        assert_eq!(dash.velocity(), Some(Vec2::new(-DASH_SPEED, 0.0)));
    }

    #[test]
    fn diagonal_input_is_normalized() {
        let mut dash = DashAbility::default();
        dash.trigger(Vec2::new(1.0, -1.0), Facing::Down);
        let velocity = dash.velocity().expect("active");
        assert!((velocity.length() - DASH_SPEED).abs() < 1e-4);
    }
}
