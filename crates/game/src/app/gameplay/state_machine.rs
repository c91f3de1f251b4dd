use serde::Serialize;
use tracing::info;

pub const CUTSCENE_TICKS: u32 = 180;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    #[default]
    Menu,
    Playing,
    Pause,
    Shop,
    Cutscene,
    LevelComplete,
    GameOver,
}

impl GameMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Menu => "menu",
            Self::Playing => "playing",
            Self::Pause => "pause",
            Self::Shop => "shop",
            Self::Cutscene => "cutscene",
            Self::LevelComplete => "level_complete",
            Self::GameOver => "game_over",
        }
    }

    /// Modes in which the simulation pipeline advances.
    pub fn runs_pipeline(self) -> bool {
        matches!(self, Self::Playing | Self::Cutscene)
    }
}

/// Owns the current mode and the cutscene countdown. Every transition method
/// returns false and leaves the mode untouched when it is not valid from the
/// current mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateMachine {
    mode: GameMode,
    cutscene_elapsed: u32,
}

impl StateMachine {
    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn cutscene_elapsed(&self) -> u32 {
        self.cutscene_elapsed
    }

    fn transition(&mut self, allowed_from: &[GameMode], to: GameMode) -> bool {
        if !allowed_from.contains(&self.mode) {
            return false;
        }
        info!(from = self.mode.as_str(), to = to.as_str(), "mode_changed");
        self.mode = to;
        true
    }

    pub fn can_start_game(&self) -> bool {
        self.mode == GameMode::Menu
    }

    pub fn can_advance(&self) -> bool {
        matches!(self.mode, GameMode::LevelComplete | GameMode::GameOver)
    }

    pub fn can_purchase(&self) -> bool {
        matches!(self.mode, GameMode::Shop | GameMode::Pause)
    }

    /// Enters play for a freshly loaded level.
    pub fn begin_level(&mut self) -> bool {
        self.cutscene_elapsed = 0;
        self.transition(&[GameMode::Menu, GameMode::LevelComplete], GameMode::Playing)
    }

    pub fn toggle_pause(&mut self) -> bool {
        match self.mode {
            GameMode::Playing => self.transition(&[GameMode::Playing], GameMode::Pause),
            GameMode::Pause => self.transition(&[GameMode::Pause], GameMode::Playing),
            _ => false,
        }
    }

    pub fn open_shop(&mut self) -> bool {
        self.transition(&[GameMode::Menu], GameMode::Shop)
    }

    pub fn close_shop(&mut self) -> bool {
        self.transition(&[GameMode::Shop], GameMode::Menu)
    }

    pub fn enter_cutscene(&mut self) -> bool {
        self.cutscene_elapsed = 0;
        self.transition(&[GameMode::Playing], GameMode::Cutscene)
    }

    /// Advances the cutscene and returns true on the tick it hands control
    /// back to play.
    pub fn tick_cutscene(&mut self) -> bool {
        if self.mode != GameMode::Cutscene {
            return false;
        }
        self.cutscene_elapsed += 1;
        if self.cutscene_elapsed < CUTSCENE_TICKS {
            return false;
        }
        self.cutscene_elapsed = 0;
        self.transition(&[GameMode::Cutscene], GameMode::Playing)
    }

    pub fn complete_level(&mut self) -> bool {
        self.transition(&[GameMode::Playing], GameMode::LevelComplete)
    }

    pub fn game_over(&mut self) -> bool {
        self.transition(&[GameMode::Playing], GameMode::GameOver)
    }

    pub fn return_to_menu(&mut self) -> bool {
        self.transition(&[GameMode::LevelComplete, GameMode::GameOver], GameMode::Menu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_commands_leave_mode_untouched() {
        let mut machine = StateMachine::default();
        assert!(!machine.toggle_pause());
        assert!(!machine.close_shop());
        assert!(!machine.complete_level());
        assert!(!machine.return_to_menu());
        assert_eq!(machine.mode(), GameMode::Menu);
    }

    #[test]
    fn pause_toggles_only_from_play() {
        let mut machine = StateMachine::default();
        assert!(machine.begin_level());
        assert!(machine.toggle_pause());
        assert_eq!(machine.mode(), GameMode::Pause);
        assert!(!machine.mode().runs_pipeline());
        assert!(machine.toggle_pause());
        assert_eq!(machine.mode(), GameMode::Playing);
    }

    #[test]
    fn shop_is_reachable_only_from_menu() {
        let mut machine = StateMachine::default();
        assert!(machine.open_shop());
        assert!(machine.can_purchase());
        assert!(!machine.begin_level(), "cannot start from the shop");
        assert!(machine.close_shop());
        assert_eq!(machine.mode(), GameMode::Menu);
    }

    #[test]
    fn cutscene_returns_to_play_after_fixed_duration() {
        let mut machine = StateMachine::default();
        machine.begin_level();
        assert!(machine.enter_cutscene());
        for _ in 0..CUTSCENE_TICKS - 1 {
            assert!(!machine.tick_cutscene());
        }
        assert_eq!(machine.mode(), GameMode::Cutscene);
        assert!(machine.tick_cutscene());
        assert_eq!(machine.mode(), GameMode::Playing);
    }
}
