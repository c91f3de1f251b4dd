use engine::{InputSnapshot, Rect, Scene, SceneCommand};
use tracing::info;

mod adversary;
mod collision;
mod combo;
mod dash;
mod drone;
mod level_gen;
mod progress;
mod quest;
mod registry;
mod river;
mod script;
mod session;
mod snapshot;
mod state_machine;
mod status;
mod types;

pub use adversary::{AdversaryMode, Cardinal};
pub use combo::{ScoreBoard, COMBO_DECAY_TICKS};
pub use dash::{DashAbility, DashState};
pub use drone::DroneModel;
pub use level_gen::{LevelTuning, LevelTuningError};
pub use progress::{LevelRecord, PlayerProgress, PurchaseOutcome, LEVEL_TIME_LIMIT_TICKS};
pub use quest::{QuestId, QuestStatus};
pub use registry::EntityRegistry;
pub use river::WaterwayState;
pub use script::{ReplayInput, ReplayScript, ScriptError, ScriptFrame, DEMO_SCRIPT_LABEL};
pub use session::{
    GameSession, GameplaySystemId, GAMEPLAY_SYSTEM_ORDER, GAMEPLAY_SYSTEM_ORDER_TEXT,
};
pub use snapshot::{EntityDetail, EntitySnapshot, GameSnapshot};
pub use state_machine::GameMode;
pub use status::{FlashTier, ScreenEffects};
pub use types::{
    Entity, EntityCategory, EntityKind, GameCommand, GameOverReason, GameplayEvent,
    GameplayEventKind, ItemMaterial, ObstacleKind, Rarity, UpgradeId,
};

pub const WORLD_WIDTH: f32 = 2400.0;
pub const WORLD_HEIGHT: f32 = 1400.0;
pub const TICKS_PER_SECOND: u32 = 60;
pub const PLAYER_SIZE: f32 = 40.0;
pub const ITEM_SIZE: f32 = 28.0;
pub const MAX_HEALTH: u32 = 100;

pub fn world_bounds() -> Rect {
    Rect::new(0.0, 0.0, WORLD_WIDTH, WORLD_HEIGHT)
}

/// Adapts a [`GameSession`] to the engine's fixed-tick driver.
pub struct GameplayScene {
    session: GameSession,
}

impl GameplayScene {
    pub fn new(session: GameSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot::capture(&self.session)
    }
}

impl Scene for GameplayScene {
    type Command = GameCommand;

    fn load(&mut self) {
        info!(
            seed = self.session.seed(),
            level_count = self.session.levels().len(),
            system_order = GAMEPLAY_SYSTEM_ORDER_TEXT,
            "gameplay_scene_loaded"
        );
    }

    fn update(
        &mut self,
        _fixed_dt_seconds: f32,
        input: &InputSnapshot<Self::Command>,
    ) -> SceneCommand {
        self.session.tick(input);
        if input.commands().contains(&GameCommand::Quit) {
            return SceneCommand::Quit;
        }
        SceneCommand::None
    }

    fn unload(&mut self) {
        let snapshot = self.snapshot();
        info!(
            tick = snapshot.tick,
            mode = snapshot.mode.as_str(),
            score = snapshot.score,
            digest = %snapshot.digest_hex(),
            "gameplay_scene_unloaded"
        );
    }

    fn debug_title(&self) -> Option<String> {
        let level = self
            .session
            .current_level()
            .map_or("-", |tuning| tuning.label.as_str());
        Some(format!(
            "Eco Ranger | {} | {} | score {}",
            self.session.mode().as_str(),
            level,
            self.session.board().score()
        ))
    }
}
