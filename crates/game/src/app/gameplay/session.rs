use engine::{EntityId, InputSnapshot, LevelDatabase, Rect, Vec2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use super::collision::{self, move_player, push_player, resolve_obstacles};
use super::combo::ScoreBoard;
use super::dash::DashAbility;
use super::drone::{update_drones, Drone};
use super::level_gen::{generate_level, LevelTuning, LevelTuningError};
use super::progress::{stars_for_elapsed, LevelClock, PlayerProgress, PurchaseOutcome};
use super::quest::QuestTracker;
use super::registry::EntityRegistry;
use super::river::{RiverController, BLOCKED_WATER_SPEED_FACTOR};
use super::state_machine::{GameMode, StateMachine};
use super::status::{PoisonStatus, ScreenEffects};
use super::types::{
    Entity, EntityCategory, EntityKind, Facing, GameCommand, GameOverReason, GameplayEvent,
    GameplayEventBus, GameplayIntent, GameplayIntentQueue, ItemState, Rarity, UpgradeId,
};
use super::{world_bounds, ITEM_SIZE, MAX_HEALTH};

pub const PLAYER_SPEED: f32 = 4.0;
pub const TRACTOR_SPEED_FACTOR: f32 = 2.0;
pub const POISON_SPEED_FACTOR: f32 = 0.5;
pub const DELIVERY_POINTS_PER_ITEM: u32 = 10;
pub const HEAL_STATION_SIZE: f32 = 40.0;
const HEAL_OFFSET_X: (i32, i32) = (80, 150);
const HEAL_OFFSET_Y: (i32, i32) = (-50, 50);

pub const GAMEPLAY_SYSTEM_ORDER_TEXT: &str =
    "Commands>Environment>PlayerMovement>Adversaries>Drones>CurrentPush>Collision>Interaction>Progression>Decay";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameplaySystemId {
    Commands,
    Environment,
    PlayerMovement,
    Adversaries,
    Drones,
    CurrentPush,
    Collision,
    Interaction,
    Progression,
    Decay,
}

impl GameplaySystemId {
    pub fn name(self) -> &'static str {
        match self {
            Self::Commands => "Commands",
            Self::Environment => "Environment",
            Self::PlayerMovement => "PlayerMovement",
            Self::Adversaries => "Adversaries",
            Self::Drones => "Drones",
            Self::CurrentPush => "CurrentPush",
            Self::Collision => "Collision",
            Self::Interaction => "Interaction",
            Self::Progression => "Progression",
            Self::Decay => "Decay",
        }
    }
}

pub const GAMEPLAY_SYSTEM_ORDER: [GameplaySystemId; 10] = [
    GameplaySystemId::Commands,
    GameplaySystemId::Environment,
    GameplaySystemId::PlayerMovement,
    GameplaySystemId::Adversaries,
    GameplaySystemId::Drones,
    GameplaySystemId::CurrentPush,
    GameplaySystemId::Collision,
    GameplaySystemId::Interaction,
    GameplaySystemId::Progression,
    GameplaySystemId::Decay,
];

/// One play session: mode, the running level, and the process-lifetime
/// progress. Advances only through [`GameSession::tick`].
#[derive(Debug)]
pub struct GameSession {
    levels: Vec<LevelTuning>,
    seed: u64,
    rng: ChaCha8Rng,
    tick: u64,
    state: StateMachine,
    registry: EntityRegistry,
    board: ScoreBoard,
    health: u32,
    level_index: Option<usize>,
    level_start_score: u32,
    stars: u8,
    clock: LevelClock,
    river: RiverController,
    quests: QuestTracker,
    poison: PoisonStatus,
    dash: DashAbility,
    effects: ScreenEffects,
    in_blocked_water: bool,
    game_over_reason: Option<GameOverReason>,
    progress: PlayerProgress,
    events: GameplayEventBus,
    intents: GameplayIntentQueue,
    last_tick_order: Vec<GameplaySystemId>,
}

impl GameSession {
    pub fn new(database: &LevelDatabase, seed: u64) -> Result<Self, LevelTuningError> {
        let levels = database
            .levels()
            .iter()
            .map(LevelTuning::from_def)
            .collect::<Result<Vec<_>, _>>()?;
        if levels.is_empty() {
            return Err(LevelTuningError::NoLevels);
        }
        Ok(Self {
            levels,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            tick: 0,
            state: StateMachine::default(),
            registry: EntityRegistry::default(),
            board: ScoreBoard::default(),
            health: MAX_HEALTH,
            level_index: None,
            level_start_score: 0,
            stars: 0,
            clock: LevelClock::default(),
            river: RiverController::default(),
            quests: QuestTracker::default(),
            poison: PoisonStatus::default(),
            dash: DashAbility::default(),
            effects: ScreenEffects::default(),
            in_blocked_water: false,
            game_over_reason: None,
            progress: PlayerProgress::default(),
            events: GameplayEventBus::default(),
            intents: GameplayIntentQueue::default(),
            last_tick_order: Vec::with_capacity(GAMEPLAY_SYSTEM_ORDER.len()),
        })
    }

    pub fn tick(&mut self, input: &InputSnapshot<GameCommand>) {
        self.tick = self.tick.saturating_add(1);
        self.last_tick_order.clear();
        let mut pipeline_active = false;
        for system_id in GAMEPLAY_SYSTEM_ORDER {
            if system_id != GameplaySystemId::Commands && !pipeline_active {
                break;
            }
            self.last_tick_order.push(system_id);
            self.run_system(system_id, input);
            if system_id == GameplaySystemId::Commands {
                pipeline_active = self.state.mode().runs_pipeline();
            }
        }
        self.intents.clear();
        self.events.finish_tick_rollover();
    }

    fn run_system(&mut self, system_id: GameplaySystemId, input: &InputSnapshot<GameCommand>) {
        match system_id {
            GameplaySystemId::Commands => {
                for command in input.commands() {
                    self.apply_command(*command);
                }
            }
            GameplaySystemId::Environment => self.run_environment(),
            GameplaySystemId::PlayerMovement => self.run_player_movement(input),
            GameplaySystemId::Adversaries => self.run_adversaries(),
            GameplaySystemId::Drones => self.run_drones(),
            GameplaySystemId::CurrentPush => {
                if let Some(player) = self.registry.player_bounds() {
                    let push = self.river.current_push(&self.registry, &player);
                    push_player(&mut self.registry, push, &world_bounds());
                }
            }
            GameplaySystemId::Collision => {
                let damage = resolve_obstacles(&mut self.registry, &mut self.rng);
                self.damage_player(damage);
            }
            GameplaySystemId::Interaction => self.run_interaction(),
            GameplaySystemId::Progression => self.run_progression(),
            GameplaySystemId::Decay => {
                self.board.decay();
                self.effects.decay();
                self.poison.tick();
                self.dash.tick();
            }
        }
    }

    /// Applies a discrete command. Mode commands take effect immediately;
    /// gameplay commands are queued for the phase that owns them. Returns
    /// false when the command is not valid in the current mode.
    pub fn apply_command(&mut self, command: GameCommand) -> bool {
        let intent = match command {
            GameCommand::NewGame => return self.start_new_game(),
            GameCommand::TogglePause => return self.button(|state| state.toggle_pause()),
            GameCommand::OpenShop => return self.button(|state| state.open_shop()),
            GameCommand::CloseShop => return self.button(|state| state.close_shop()),
            GameCommand::Purchase { upgrade } => {
                return self.purchase(upgrade) == PurchaseOutcome::Purchased
            }
            GameCommand::AdvanceLevel => return self.advance_level(),
            // Quitting is the frontend's business.
            GameCommand::Quit => return false,
            GameCommand::Interact => GameplayIntent::Interact,
            GameCommand::AcceptQuest => GameplayIntent::AcceptQuest,
            GameCommand::Strike => GameplayIntent::Strike,
            GameCommand::Dash => GameplayIntent::Dash,
            GameCommand::ToggleDrone => GameplayIntent::ToggleDrone,
            GameCommand::SetDroneTarget { x, y } => GameplayIntent::SetDroneTarget {
                target: Vec2::new(x, y),
            },
        };
        if self.state.mode() != GameMode::Playing {
            debug!(?command, mode = self.state.mode().as_str(), "command_ignored");
            return false;
        }
        self.intents.enqueue(intent);
        true
    }

    fn button(&mut self, transition: impl FnOnce(&mut StateMachine) -> bool) -> bool {
        let changed = transition(&mut self.state);
        if changed {
            self.events.emit(GameplayEvent::Button);
        }
        changed
    }

    fn start_new_game(&mut self) -> bool {
        if !self.state.can_start_game() {
            return false;
        }
        self.board.reset();
        self.health = MAX_HEALTH;
        self.load_level(0);
        info!(seed = self.seed, "new_game");
        self.button(|state| state.begin_level())
    }

    fn advance_level(&mut self) -> bool {
        if !self.state.can_advance() {
            return false;
        }
        match self.state.mode() {
            GameMode::LevelComplete => {
                let earned = self.board.score().saturating_sub(self.level_start_score);
                self.progress.add_coins(earned);
                let next = self.level_index.map_or(0, |index| index + 1);
                if next < self.levels.len() {
                    self.load_level(next);
                    self.button(|state| state.begin_level())
                } else {
                    self.unload_level();
                    self.button(|state| state.return_to_menu())
                }
            }
            GameMode::GameOver => {
                self.unload_level();
                self.button(|state| state.return_to_menu())
            }
            _ => false,
        }
    }

    /// Buys `upgrade` when the shop or pause menu is open. Capacity upgrades
    /// apply to a loaded player at once; the advanced drone replaces a loaded
    /// drone.
    pub fn purchase(&mut self, upgrade: UpgradeId) -> PurchaseOutcome {
        if !self.state.can_purchase() {
            return PurchaseOutcome::Unavailable;
        }
        let outcome = self.progress.purchase(upgrade);
        if outcome != PurchaseOutcome::Purchased {
            return outcome;
        }
        self.events.emit(GameplayEvent::Button);
        match upgrade {
            UpgradeId::Bag | UpgradeId::Tractor => {
                let capacity = self.progress.carry_capacity();
                let has_tractor = self.progress.owns(UpgradeId::Tractor);
                if let Some((_, player)) = self.registry.player_mut() {
                    player.capacity = capacity;
                    player.has_tractor = has_tractor;
                }
            }
            UpgradeId::AdvancedDrone => self.replace_drone(),
        }
        outcome
    }

    fn replace_drone(&mut self) {
        let existing = self.registry.ids_in(EntityCategory::Drone);
        if existing.is_empty() {
            return;
        }
        for id in existing {
            self.registry.despawn(id);
        }
        if let Some(player) = self.registry.player_bounds() {
            let drone = Drone::advanced();
            self.registry
                .spawn(drone.spawn_bounds(&player), EntityKind::Drone(drone));
        }
    }

    fn load_level(&mut self, index: usize) {
        let tuning = &self.levels[index];
        let layout = generate_level(tuning, &self.progress, &mut self.registry, &mut self.rng);
        info!(level = tuning.number, label = %tuning.label, "level_loaded");
        self.river = layout.river;
        self.quests = layout.quests;
        self.level_index = Some(index);
        self.level_start_score = self.board.score();
        self.stars = 0;
        self.clock = LevelClock::default();
        self.poison = PoisonStatus::default();
        self.dash = DashAbility::default();
        self.effects = ScreenEffects::default();
        self.in_blocked_water = false;
        self.game_over_reason = None;
    }

    fn unload_level(&mut self) {
        self.registry.clear();
        self.river = RiverController::default();
        self.quests = QuestTracker::default();
        self.level_index = None;
    }

    fn run_environment(&mut self) {
        self.in_blocked_water = self
            .registry
            .player_bounds()
            .is_some_and(|player| self.river.player_in_blocked_water(&self.registry, &player));
    }

    fn run_player_movement(&mut self, input: &InputSnapshot<GameCommand>) {
        let Some((_, player)) = self.registry.player() else {
            return;
        };
        let mut facing = player.facing;
        let has_tractor = player.has_tractor;

        for _ in self
            .intents
            .drain_matching(|intent| matches!(intent, GameplayIntent::Dash))
        {
            if self.dash.trigger(input.movement_axis(), facing) {
                self.effects.on_dash();
                self.events.emit(GameplayEvent::Dash);
            } else {
                debug!(state = ?self.dash.state(), "dash_rejected");
            }
        }

        let velocity = match self.dash.velocity() {
            Some(velocity) => velocity,
            None => {
                let mut speed = PLAYER_SPEED;
                if has_tractor {
                    speed *= TRACTOR_SPEED_FACTOR;
                }
                if self.poison.is_active() {
                    speed *= POISON_SPEED_FACTOR;
                }
                if self.in_blocked_water {
                    speed *= BLOCKED_WATER_SPEED_FACTOR;
                }
                walking_velocity(input, speed, &mut facing)
            }
        };

        if let Some((_, player)) = self.registry.player_mut() {
            player.facing = facing;
        }
        move_player(&mut self.registry, velocity, &world_bounds());
    }

    fn run_adversaries(&mut self) {
        let Some(index) = self.level_index else {
            return;
        };
        let world = world_bounds();
        for adversary_id in self.registry.ids_in(EntityCategory::Adversary) {
            let drop_at = {
                let Some(Entity {
                    bounds,
                    kind: EntityKind::Adversary(adversary),
                    ..
                }) = self.registry.get_mut(adversary_id)
                else {
                    continue;
                };
                adversary
                    .update(bounds, &world, &mut self.rng)
                    .then(|| bounds.center())
            };
            let Some(center) = drop_at else {
                continue;
            };

            let rarity = Rarity::from_roll(self.rng.random::<f32>());
            let material = self.levels[index].random_material(&mut self.rng);
            let mut bounds = Rect::new(center.x, center.y, ITEM_SIZE, ITEM_SIZE);
            bounds.clamp_inside(&world);
            let item_id = self.registry.spawn(
                bounds,
                EntityKind::Item(ItemState {
                    material,
                    rarity,
                    needs_special_collector: false,
                    blocks_waterway: false,
                }),
            );
            self.events.emit(GameplayEvent::LitterDropped {
                adversary_id,
                item_id,
            });
        }
    }

    fn run_drones(&mut self) {
        let drone_ids = self.registry.ids_in(EntityCategory::Drone);
        for intent in self.intents.drain_matching(|intent| {
            matches!(
                intent,
                GameplayIntent::ToggleDrone | GameplayIntent::SetDroneTarget { .. }
            )
        }) {
            for id in &drone_ids {
                let Some(Entity {
                    kind: EntityKind::Drone(drone),
                    ..
                }) = self.registry.get_mut(*id)
                else {
                    continue;
                };
                match intent {
                    GameplayIntent::ToggleDrone => drone.toggle(),
                    GameplayIntent::SetDroneTarget { target } => {
                        if !drone.set_target(target) {
                            debug!("drone_target_rejected");
                        }
                    }
                    _ => {}
                }
            }
        }
        update_drones(&mut self.registry, &mut self.board, &mut self.events);
    }

    fn run_interaction(&mut self) {
        let intents = self.intents.drain_matching(|intent| {
            matches!(
                intent,
                GameplayIntent::Interact | GameplayIntent::AcceptQuest | GameplayIntent::Strike
            )
        });
        for intent in intents {
            match intent {
                GameplayIntent::Strike => {
                    for adversary_id in collision::strike(&mut self.registry) {
                        self.events
                            .emit(GameplayEvent::AdversaryStunned { adversary_id });
                    }
                }
                GameplayIntent::Interact => {
                    self.player_pickup();
                    self.accept_quest();
                }
                GameplayIntent::AcceptQuest => self.accept_quest(),
                _ => {}
            }
        }

        self.resolve_hazards();
        self.resolve_delivery();

        if self.river.check_unblock(&mut self.registry) {
            info!(tick = self.tick, "waterway_unblocked");
            self.events.emit(GameplayEvent::WaterwayUnblocked);
            self.state.enter_cutscene();
        }

        if let Some(player) = self.registry.player_bounds() {
            for completion in self.quests.collect_objectives(&mut self.registry, &player) {
                self.progress.add_coins(completion.reward);
                self.board.add_flat(completion.reward);
                info!(
                    quest = completion.quest_id.0,
                    reward = completion.reward,
                    "quest_completed"
                );
                self.events.emit(GameplayEvent::QuestCompleted {
                    quest_id: completion.quest_id,
                    reward: completion.reward,
                });
            }
        }
    }

    fn player_pickup(&mut self) {
        let outcome = collision::pickup(&mut self.registry);
        let count = outcome.count();
        if count == 0 {
            return;
        }
        self.damage_player(outcome.damage);
        let points = self.board.award(outcome.bonus_points);
        self.board.register(count);
        self.effects.on_pickup(self.board.multiplier());
        self.events.emit(GameplayEvent::Pickup { count, points });
    }

    fn accept_quest(&mut self) {
        let Some(player) = self.registry.player_bounds() else {
            return;
        };
        if let Some(quest_id) = self.quests.try_accept(&self.registry, player.center()) {
            info!(quest = quest_id.0, "quest_accepted");
            self.events.emit(GameplayEvent::QuestAccepted { quest_id });
        }
    }

    fn resolve_hazards(&mut self) {
        let Some(player) = self.registry.player_bounds() else {
            return;
        };
        if !self.poison.is_active() {
            let plant = self
                .registry
                .iter_category(EntityCategory::PoisonPlant)
                .find(|plant| plant.bounds.intersects(&player))
                .map(|plant| plant.bounds);
            if let Some(plant) = plant {
                self.poison.apply();
                self.events.emit(GameplayEvent::Poison);
                let dx = self.rng.random_range(HEAL_OFFSET_X.0..=HEAL_OFFSET_X.1) as f32;
                let dy = self.rng.random_range(HEAL_OFFSET_Y.0..=HEAL_OFFSET_Y.1) as f32;
                let mut station =
                    Rect::new(plant.x + dx, plant.y + dy, HEAL_STATION_SIZE, HEAL_STATION_SIZE);
                station.clamp_inside(&world_bounds());
                self.registry.spawn(station, EntityKind::HealStation);
            }
        }

        if self.poison.is_active() {
            let station: Option<EntityId> = self
                .registry
                .iter_category(EntityCategory::HealStation)
                .find(|station| station.bounds.intersects(&player))
                .map(|station| station.id);
            if let Some(station) = station {
                self.poison.cure();
                self.registry.despawn(station);
                self.events.emit(GameplayEvent::Heal);
            }
        }
    }

    fn resolve_delivery(&mut self) {
        let Some((bounds, player)) = self.registry.player() else {
            return;
        };
        let delivered = player.carrying;
        if delivered == 0 {
            return;
        }
        let at_station = self
            .registry
            .iter_category(EntityCategory::RecyclingStation)
            .any(|station| station.bounds.intersects(bounds));
        if !at_station {
            return;
        }
        let points = self.board.award(delivered * DELIVERY_POINTS_PER_ITEM);
        self.board.register(1);
        if let Some((_, player)) = self.registry.player_mut() {
            player.carrying = 0;
        }
        self.events.emit(GameplayEvent::Dump { delivered, points });
    }

    fn run_progression(&mut self) {
        match self.state.mode() {
            GameMode::Cutscene => {
                self.state.tick_cutscene();
            }
            GameMode::Playing => {
                self.clock.tick();
                if self.clock.expired() {
                    self.end_game(GameOverReason::TimeUp);
                } else if self.health == 0 {
                    self.end_game(GameOverReason::Health);
                } else if self.level_cleared() {
                    self.complete_level();
                }
            }
            _ => {}
        }
    }

    fn level_cleared(&self) -> bool {
        self.registry.count_in(EntityCategory::Item) == 0
            && self
                .registry
                .player()
                .is_some_and(|(_, player)| player.carrying == 0)
    }

    fn complete_level(&mut self) {
        let Some(tuning) = self.current_level() else {
            return;
        };
        let level = tuning.number;
        let elapsed = self.clock.elapsed_seconds();
        let stars = stars_for_elapsed(elapsed);
        self.stars = stars;
        self.progress.record_level(level, elapsed, stars);
        self.state.complete_level();
        info!(level, stars, elapsed_seconds = elapsed, "level_complete");
        self.events.emit(GameplayEvent::LevelCompleted { level, stars });
    }

    fn end_game(&mut self, reason: GameOverReason) {
        self.game_over_reason = Some(reason);
        self.state.game_over();
        info!(?reason, score = self.board.score(), "game_over");
        self.events.emit(GameplayEvent::GameOver { reason });
    }

    fn damage_player(&mut self, amount: u32) {
        if amount == 0 {
            return;
        }
        self.health = self.health.saturating_sub(amount);
        self.events.emit(GameplayEvent::PlayerDamaged { amount });
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn mode(&self) -> GameMode {
        self.state.mode()
    }

    pub fn state(&self) -> &StateMachine {
        &self.state
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    #[cfg(test)]
    pub(crate) fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.registry
    }

    pub fn board(&self) -> &ScoreBoard {
        &self.board
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    #[cfg(test)]
    pub(crate) fn set_health(&mut self, health: u32) {
        self.health = health.min(MAX_HEALTH);
    }

    pub fn current_level(&self) -> Option<&LevelTuning> {
        self.level_index.and_then(|index| self.levels.get(index))
    }

    pub fn levels(&self) -> &[LevelTuning] {
        &self.levels
    }

    pub fn stars(&self) -> u8 {
        self.stars
    }

    pub fn clock(&self) -> &LevelClock {
        &self.clock
    }

    pub fn river(&self) -> &RiverController {
        &self.river
    }

    pub fn quests(&self) -> &QuestTracker {
        &self.quests
    }

    pub fn poison(&self) -> &PoisonStatus {
        &self.poison
    }

    pub fn dash(&self) -> &DashAbility {
        &self.dash
    }

    pub fn effects(&self) -> &ScreenEffects {
        &self.effects
    }

    pub fn in_blocked_water(&self) -> bool {
        self.in_blocked_water
    }

    pub fn game_over_reason(&self) -> Option<GameOverReason> {
        self.game_over_reason
    }

    pub fn progress(&self) -> &PlayerProgress {
        &self.progress
    }

    #[cfg(test)]
    pub(crate) fn progress_mut(&mut self) -> &mut PlayerProgress {
        &mut self.progress
    }

    pub fn events(&self) -> &GameplayEventBus {
        &self.events
    }

    pub fn last_tick_order(&self) -> &[GameplaySystemId] {
        &self.last_tick_order
    }
}

/// Axis-independent walking velocity from [`InputSnapshot::movement_axis`].
/// A vertical key sets facing over a horizontal one.
fn walking_velocity(input: &InputSnapshot<GameCommand>, speed: f32, facing: &mut Facing) -> Vec2 {
    let axis = input.movement_axis();
    if axis.y < 0.0 {
        *facing = Facing::Up;
    } else if axis.y > 0.0 {
        *facing = Facing::Down;
    } else if axis.x < 0.0 {
        *facing = Facing::Left;
    } else if axis.x > 0.0 {
        *facing = Facing::Right;
    }
    axis * speed
}
