use engine::{EntityId, Rect, Vec2};
use serde::{Deserialize, Serialize};

use super::adversary::Adversary;
use super::drone::Drone;
use super::quest::QuestId;
use super::river::WaterwaySegment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemMaterial {
    Plastic,
    Paper,
    Bottle,
    Can,
    Glass,
    Metal,
}

impl ItemMaterial {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "plastic" => Some(Self::Plastic),
            "paper" => Some(Self::Paper),
            "bottle" => Some(Self::Bottle),
            "can" => Some(Self::Can),
            "glass" => Some(Self::Glass),
            "metal" => Some(Self::Metal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    #[default]
    Normal,
    Golden,
    Dangerous,
}

impl Rarity {
    /// Roll used for every freshly spawned item: 5% golden, 10% dangerous.
    pub fn from_roll(roll: f32) -> Self {
        if roll < 0.05 {
            Self::Golden
        } else if roll < 0.15 {
            Self::Dangerous
        } else {
            Self::Normal
        }
    }

    pub fn bonus_points(self) -> u32 {
        match self {
            Self::Normal => 10,
            Self::Golden => 30,
            Self::Dangerous => 20,
        }
    }

    pub fn pickup_damage(self) -> u32 {
        match self {
            Self::Dangerous => 5,
            Self::Normal | Self::Golden => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleKind {
    Tree,
    TreeBig,
    TreeSmall,
    Building,
    Toxic,
    Cactus,
}

impl ObstacleKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "tree" => Some(Self::Tree),
            "tree_big" => Some(Self::TreeBig),
            "tree_small" => Some(Self::TreeSmall),
            "building" => Some(Self::Building),
            "toxic" => Some(Self::Toxic),
            "cactus" => Some(Self::Cactus),
            _ => None,
        }
    }

    pub fn size(self) -> (f32, f32) {
        match self {
            Self::Tree => (56.0, 72.0),
            Self::TreeBig => (72.0, 96.0),
            Self::TreeSmall => (40.0, 56.0),
            Self::Building => (80.0, 100.0),
            Self::Toxic => (48.0, 48.0),
            Self::Cactus => (40.0, 64.0),
        }
    }

    pub fn is_toxic(self) -> bool {
        matches!(self, Self::Toxic)
    }

    /// Distance kept from the world edge when placing this kind.
    pub fn spawn_margin(self) -> f32 {
        match self {
            Self::Tree | Self::TreeBig | Self::TreeSmall => 100.0,
            Self::Building | Self::Toxic | Self::Cactus => 200.0,
        }
    }

    pub fn avoids_roads(self) -> bool {
        matches!(self, Self::Building)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Facing {
    pub fn unit(self) -> Vec2 {
        match self {
            Self::Up => Vec2::new(0.0, -1.0),
            Self::Down => Vec2::new(0.0, 1.0),
            Self::Left => Vec2::new(-1.0, 0.0),
            Self::Right => Vec2::new(1.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub velocity: Vec2,
    pub facing: Facing,
    pub carrying: u32,
    pub capacity: u32,
    pub has_tractor: bool,
}

impl PlayerState {
    pub fn is_full(&self) -> bool {
        self.carrying >= self.capacity
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemState {
    pub material: ItemMaterial,
    pub rarity: Rarity,
    pub needs_special_collector: bool,
    pub blocks_waterway: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuestObjectiveState {
    pub quest_id: QuestId,
    pub collected: bool,
}

/// Per-kind data for everything the registry stores. The session matches on
/// this once per phase; there is no other dispatch path.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    Player(PlayerState),
    Item(ItemState),
    Obstacle(ObstacleKind),
    Adversary(Adversary),
    PoisonPlant,
    HealStation,
    RecyclingStation,
    QuestGiver { quest_id: QuestId },
    QuestObjective(QuestObjectiveState),
    Waterway(WaterwaySegment),
    Drone(Drone),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Player,
    Item,
    Obstacle,
    Adversary,
    PoisonPlant,
    HealStation,
    RecyclingStation,
    QuestGiver,
    QuestObjective,
    Waterway,
    Drone,
}

impl EntityKind {
    pub fn category(&self) -> EntityCategory {
        match self {
            Self::Player(_) => EntityCategory::Player,
            Self::Item(_) => EntityCategory::Item,
            Self::Obstacle(_) => EntityCategory::Obstacle,
            Self::Adversary(_) => EntityCategory::Adversary,
            Self::PoisonPlant => EntityCategory::PoisonPlant,
            Self::HealStation => EntityCategory::HealStation,
            Self::RecyclingStation => EntityCategory::RecyclingStation,
            Self::QuestGiver { .. } => EntityCategory::QuestGiver,
            Self::QuestObjective(_) => EntityCategory::QuestObjective,
            Self::Waterway(_) => EntityCategory::Waterway,
            Self::Drone(_) => EntityCategory::Drone,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Player(_) => "player",
            Self::Item(_) => "item",
            Self::Obstacle(kind) => match kind {
                ObstacleKind::Tree => "tree",
                ObstacleKind::TreeBig => "tree_big",
                ObstacleKind::TreeSmall => "tree_small",
                ObstacleKind::Building => "building",
                ObstacleKind::Toxic => "toxic",
                ObstacleKind::Cactus => "cactus",
            },
            Self::Adversary(_) => "litterer",
            Self::PoisonPlant => "poison_plant",
            Self::HealStation => "heal_station",
            Self::RecyclingStation => "recycling_station",
            Self::QuestGiver { .. } => "quest_giver",
            Self::QuestObjective(_) => "quest_objective",
            Self::Waterway(_) => "waterway",
            Self::Drone(drone) => drone.label(),
        }
    }

    pub fn as_item(&self) -> Option<&ItemState> {
        match self {
            Self::Item(item) => Some(item),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub bounds: Rect,
    pub kind: EntityKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeId {
    Bag,
    Tractor,
    AdvancedDrone,
}

impl UpgradeId {
    pub const ALL: [UpgradeId; 3] = [UpgradeId::Bag, UpgradeId::Tractor, UpgradeId::AdvancedDrone];

    pub fn price(self) -> u32 {
        match self {
            Self::Bag => 100,
            Self::Tractor => 250,
            Self::AdvancedDrone => 200,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bag => "bag",
            Self::Tractor => "tractor",
            Self::AdvancedDrone => "advanced_drone",
        }
    }
}

/// Discrete commands a frontend issues between ticks. Held movement keys
/// travel separately as [`engine::InputAction`]s.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameCommand {
    NewGame,
    TogglePause,
    OpenShop,
    CloseShop,
    Purchase { upgrade: UpgradeId },
    AdvanceLevel,
    Quit,
    Interact,
    Strike,
    Dash,
    ToggleDrone,
    SetDroneTarget { x: f32, y: f32 },
    AcceptQuest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    TimeUp,
    Health,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameplayEvent {
    Pickup {
        count: u32,
        points: u32,
    },
    Dump {
        delivered: u32,
        points: u32,
    },
    Dash,
    Poison,
    Heal,
    Button,
    PlayerDamaged {
        amount: u32,
    },
    LitterDropped {
        adversary_id: EntityId,
        item_id: EntityId,
    },
    AdversaryStunned {
        adversary_id: EntityId,
    },
    DroneCollected {
        item_id: EntityId,
        points: u32,
    },
    QuestAccepted {
        quest_id: QuestId,
    },
    QuestCompleted {
        quest_id: QuestId,
        reward: u32,
    },
    WaterwayUnblocked,
    LevelCompleted {
        level: u32,
        stars: u8,
    },
    GameOver {
        reason: GameOverReason,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameplayEventKind {
    Pickup,
    Dump,
    Dash,
    Poison,
    Heal,
    Button,
    PlayerDamaged,
    LitterDropped,
    AdversaryStunned,
    DroneCollected,
    QuestAccepted,
    QuestCompleted,
    WaterwayUnblocked,
    LevelCompleted,
    GameOver,
}

impl GameplayEvent {
    pub fn kind(self) -> GameplayEventKind {
        match self {
            Self::Pickup { .. } => GameplayEventKind::Pickup,
            Self::Dump { .. } => GameplayEventKind::Dump,
            Self::Dash => GameplayEventKind::Dash,
            Self::Poison => GameplayEventKind::Poison,
            Self::Heal => GameplayEventKind::Heal,
            Self::Button => GameplayEventKind::Button,
            Self::PlayerDamaged { .. } => GameplayEventKind::PlayerDamaged,
            Self::LitterDropped { .. } => GameplayEventKind::LitterDropped,
            Self::AdversaryStunned { .. } => GameplayEventKind::AdversaryStunned,
            Self::DroneCollected { .. } => GameplayEventKind::DroneCollected,
            Self::QuestAccepted { .. } => GameplayEventKind::QuestAccepted,
            Self::QuestCompleted { .. } => GameplayEventKind::QuestCompleted,
            Self::WaterwayUnblocked => GameplayEventKind::WaterwayUnblocked,
            Self::LevelCompleted { .. } => GameplayEventKind::LevelCompleted,
            Self::GameOver { .. } => GameplayEventKind::GameOver,
        }
    }
}

/// Events emitted during the current tick; they become visible to readers
/// only after [`GameplayEventBus::finish_tick_rollover`].
#[derive(Debug, Default)]
pub struct GameplayEventBus {
    current_tick_events: Vec<GameplayEvent>,
    last_tick_events: Vec<GameplayEvent>,
}

impl GameplayEventBus {
    pub fn emit(&mut self, event: GameplayEvent) {
        self.current_tick_events.push(event);
    }

    pub fn iter_emitted_so_far(&self) -> impl Iterator<Item = &GameplayEvent> {
        self.current_tick_events.iter()
    }

    pub fn finish_tick_rollover(&mut self) {
        self.last_tick_events = std::mem::take(&mut self.current_tick_events);
    }

    pub fn last_tick_events(&self) -> &[GameplayEvent] {
        &self.last_tick_events
    }

    pub fn last_tick_count(&self, kind: GameplayEventKind) -> usize {
        self.last_tick_events
            .iter()
            .filter(|event| event.kind() == kind)
            .count()
    }
}

/// Gameplay commands accepted during `Commands` and consumed by the phase
/// that owns them later in the same tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameplayIntent {
    Interact,
    AcceptQuest,
    Strike,
    Dash,
    ToggleDrone,
    SetDroneTarget { target: Vec2 },
}

#[derive(Debug, Default)]
pub struct GameplayIntentQueue {
    intents: Vec<GameplayIntent>,
}

impl GameplayIntentQueue {
    pub fn enqueue(&mut self, intent: GameplayIntent) {
        self.intents.push(intent);
    }

    /// Removes and returns the queued intents `select` accepts, keeping the
    /// rest in issue order.
    pub fn drain_matching(
        &mut self,
        mut select: impl FnMut(&GameplayIntent) -> bool,
    ) -> Vec<GameplayIntent> {
        let mut taken = Vec::new();
        self.intents.retain(|intent| {
            if select(intent) {
                taken.push(*intent);
                false
            } else {
                true
            }
        });
        taken
    }

    pub fn clear(&mut self) {
        self.intents.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }
}
