use engine::{sha256_hex, EntityId, Rect};
use serde::Serialize;

use super::adversary::AdversaryMode;
use super::dash::DashState;
use super::drone::DroneModel;
use super::progress::LevelRecord;
use super::quest::{QuestId, QuestStatus};
use super::river::WaterwayState;
use super::session::GameSession;
use super::state_machine::GameMode;
use super::status::ScreenEffects;
use super::types::{
    Entity, EntityCategory, EntityKind, Facing, GameOverReason, GameplayEvent, ItemMaterial,
    ObstacleKind, Rarity, UpgradeId,
};

/// Read-only view of everything a renderer or a replay check needs after a
/// tick. Serializes to stable JSON; entities are in id order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameSnapshot {
    pub tick: u64,
    pub seed: u64,
    pub mode: GameMode,
    pub level: Option<LevelSnapshot>,
    pub score: u32,
    pub combo_streak: u32,
    pub max_streak: u32,
    pub combo_multiplier: f32,
    pub health: u32,
    pub poison_ticks: u32,
    pub dash: DashState,
    pub effects: ScreenEffects,
    pub waterway: WaterwayState,
    pub in_blocked_water: bool,
    pub cutscene_elapsed: u32,
    pub game_over_reason: Option<GameOverReason>,
    pub quests: Vec<QuestSnapshot>,
    pub progress: ProgressSnapshot,
    pub entities: Vec<EntitySnapshot>,
    pub events: Vec<GameplayEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelSnapshot {
    pub number: u32,
    pub label: String,
    pub remaining_seconds: f32,
    pub stars: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestSnapshot {
    pub id: QuestId,
    pub description: &'static str,
    pub status: QuestStatus,
    pub current_count: u32,
    pub required: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub total_coins: u32,
    pub owned_upgrades: Vec<UpgradeId>,
    pub records: Vec<(u32, LevelRecord)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub category: EntityCategory,
    pub label: &'static str,
    pub bounds: Rect,
    pub detail: EntityDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityDetail {
    Player {
        facing: Facing,
        carrying: u32,
        capacity: u32,
        has_tractor: bool,
    },
    Item {
        material: ItemMaterial,
        rarity: Rarity,
        needs_special_collector: bool,
        blocks_waterway: bool,
    },
    Obstacle {
        obstacle: ObstacleKind,
    },
    Adversary {
        mode: AdversaryMode,
        spawned: u32,
        spawn_cap: u32,
    },
    Waterway {
        angle: f32,
        obstruction_point: bool,
        flowing: bool,
    },
    Quest {
        quest_id: QuestId,
        collected: bool,
    },
    Drone {
        active: bool,
        model: DroneModel,
    },
    Marker,
}

impl GameSnapshot {
    pub fn capture(session: &GameSession) -> Self {
        let board = session.board();
        let progress = session.progress();
        let level = session.current_level().map(|tuning| LevelSnapshot {
            number: tuning.number,
            label: tuning.label.clone(),
            remaining_seconds: session.clock().remaining_seconds(),
            stars: session.stars(),
        });
        let records = session
            .levels()
            .iter()
            .filter_map(|tuning| {
                progress
                    .record(tuning.number)
                    .map(|record| (tuning.number, record))
            })
            .collect();

        Self {
            tick: session.tick_count(),
            seed: session.seed(),
            mode: session.mode(),
            level,
            score: board.score(),
            combo_streak: board.streak(),
            max_streak: board.max_streak(),
            combo_multiplier: board.multiplier(),
            health: session.health(),
            poison_ticks: session.poison().remaining_ticks(),
            dash: session.dash().state(),
            effects: *session.effects(),
            waterway: session.river().state(),
            in_blocked_water: session.in_blocked_water(),
            cutscene_elapsed: session.state().cutscene_elapsed(),
            game_over_reason: session.game_over_reason(),
            quests: session
                .quests()
                .quests()
                .iter()
                .map(|quest| QuestSnapshot {
                    id: quest.id,
                    description: quest.description,
                    status: quest.status,
                    current_count: quest.current_count,
                    required: quest.required,
                })
                .collect(),
            progress: ProgressSnapshot {
                total_coins: progress.total_coins(),
                owned_upgrades: progress.owned_upgrades(),
                records,
            },
            entities: session.registry().iter().map(EntitySnapshot::from).collect(),
            events: session.events().last_tick_events().to_vec(),
        }
    }

    pub fn to_json(&self) -> String {
        // Every field is a plain value type; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// SHA-256 over the JSON form. Two runs with the same seed and script
    /// produce the same digest.
    pub fn digest_hex(&self) -> String {
        sha256_hex(self.to_json().as_bytes())
    }

    pub fn summary_line(&self) -> String {
        let level = self
            .level
            .as_ref()
            .map_or_else(|| "-".to_string(), |level| level.label.clone());
        format!(
            "tick={} mode={} level={} score={} health={} coins={} entities={}",
            self.tick,
            self.mode.as_str(),
            level,
            self.score,
            self.health,
            self.progress.total_coins,
            self.entities.len()
        )
    }
}

impl From<&Entity> for EntitySnapshot {
    fn from(entity: &Entity) -> Self {
        let detail = match &entity.kind {
            EntityKind::Player(player) => EntityDetail::Player {
                facing: player.facing,
                carrying: player.carrying,
                capacity: player.capacity,
                has_tractor: player.has_tractor,
            },
            EntityKind::Item(item) => EntityDetail::Item {
                material: item.material,
                rarity: item.rarity,
                needs_special_collector: item.needs_special_collector,
                blocks_waterway: item.blocks_waterway,
            },
            EntityKind::Obstacle(obstacle) => EntityDetail::Obstacle {
                obstacle: *obstacle,
            },
            EntityKind::Adversary(adversary) => EntityDetail::Adversary {
                mode: adversary.mode(),
                spawned: adversary.spawned(),
                spawn_cap: adversary.spawn_cap(),
            },
            EntityKind::Waterway(segment) => EntityDetail::Waterway {
                angle: segment.angle,
                obstruction_point: segment.is_obstruction_point,
                flowing: segment.flowing,
            },
            EntityKind::QuestGiver { quest_id } => EntityDetail::Quest {
                quest_id: *quest_id,
                collected: false,
            },
            EntityKind::QuestObjective(objective) => EntityDetail::Quest {
                quest_id: objective.quest_id,
                collected: objective.collected,
            },
            EntityKind::Drone(drone) => EntityDetail::Drone {
                active: drone.is_active(),
                model: drone.model(),
            },
            EntityKind::PoisonPlant | EntityKind::HealStation | EntityKind::RecyclingStation => {
                EntityDetail::Marker
            }
        };
        Self {
            id: entity.id,
            category: entity.kind.category(),
            label: entity.kind.label(),
            bounds: entity.bounds,
            detail,
        }
    }
}
