use engine::{EntityId, Rect, Vec2};
use serde::{Deserialize, Serialize};

use super::registry::EntityRegistry;
use super::types::{EntityCategory, EntityKind, QuestObjectiveState};

pub const QUEST_GIVER_SIZE: (f32, f32) = (40.0, 50.0);
pub const QUEST_OBJECTIVE_SIZE: (f32, f32) = (32.0, 40.0);
pub const QUEST_INTERACTION_RADIUS: f32 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QuestId(pub u32);

struct QuestLayout {
    id: QuestId,
    description: &'static str,
    reward: u32,
    required: u32,
    giver_at: (f32, f32),
    objective_at: (f32, f32),
}

const QUEST_LAYOUTS: [QuestLayout; 2] = [
    QuestLayout {
        id: QuestId(1),
        description: "Clean out the rubbish bin by the first house",
        reward: 50,
        required: 1,
        giver_at: (550.0, 320.0),
        objective_at: (650.0, 280.0),
    },
    QuestLayout {
        id: QuestId(2),
        description: "Help tidy the bin near the second house",
        reward: 50,
        required: 1,
        giver_at: (1850.0, 420.0),
        objective_at: (1750.0, 460.0),
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    Offered,
    Active,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quest {
    pub id: QuestId,
    pub description: &'static str,
    pub reward: u32,
    pub required: u32,
    pub current_count: u32,
    pub status: QuestStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestCompletion {
    pub quest_id: QuestId,
    pub reward: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestTracker {
    quests: Vec<Quest>,
}

impl QuestTracker {
    /// Offers the fixed quest set and spawns its givers and objectives.
    pub fn spawn_level_quests(registry: &mut EntityRegistry) -> Self {
        let mut quests = Vec::with_capacity(QUEST_LAYOUTS.len());
        for layout in &QUEST_LAYOUTS {
            let (gw, gh) = QUEST_GIVER_SIZE;
            registry.spawn(
                Rect::new(layout.giver_at.0, layout.giver_at.1, gw, gh),
                EntityKind::QuestGiver {
                    quest_id: layout.id,
                },
            );
            let (ow, oh) = QUEST_OBJECTIVE_SIZE;
            registry.spawn(
                Rect::new(layout.objective_at.0, layout.objective_at.1, ow, oh),
                EntityKind::QuestObjective(QuestObjectiveState {
                    quest_id: layout.id,
                    collected: false,
                }),
            );
            quests.push(Quest {
                id: layout.id,
                description: layout.description,
                reward: layout.reward,
                required: layout.required,
                current_count: 0,
                status: QuestStatus::Offered,
            });
        }
        Self { quests }
    }

    pub fn quests(&self) -> &[Quest] {
        &self.quests
    }

    pub fn status(&self, id: QuestId) -> Option<QuestStatus> {
        self.quest(id).map(|quest| quest.status)
    }

    fn quest(&self, id: QuestId) -> Option<&Quest> {
        self.quests.iter().find(|quest| quest.id == id)
    }

    fn quest_mut(&mut self, id: QuestId) -> Option<&mut Quest> {
        self.quests.iter_mut().find(|quest| quest.id == id)
    }

    /// Accepts the offered quest of the first giver within reach of
    /// `player_center`.
    pub fn try_accept(&mut self, registry: &EntityRegistry, player_center: Vec2) -> Option<QuestId> {
        let quest_id = registry
            .iter_category(EntityCategory::QuestGiver)
            .filter(|giver| giver.bounds.center().distance(player_center) < QUEST_INTERACTION_RADIUS)
            .filter_map(|giver| match giver.kind {
                EntityKind::QuestGiver { quest_id } => Some(quest_id),
                _ => None,
            })
            .find(|quest_id| self.status(*quest_id) == Some(QuestStatus::Offered))?;

        let quest = self.quest_mut(quest_id)?;
        quest.status = QuestStatus::Active;
        Some(quest_id)
    }

    /// Collects every untouched objective under `player` whose quest is
    /// active. Completion is reported once, on the transition.
    pub fn collect_objectives(
        &mut self,
        registry: &mut EntityRegistry,
        player: &Rect,
    ) -> Vec<QuestCompletion> {
        let touched: Vec<(EntityId, QuestId)> = registry
            .iter_category(EntityCategory::QuestObjective)
            .filter(|entity| entity.bounds.intersects(player))
            .filter_map(|entity| match entity.kind {
                EntityKind::QuestObjective(objective) if !objective.collected => {
                    Some((entity.id, objective.quest_id))
                }
                _ => None,
            })
            .collect();

        let mut completions = Vec::new();
        for (objective_id, quest_id) in touched {
            let Some(quest) = self.quest_mut(quest_id) else {
                continue;
            };
            if quest.status != QuestStatus::Active {
                continue;
            }
            quest.current_count += 1;
            if let Some(entity) = registry.get_mut(objective_id) {
                if let EntityKind::QuestObjective(objective) = &mut entity.kind {
                    objective.collected = true;
                }
            }
            registry.despawn(objective_id);
            if quest.current_count >= quest.required {
                quest.status = QuestStatus::Completed;
                completions.push(QuestCompletion {
                    quest_id,
                    reward: quest.reward,
                });
            }
        }
        completions
    }
}
