use engine::{EntityId, Rect, Vec2};
use serde::Serialize;

use super::combo::ScoreBoard;
use super::registry::EntityRegistry;
use super::types::{Entity, EntityCategory, EntityKind, GameplayEvent, GameplayEventBus};

pub const DRONE_COLLECT_POINTS: u32 = 15;
const HOVER_ABOVE_PLAYER: f32 = 40.0;
const BASIC_SIZE: (f32, f32) = (40.0, 28.0);
const BASIC_EASE: f32 = 0.1;
const BASIC_LEAD_X: f32 = 20.0;
const BASIC_LEAD_Y: f32 = 50.0;
const BASIC_PHASE_STEP: f32 = 0.15;
const BASIC_BOB: f32 = 6.0;
const BASIC_COLLECT_INFLATE: f32 = 70.0;
const ADVANCED_SIZE: (f32, f32) = (30.0, 24.0);
const ADVANCED_SPEED: f32 = 3.0;
const ADVANCED_ARRIVAL: f32 = 5.0;
const ADVANCED_COLLECT_INFLATE: f32 = 50.0;
const ADVANCED_FLUSH_DISTANCE: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum DroneModel {
    /// Follows the player and picks up items only it can reach.
    Basic { phase: f32 },
    /// Flies to clicked targets, auto-collects any item, and hands its cargo
    /// to the player when close.
    Advanced { target: Option<Vec2>, cargo: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drone {
    active: bool,
    model: DroneModel,
}

impl Drone {
    pub fn basic() -> Self {
        Self {
            active: false,
            model: DroneModel::Basic { phase: 0.0 },
        }
    }

    pub fn advanced() -> Self {
        Self {
            active: false,
            model: DroneModel::Advanced {
                target: None,
                cargo: 0,
            },
        }
    }

    pub fn label(&self) -> &'static str {
        match self.model {
            DroneModel::Basic { .. } => "drone",
            DroneModel::Advanced { .. } => "advanced_drone",
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn model(&self) -> DroneModel {
        self.model
    }

    /// Initial bounds: centred 40px above the player.
    pub fn spawn_bounds(&self, player: &Rect) -> Rect {
        let (w, h) = match self.model {
            DroneModel::Basic { .. } => BASIC_SIZE,
            DroneModel::Advanced { .. } => ADVANCED_SIZE,
        };
        Rect::from_center(hover_point(player), w, h)
    }

    pub fn toggle(&mut self) {
        self.active = !self.active;
    }

    /// Only an active advanced drone takes targets.
    pub fn set_target(&mut self, point: Vec2) -> bool {
        match &mut self.model {
            DroneModel::Advanced { target, .. } if self.active => {
                *target = Some(point);
                true
            }
            _ => false,
        }
    }

    fn steer(&mut self, bounds: &mut Rect, player: &Rect) {
        if !self.active {
            bounds.set_center(hover_point(player));
            return;
        }
        match &mut self.model {
            DroneModel::Basic { phase } => {
                *phase += BASIC_PHASE_STEP;
                let anchor = player.center();
                bounds.x += (anchor.x - BASIC_LEAD_X - bounds.x) * BASIC_EASE;
                bounds.y = anchor.y - BASIC_LEAD_Y + phase.sin() * BASIC_BOB;
            }
            DroneModel::Advanced { target, .. } => {
                let Some(point) = *target else {
                    return;
                };
                let offset = point - bounds.center();
                let distance = offset.length();
                if distance > ADVANCED_ARRIVAL {
                    bounds.translate(offset * (ADVANCED_SPEED / distance));
                } else {
                    *target = None;
                }
            }
        }
    }

    /// Capture area this tick, paired with whether only special-collector
    /// items qualify.
    fn capture_area(&self, bounds: &Rect) -> Option<(Rect, bool)> {
        if !self.active {
            return None;
        }
        match self.model {
            DroneModel::Basic { .. } => Some((
                bounds.inflate(BASIC_COLLECT_INFLATE, BASIC_COLLECT_INFLATE),
                true,
            )),
            DroneModel::Advanced { target: None, .. } => Some((
                bounds.inflate(ADVANCED_COLLECT_INFLATE, ADVANCED_COLLECT_INFLATE),
                false,
            )),
            DroneModel::Advanced { target: Some(_), .. } => None,
        }
    }

    fn stow(&mut self) {
        if let DroneModel::Advanced { cargo, .. } = &mut self.model {
            *cargo = cargo.saturating_add(1);
        }
    }

    /// Empties the cargo hold when within hand-off range of the player.
    fn hand_off(&mut self, bounds: &Rect, player: &Rect) -> u32 {
        match &mut self.model {
            DroneModel::Advanced { cargo, .. }
                if *cargo > 0
                    && bounds.center().distance(player.center()) < ADVANCED_FLUSH_DISTANCE =>
            {
                std::mem::take(cargo)
            }
            _ => 0,
        }
    }
}

fn hover_point(player: &Rect) -> Vec2 {
    player.center() - Vec2::new(0.0, HOVER_ABOVE_PLAYER)
}

fn first_capturable_item(registry: &EntityRegistry, area: &Rect, special_only: bool) -> Option<EntityId> {
    registry
        .iter_category(EntityCategory::Item)
        .find(|entity| {
            let special = entity
                .kind
                .as_item()
                .is_some_and(|item| item.needs_special_collector);
            (!special_only || special) && area.intersects(&entity.bounds)
        })
        .map(|entity| entity.id)
}

/// Steers every drone, collects at most one item per drone, and hands
/// advanced-drone cargo to the player.
pub fn update_drones(
    registry: &mut EntityRegistry,
    board: &mut ScoreBoard,
    events: &mut GameplayEventBus,
) {
    let Some(player) = registry.player_bounds() else {
        return;
    };

    for drone_id in registry.ids_in(EntityCategory::Drone) {
        let capture = {
            let Some(Entity {
                bounds,
                kind: EntityKind::Drone(drone),
                ..
            }) = registry.get_mut(drone_id)
            else {
                continue;
            };
            drone.steer(bounds, &player);
            drone.capture_area(bounds)
        };

        if let Some((area, special_only)) = capture {
            if let Some(item_id) = first_capturable_item(registry, &area, special_only) {
                registry.despawn(item_id);
                let points = board.award(DRONE_COLLECT_POINTS);
                events.emit(GameplayEvent::DroneCollected { item_id, points });
                if let Some(Entity {
                    kind: EntityKind::Drone(drone),
                    ..
                }) = registry.get_mut(drone_id)
                {
                    drone.stow();
                }
            }
        }

        let handed = match registry.get_mut(drone_id) {
            Some(Entity {
                bounds,
                kind: EntityKind::Drone(drone),
                ..
            }) => drone.hand_off(bounds, &player),
            _ => 0,
        };
        if handed > 0 {
            if let Some((_, state)) = registry.player_mut() {
                state.carrying = state.carrying.saturating_add(handed).min(state.capacity);
            }
        }
    }
}
