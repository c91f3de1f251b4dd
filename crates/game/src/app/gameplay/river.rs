use std::f32::consts::FRAC_PI_2;

use engine::{Rect, Vec2};
use serde::Serialize;

use super::registry::EntityRegistry;
use super::types::{EntityCategory, EntityKind};
use super::WORLD_HEIGHT;

pub const WATERWAY_WIDTH: f32 = 80.0;
pub const CURRENT_STRENGTH: f32 = 2.0;
pub const OBSTRUCTION_SEGMENT_INDEX: usize = 4;
pub const BLOCKED_WATER_SPEED_FACTOR: f32 = 0.6;

const WATERWAY_PATH: [(f32, f32); 11] = [
    (200.0, 0.0),
    (250.0, 150.0),
    (180.0, 300.0),
    (220.0, 450.0),
    (300.0, 550.0),
    (280.0, 700.0),
    (350.0, 850.0),
    (300.0, 1000.0),
    (400.0, 1150.0),
    (350.0, 1300.0),
    (400.0, WORLD_HEIGHT),
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WaterwaySegment {
    pub angle: f32,
    pub is_obstruction_point: bool,
    pub flowing: bool,
}

impl WaterwaySegment {
    /// Push applied to a player standing in this segment while it flows.
    pub fn push(&self) -> Vec2 {
        if !self.flowing {
            return Vec2::ZERO;
        }
        let direction = self.angle + FRAC_PI_2;
        Vec2::new(direction.cos(), direction.sin()) * CURRENT_STRENGTH
    }
}

/// Bounds and data for every leg of the fixed waterway path. Each segment is
/// an upright box centred on its leg, as long as the leg itself.
pub fn build_segments() -> Vec<(Rect, WaterwaySegment)> {
    WATERWAY_PATH
        .windows(2)
        .enumerate()
        .map(|(index, leg)| {
            let (x1, y1) = leg[0];
            let (x2, y2) = leg[1];
            let center = Vec2::new(((x1 + x2) / 2.0).floor(), ((y1 + y2) / 2.0).floor());
            let length = Vec2::new(x2 - x1, y2 - y1).length().floor();
            let bounds = Rect::new(
                center.x - WATERWAY_WIDTH / 2.0,
                center.y - (length / 2.0).floor(),
                WATERWAY_WIDTH,
                length,
            );
            let segment = WaterwaySegment {
                angle: (y2 - y1).atan2(x2 - x1),
                is_obstruction_point: index == OBSTRUCTION_SEGMENT_INDEX,
                flowing: false,
            };
            (bounds, segment)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterwayState {
    #[default]
    Absent,
    Blocked,
    Flowing,
}

/// Level-wide waterway state. Segment entities live in the registry; this
/// only tracks whether the obstruction has been cleared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiverController {
    state: WaterwayState,
}

impl RiverController {
    pub fn blocked() -> Self {
        Self {
            state: WaterwayState::Blocked,
        }
    }

    pub fn state(&self) -> WaterwayState {
        self.state
    }

    pub fn is_flowing(&self) -> bool {
        self.state == WaterwayState::Flowing
    }

    pub fn player_in_blocked_water(&self, registry: &EntityRegistry, player: &Rect) -> bool {
        if self.state != WaterwayState::Blocked {
            return false;
        }
        registry
            .iter_category(EntityCategory::Waterway)
            .any(|segment| segment.bounds.intersects(player))
    }

    /// Flips every segment to flowing the first time no obstruction item is
    /// left. Returns true only on that transition.
    pub fn check_unblock(&mut self, registry: &mut EntityRegistry) -> bool {
        if self.state != WaterwayState::Blocked {
            return false;
        }
        let obstruction_left = registry
            .iter_category(EntityCategory::Item)
            .filter_map(|entity| entity.kind.as_item())
            .any(|item| item.blocks_waterway);
        if obstruction_left {
            return false;
        }

        self.state = WaterwayState::Flowing;
        for id in registry.ids_in(EntityCategory::Waterway) {
            if let Some(entity) = registry.get_mut(id) {
                if let EntityKind::Waterway(segment) = &mut entity.kind {
                    segment.flowing = true;
                }
            }
        }
        true
    }

    /// Sum of the pushes from every flowing segment overlapping `player`.
    pub fn current_push(&self, registry: &EntityRegistry, player: &Rect) -> Vec2 {
        if self.state != WaterwayState::Flowing {
            return Vec2::ZERO;
        }
        registry
            .iter_category(EntityCategory::Waterway)
            .filter(|entity| entity.bounds.intersects(player))
            .filter_map(|entity| match &entity.kind {
                EntityKind::Waterway(segment) => Some(segment.push()),
                _ => None,
            })
            .fold(Vec2::ZERO, |total, push| total + push)
    }
}

pub fn obstruction_center(segments: &[(Rect, WaterwaySegment)]) -> Option<Vec2> {
    segments
        .iter()
        .find(|(_, segment)| segment.is_obstruction_point)
        .map(|(bounds, _)| bounds.center())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::gameplay::types::{ItemMaterial, ItemState, Rarity};

    fn spawn_waterway(registry: &mut EntityRegistry) {
        for (bounds, segment) in build_segments() {
            registry.spawn(bounds, EntityKind::Waterway(segment));
        }
    }

    fn obstruction_item() -> EntityKind {
        EntityKind::Item(ItemState {
            material: ItemMaterial::Plastic,
            rarity: Rarity::Normal,
            needs_special_collector: false,
            blocks_waterway: true,
        })
    }

    #[test]
    fn path_yields_ten_segments_with_one_obstruction_point() {
        let segments = build_segments();
        assert_eq!(segments.len(), 10);
        let obstruction: Vec<usize> = segments
            .iter()
            .enumerate()
            .filter(|(_, (_, segment))| segment.is_obstruction_point)
            .map(|(index, _)| index)
            .collect();
        assert_eq!(obstruction, vec![OBSTRUCTION_SEGMENT_INDEX]);
        assert!(segments.iter().all(|(bounds, _)| bounds.w == WATERWAY_WIDTH));
        let center = obstruction_center(&segments).expect("obstruction");
        assert!(center.distance(Vec2::new(290.0, 625.0)) < 1.0);
    }

    #[test]
    fn unblock_fires_once_when_last_obstruction_item_leaves() {
        let mut registry = EntityRegistry::default();
        spawn_waterway(&mut registry);
        let trash = registry.spawn(Rect::new(290.0, 625.0, 28.0, 28.0), obstruction_item());
        let mut river = RiverController::blocked();

        assert!(!river.check_unblock(&mut registry));
        registry.despawn(trash);
        assert!(river.check_unblock(&mut registry));
        assert!(!river.check_unblock(&mut registry), "exactly once");
        assert!(registry
            .iter_category(EntityCategory::Waterway)
            .all(|entity| matches!(entity.kind, EntityKind::Waterway(s) if s.flowing)));
    }

    #[test]
    fn blocked_water_slows_and_flowing_water_pushes() {
        let mut registry = EntityRegistry::default();
        spawn_waterway(&mut registry);
        let mut river = RiverController::blocked();
        let in_water = Rect::from_center(Vec2::new(290.0, 625.0), 40.0, 40.0);
        let dry = Rect::from_center(Vec2::new(1200.0, 700.0), 40.0, 40.0);

        assert!(river.player_in_blocked_water(&registry, &in_water));
        assert!(!river.player_in_blocked_water(&registry, &dry));
        assert_eq!(river.current_push(&registry, &in_water), Vec2::ZERO);

        assert!(river.check_unblock(&mut registry));
        assert!(!river.player_in_blocked_water(&registry, &in_water));
        let push = river.current_push(&registry, &in_water);
        assert!(push.length() >= CURRENT_STRENGTH - 1e-4);
        assert_eq!(river.current_push(&registry, &dry), Vec2::ZERO);
    }

    #[test]
    fn absent_waterway_is_inert() {
        let mut registry = EntityRegistry::default();
        let mut river = RiverController::default();
        let player = Rect::new(0.0, 0.0, 40.0, 40.0);
        assert!(!river.check_unblock(&mut registry));
        assert!(!river.player_in_blocked_water(&registry, &player));
        assert_eq!(river.current_push(&registry, &player), Vec2::ZERO);
    }
}
