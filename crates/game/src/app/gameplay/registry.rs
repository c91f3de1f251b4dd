use std::collections::{BTreeMap, BTreeSet};

use engine::{EntityId, EntityIdAllocator, Rect};

use super::types::{Entity, EntityCategory, EntityKind, PlayerState};

/// Single owner of every live entity. Each entity is indexed under exactly
/// one category; category views filter through that index.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    allocator: EntityIdAllocator,
    entities: BTreeMap<EntityId, Entity>,
    by_category: BTreeMap<EntityCategory, BTreeSet<EntityId>>,
    player_id: Option<EntityId>,
}

impl EntityRegistry {
    pub fn spawn(&mut self, bounds: Rect, kind: EntityKind) -> EntityId {
        let id = self.allocator.allocate();
        let category = kind.category();
        if category == EntityCategory::Player {
            self.player_id = Some(id);
        }
        self.by_category.entry(category).or_default().insert(id);
        self.entities.insert(id, Entity { id, bounds, kind });
        id
    }

    /// Returns false when the entity is already gone, so a second removal of
    /// the same id is a no-op.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        let Some(entity) = self.entities.remove(&id) else {
            return false;
        };
        let category = entity.kind.category();
        if let Some(ids) = self.by_category.get_mut(&category) {
            ids.remove(&id);
        }
        if self.player_id == Some(id) {
            self.player_id = None;
        }
        true
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn ids_in(&self, category: EntityCategory) -> Vec<EntityId> {
        self.by_category
            .get(&category)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn count_in(&self, category: EntityCategory) -> usize {
        self.by_category.get(&category).map_or(0, BTreeSet::len)
    }

    pub fn iter_category(&self, category: EntityCategory) -> impl Iterator<Item = &Entity> + '_ {
        self.by_category
            .get(&category)
            .into_iter()
            .flat_map(|ids| ids.iter())
            .filter_map(|id| self.entities.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.by_category.clear();
        self.allocator.reset();
        self.player_id = None;
    }

    pub fn player_id(&self) -> Option<EntityId> {
        self.player_id
    }

    pub fn player(&self) -> Option<(&Rect, &PlayerState)> {
        let entity = self.entities.get(&self.player_id?)?;
        match &entity.kind {
            EntityKind::Player(state) => Some((&entity.bounds, state)),
            _ => None,
        }
    }

    pub fn player_mut(&mut self) -> Option<(&mut Rect, &mut PlayerState)> {
        let entity = self.entities.get_mut(&self.player_id?)?;
        let Entity { bounds, kind, .. } = entity;
        match kind {
            EntityKind::Player(state) => Some((bounds, state)),
            _ => None,
        }
    }

    pub fn player_bounds(&self) -> Option<Rect> {
        self.player().map(|(bounds, _)| *bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::gameplay::types::{Facing, ObstacleKind};
    use engine::Vec2;

    fn player_kind() -> EntityKind {
        EntityKind::Player(PlayerState {
            velocity: Vec2::ZERO,
            facing: Facing::Down,
            carrying: 0,
            capacity: 5,
            has_tractor: false,
        })
    }

    #[test]
    fn each_entity_is_indexed_under_exactly_one_category() {
        let mut registry = EntityRegistry::default();
        let player = registry.spawn(Rect::new(0.0, 0.0, 40.0, 40.0), player_kind());
        let tree = registry.spawn(
            Rect::new(100.0, 100.0, 56.0, 72.0),
            EntityKind::Obstacle(ObstacleKind::Tree),
        );

        assert_eq!(registry.player_id(), Some(player));
        assert_eq!(registry.ids_in(EntityCategory::Obstacle), vec![tree]);
        assert_eq!(registry.count_in(EntityCategory::Player), 1);
        assert_eq!(registry.count_in(EntityCategory::Item), 0);
        let indexed: usize = [EntityCategory::Player, EntityCategory::Obstacle]
            .iter()
            .map(|category| registry.count_in(*category))
            .sum();
        assert_eq!(indexed, registry.len());
    }

    #[test]
    fn despawn_is_exactly_once() {
        let mut registry = EntityRegistry::default();
        let plant = registry.spawn(Rect::new(0.0, 0.0, 32.0, 32.0), EntityKind::PoisonPlant);

        assert!(registry.despawn(plant));
        assert!(!registry.despawn(plant), "second removal must be a no-op");
        assert_eq!(registry.count_in(EntityCategory::PoisonPlant), 0);
        assert!(registry.iter_category(EntityCategory::PoisonPlant).next().is_none());
    }

    #[test]
    fn clear_resets_ids_and_player() {
        let mut registry = EntityRegistry::default();
        registry.spawn(Rect::new(0.0, 0.0, 40.0, 40.0), player_kind());
        registry.spawn(Rect::new(0.0, 0.0, 32.0, 32.0), EntityKind::HealStation);
        registry.clear();

        assert!(registry.is_empty());
        assert!(registry.player().is_none());
        let fresh = registry.spawn(Rect::new(0.0, 0.0, 32.0, 32.0), EntityKind::HealStation);
        assert_eq!(fresh, EntityId(0));
    }

    #[test]
    fn player_mut_edits_in_place() {
        let mut registry = EntityRegistry::default();
        registry.spawn(Rect::new(0.0, 0.0, 40.0, 40.0), player_kind());
        if let Some((bounds, state)) = registry.player_mut() {
            bounds.x = 12.0;
            state.carrying = 3;
        }
        let (bounds, state) = registry.player().expect("player");
        assert_eq!(bounds.x, 12.0);
        assert_eq!(state.carrying, 3);
    }
}
