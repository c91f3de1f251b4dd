use engine::{EntityId, Rect, Vec2};
use rand::Rng;

use super::registry::EntityRegistry;
use super::types::{EntityCategory, EntityKind};

pub const PICKUP_INFLATE: f32 = 25.0;
pub const TRACTOR_PICKUP_INFLATE: f32 = 50.0;
pub const PICKUP_PER_ACTION: u32 = 1;
pub const TRACTOR_PICKUP_PER_ACTION: u32 = 3;
pub const STRIKE_INFLATE: f32 = 30.0;
pub const TOXIC_CONTACT_CHANCE: f64 = 0.02;
pub const TOXIC_CONTACT_DAMAGE: u32 = 1;

/// Moves the player by `velocity`, records it as the last applied velocity,
/// and clamps the result inside `world`.
pub fn move_player(registry: &mut EntityRegistry, velocity: Vec2, world: &Rect) {
    if let Some((bounds, state)) = registry.player_mut() {
        state.velocity = velocity;
        bounds.translate(velocity);
        bounds.clamp_inside(world);
    }
}

/// Shifts the player without touching the recorded velocity, then clamps
/// inside `world`. Used for the waterway current.
pub fn push_player(registry: &mut EntityRegistry, push: Vec2, world: &Rect) {
    if push.is_zero() {
        return;
    }
    if let Some((bounds, _)) = registry.player_mut() {
        bounds.translate(push);
        bounds.clamp_inside(world);
    }
}

/// Reverts the player by its last applied velocity once per overlapping
/// obstacle. Returns the damage from toxic contacts.
pub fn resolve_obstacles<R: Rng + ?Sized>(registry: &mut EntityRegistry, rng: &mut R) -> u32 {
    let Some(player) = registry.player_bounds() else {
        return 0;
    };
    let contacts: Vec<bool> = registry
        .iter_category(EntityCategory::Obstacle)
        .filter(|obstacle| obstacle.bounds.intersects(&player))
        .map(|obstacle| matches!(obstacle.kind, EntityKind::Obstacle(kind) if kind.is_toxic()))
        .collect();

    let mut damage = 0;
    for toxic in contacts {
        if let Some((bounds, state)) = registry.player_mut() {
            bounds.translate(Vec2::ZERO - state.velocity);
        }
        if toxic && rng.random_bool(TOXIC_CONTACT_CHANCE) {
            damage += TOXIC_CONTACT_DAMAGE;
        }
    }
    damage
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PickupOutcome {
    pub collected: Vec<EntityId>,
    pub damage: u32,
    pub bonus_points: u32,
}

impl PickupOutcome {
    pub fn count(&self) -> u32 {
        self.collected.len() as u32
    }
}

/// Picks up the nearest-by-id items inside the capture area until the
/// per-action limit or the player's capacity is reached.
pub fn pickup(registry: &mut EntityRegistry) -> PickupOutcome {
    let mut outcome = PickupOutcome::default();
    let Some((bounds, state)) = registry.player() else {
        return outcome;
    };
    if state.is_full() {
        return outcome;
    }
    let (inflate, per_action) = if state.has_tractor {
        (TRACTOR_PICKUP_INFLATE, TRACTOR_PICKUP_PER_ACTION)
    } else {
        (PICKUP_INFLATE, PICKUP_PER_ACTION)
    };
    let limit = per_action.min(state.capacity - state.carrying) as usize;
    let area = bounds.inflate(inflate, inflate);

    let hits: Vec<(EntityId, u32, u32)> = registry
        .iter_category(EntityCategory::Item)
        .filter(|entity| area.intersects(&entity.bounds))
        .filter_map(|entity| {
            let item = entity.kind.as_item()?;
            (!item.needs_special_collector).then_some((
                entity.id,
                item.rarity.pickup_damage(),
                item.rarity.bonus_points(),
            ))
        })
        .take(limit)
        .collect();

    for (id, damage, points) in hits {
        if registry.despawn(id) {
            outcome.collected.push(id);
            outcome.damage += damage;
            outcome.bonus_points += points;
        }
    }
    if let Some((_, state)) = registry.player_mut() {
        state.carrying = (state.carrying + outcome.count()).min(state.capacity);
    }
    outcome
}

/// Stuns every wandering adversary inside the strike area and returns
/// their ids.
pub fn strike(registry: &mut EntityRegistry) -> Vec<EntityId> {
    let Some(player) = registry.player_bounds() else {
        return Vec::new();
    };
    let area = player.inflate(STRIKE_INFLATE, STRIKE_INFLATE);
    let mut stunned = Vec::new();
    for id in registry.ids_in(EntityCategory::Adversary) {
        let Some(entity) = registry.get_mut(id) else {
            continue;
        };
        if !area.intersects(&entity.bounds) {
            continue;
        }
        if let EntityKind::Adversary(adversary) = &mut entity.kind {
            if adversary.stun() {
                stunned.push(id);
            }
        }
    }
    stunned
}
