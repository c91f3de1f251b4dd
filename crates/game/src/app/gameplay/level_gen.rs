use engine::{LevelDef, Rect, Vec2};
use rand::Rng;
use thiserror::Error;
use tracing::info;

use super::adversary::{Adversary, ADVERSARY_SIZE};
use super::drone::Drone;
use super::progress::PlayerProgress;
use super::quest::QuestTracker;
use super::registry::EntityRegistry;
use super::river::{build_segments, obstruction_center, RiverController};
use super::types::{
    EntityCategory, EntityKind, Facing, ItemMaterial, ItemState, ObstacleKind, PlayerState, Rarity,
    UpgradeId,
};
use super::{world_bounds, ITEM_SIZE, PLAYER_SIZE, WORLD_HEIGHT, WORLD_WIDTH};

pub const RECYCLING_STATION_AT: (f32, f32) = (2200.0, 200.0);
pub const RECYCLING_STATION_SIZE: f32 = 80.0;
pub const POISON_PLANT_SIZE: f32 = 32.0;
const POISON_PLANT_MARGIN: i32 = 100;
const ITEM_MARGIN: i32 = 200;
const ADVERSARY_MARGIN: i32 = 200;
const OBSTACLE_ATTEMPTS: u32 = 50;
const ITEM_ATTEMPTS: u32 = 150;
const ITEM_PLACEMENT_PROBE: f32 = 24.0;
const OBSTRUCTION_SPREAD: (i32, i32) = (40, 60);
const ROAD_BANDS_Y: [(f32, f32); 2] = [(280.0, 380.0), (780.0, 880.0)];
const ROAD_BANDS_X: [(f32, f32); 2] = [(580.0, 680.0), (1380.0, 1480.0)];

#[derive(Debug, Error, PartialEq)]
pub enum LevelTuningError {
    #[error("level {level}: unknown item material `{token}`")]
    UnknownMaterial { level: u32, token: String },
    #[error("level {level}: unknown obstacle kind `{token}`")]
    UnknownObstacleKind { level: u32, token: String },
    #[error("level database has no levels")]
    NoLevels,
}

/// A [`LevelDef`] with its tokens resolved into game types.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelTuning {
    pub number: u32,
    pub label: String,
    pub litter_cooldown_ticks: u32,
    pub litter_spawn_cap: u32,
    pub litterer_min: u32,
    pub litterer_max: u32,
    pub initial_items: u32,
    pub materials: Vec<ItemMaterial>,
    pub obstacle_kinds: Vec<ObstacleKind>,
    pub obstacle_count: u32,
    pub obstacle_min_spacing: Option<f32>,
    pub poison_plants: u32,
    pub has_river: bool,
    pub has_quests: bool,
    pub special_collector_chance: f64,
    pub starts_with_drone: bool,
}

impl LevelTuning {
    pub fn from_def(def: &LevelDef) -> Result<Self, LevelTuningError> {
        let materials = def
            .item_materials
            .iter()
            .map(|token| {
                ItemMaterial::from_token(token).ok_or_else(|| LevelTuningError::UnknownMaterial {
                    level: def.number,
                    token: token.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let obstacle_kinds = def
            .obstacle_kinds
            .iter()
            .map(|token| {
                ObstacleKind::from_token(token).ok_or_else(|| {
                    LevelTuningError::UnknownObstacleKind {
                        level: def.number,
                        token: token.clone(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            number: def.number,
            label: def.label.clone(),
            litter_cooldown_ticks: def.litter_cooldown_ticks,
            litter_spawn_cap: def.litter_spawn_cap,
            litterer_min: def.litterer_min,
            litterer_max: def.litterer_max,
            initial_items: def.initial_items,
            materials,
            obstacle_kinds,
            obstacle_count: def.obstacle_count,
            obstacle_min_spacing: def.obstacle_min_spacing,
            poison_plants: def.poison_plants,
            has_river: def.has_river,
            has_quests: def.has_quests,
            special_collector_chance: f64::from(def.special_collector_chance),
            starts_with_drone: def.starts_with_drone,
        })
    }

    pub fn random_material<R: Rng + ?Sized>(&self, rng: &mut R) -> ItemMaterial {
        match self.materials.len() {
            0 => ItemMaterial::Plastic,
            len => self.materials[rng.random_range(0..len)],
        }
    }
}

/// Per-level controllers produced alongside the spawned entities.
#[derive(Debug, Default)]
pub struct LevelLayout {
    pub river: RiverController,
    pub quests: QuestTracker,
}

fn random_point<R: Rng + ?Sized>(rng: &mut R, margin: i32) -> Vec2 {
    let x = rng.random_range(margin..=WORLD_WIDTH as i32 - margin);
    let y = rng.random_range(margin..=WORLD_HEIGHT as i32 - margin);
    Vec2::new(x as f32, y as f32)
}

fn on_road(point: Vec2) -> bool {
    ROAD_BANDS_Y
        .iter()
        .any(|(low, high)| point.y > *low && point.y < *high)
        || ROAD_BANDS_X
            .iter()
            .any(|(low, high)| point.x > *low && point.x < *high)
}

fn blocked_by_obstacle(registry: &EntityRegistry, probe: &Rect) -> bool {
    registry
        .iter_category(EntityCategory::Obstacle)
        .any(|obstacle| obstacle.bounds.intersects(probe))
}

pub fn player_spawn_bounds() -> Rect {
    Rect::from_center(
        Vec2::new(WORLD_WIDTH / 2.0, WORLD_HEIGHT / 2.0),
        PLAYER_SIZE,
        PLAYER_SIZE,
    )
}

/// Clears `registry` and populates it for `tuning`. Upgrades owned in
/// `progress` shape the player and the drone.
pub fn generate_level<R: Rng + ?Sized>(
    tuning: &LevelTuning,
    progress: &PlayerProgress,
    registry: &mut EntityRegistry,
    rng: &mut R,
) -> LevelLayout {
    registry.clear();
    let mut layout = LevelLayout::default();

    let player_bounds = player_spawn_bounds();
    registry.spawn(
        player_bounds,
        EntityKind::Player(PlayerState {
            velocity: Vec2::ZERO,
            facing: Facing::Down,
            carrying: 0,
            capacity: progress.carry_capacity(),
            has_tractor: progress.owns(UpgradeId::Tractor),
        }),
    );
    registry.spawn(
        Rect::new(
            RECYCLING_STATION_AT.0,
            RECYCLING_STATION_AT.1,
            RECYCLING_STATION_SIZE,
            RECYCLING_STATION_SIZE,
        ),
        EntityKind::RecyclingStation,
    );

    let mut obstruction_at = None;
    if tuning.has_river {
        let segments = build_segments();
        obstruction_at = obstruction_center(&segments);
        for (bounds, segment) in segments {
            registry.spawn(bounds, EntityKind::Waterway(segment));
        }
        layout.river = RiverController::blocked();
    }

    spawn_obstacles(tuning, registry, rng);

    for _ in 0..tuning.poison_plants {
        let at = random_point(rng, POISON_PLANT_MARGIN);
        registry.spawn(
            Rect::new(at.x, at.y, POISON_PLANT_SIZE, POISON_PLANT_SIZE),
            EntityKind::PoisonPlant,
        );
    }

    spawn_initial_items(tuning, obstruction_at, registry, rng);

    if tuning.has_quests {
        layout.quests = QuestTracker::spawn_level_quests(registry);
    }

    let litterers = rng.random_range(tuning.litterer_min..=tuning.litterer_max.max(tuning.litterer_min));
    for _ in 0..litterers {
        let at = random_point(rng, ADVERSARY_MARGIN);
        let adversary = Adversary::new(rng, tuning.litter_cooldown_ticks, tuning.litter_spawn_cap);
        registry.spawn(
            Rect::new(at.x, at.y, ADVERSARY_SIZE.0, ADVERSARY_SIZE.1),
            EntityKind::Adversary(adversary),
        );
    }

    let drone = if progress.owns(UpgradeId::AdvancedDrone) {
        Some(Drone::advanced())
    } else if tuning.starts_with_drone {
        Some(Drone::basic())
    } else {
        None
    };
    if let Some(drone) = drone {
        registry.spawn(drone.spawn_bounds(&player_bounds), EntityKind::Drone(drone));
    }

    info!(
        level = tuning.number,
        label = %tuning.label,
        entities = registry.len(),
        items = registry.count_in(EntityCategory::Item),
        obstacles = registry.count_in(EntityCategory::Obstacle),
        adversaries = registry.count_in(EntityCategory::Adversary),
        "level_generated"
    );
    layout
}

fn spawn_obstacles<R: Rng + ?Sized>(tuning: &LevelTuning, registry: &mut EntityRegistry, rng: &mut R) {
    if tuning.obstacle_kinds.is_empty() {
        return;
    }
    let mut placed: Vec<Vec2> = Vec::new();
    for _ in 0..tuning.obstacle_count {
        for _ in 0..OBSTACLE_ATTEMPTS {
            let kind = tuning.obstacle_kinds[rng.random_range(0..tuning.obstacle_kinds.len())];
            let at = random_point(rng, kind.spawn_margin() as i32);
            if kind.avoids_roads() && on_road(at) {
                continue;
            }
            if let Some(spacing) = tuning.obstacle_min_spacing {
                if placed.iter().any(|other| other.distance(at) < spacing) {
                    continue;
                }
            }
            let (w, h) = kind.size();
            registry.spawn(Rect::new(at.x, at.y, w, h), EntityKind::Obstacle(kind));
            placed.push(at);
            break;
        }
    }
}

fn spawn_initial_items<R: Rng + ?Sized>(
    tuning: &LevelTuning,
    obstruction_at: Option<Vec2>,
    registry: &mut EntityRegistry,
    rng: &mut R,
) {
    let world = world_bounds();
    let mut remaining = tuning.initial_items;

    if let Some(center) = obstruction_at {
        let mut spot = center;
        for _ in 0..ITEM_ATTEMPTS {
            let candidate = Vec2::new(
                center.x + rng.random_range(-OBSTRUCTION_SPREAD.0..=OBSTRUCTION_SPREAD.0) as f32,
                center.y + rng.random_range(-OBSTRUCTION_SPREAD.1..=OBSTRUCTION_SPREAD.1) as f32,
            );
            let probe = Rect::new(candidate.x, candidate.y, ITEM_PLACEMENT_PROBE, ITEM_PLACEMENT_PROBE);
            if !blocked_by_obstacle(registry, &probe) {
                spot = candidate;
                break;
            }
        }
        let mut bounds = Rect::new(spot.x, spot.y, ITEM_SIZE, ITEM_SIZE);
        bounds.clamp_inside(&world);
        registry.spawn(
            bounds,
            EntityKind::Item(ItemState {
                material: tuning.random_material(rng),
                rarity: Rarity::Normal,
                needs_special_collector: false,
                blocks_waterway: true,
            }),
        );
        remaining = remaining.saturating_sub(1);
    }

    for _ in 0..remaining {
        for _ in 0..ITEM_ATTEMPTS {
            let at = random_point(rng, ITEM_MARGIN);
            let probe = Rect::new(at.x, at.y, ITEM_PLACEMENT_PROBE, ITEM_PLACEMENT_PROBE);
            if blocked_by_obstacle(registry, &probe) {
                continue;
            }
            let needs_special_collector = tuning.special_collector_chance > 0.0
                && rng.random_bool(tuning.special_collector_chance.min(1.0));
            registry.spawn(
                Rect::new(at.x, at.y, ITEM_SIZE, ITEM_SIZE),
                EntityKind::Item(ItemState {
                    material: tuning.random_material(rng),
                    rarity: Rarity::Normal,
                    needs_special_collector,
                    blocks_waterway: false,
                }),
            );
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn forest_def() -> LevelDef {
        LevelDef {
            number: 1,
            label: "Forest".to_string(),
            litter_cooldown_ticks: 1200,
            litter_spawn_cap: 10,
            litterer_min: 3,
            litterer_max: 5,
            initial_items: 12,
            item_materials: vec!["plastic".into(), "paper".into(), "bottle".into(), "can".into()],
            obstacle_kinds: vec!["tree".into(), "tree_big".into(), "tree_small".into()],
            obstacle_count: 40,
            obstacle_min_spacing: Some(80.0),
            poison_plants: 10,
            has_river: true,
            has_quests: true,
            special_collector_chance: 0.0,
            starts_with_drone: false,
        }
    }

    #[test]
    fn unknown_tokens_are_rejected() {
        let mut def = forest_def();
        def.item_materials.push("uranium".into());
        assert_eq!(
            LevelTuning::from_def(&def),
            Err(LevelTuningError::UnknownMaterial {
                level: 1,
                token: "uranium".into()
            })
        );
        let mut def = forest_def();
        def.obstacle_kinds = vec!["volcano".into()];
        assert!(matches!(
            LevelTuning::from_def(&def),
            Err(LevelTuningError::UnknownObstacleKind { .. })
        ));
    }

    #[test]
    fn forest_layout_has_waterway_quests_and_one_obstruction_item() {
        let tuning = LevelTuning::from_def(&forest_def()).expect("tuning");
        let mut registry = EntityRegistry::default();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let layout = generate_level(&tuning, &PlayerProgress::default(), &mut registry, &mut rng);

        assert_eq!(registry.count_in(EntityCategory::Player), 1);
        assert_eq!(registry.count_in(EntityCategory::RecyclingStation), 1);
        assert_eq!(registry.count_in(EntityCategory::Waterway), 10);
        assert_eq!(registry.count_in(EntityCategory::PoisonPlant), 10);
        assert_eq!(registry.count_in(EntityCategory::QuestGiver), 2);
        assert_eq!(registry.count_in(EntityCategory::Drone), 0);
        assert!((3..=5).contains(&registry.count_in(EntityCategory::Adversary)));
        assert!(registry.count_in(EntityCategory::Obstacle) <= 40);
        let obstruction_items = registry
            .iter_category(EntityCategory::Item)
            .filter_map(|entity| entity.kind.as_item())
            .filter(|item| item.blocks_waterway)
            .count();
        assert_eq!(obstruction_items, 1);
        assert_eq!(layout.quests.quests().len(), 2);
        assert!(!layout.river.is_flowing());
    }

    #[test]
    fn obstacles_keep_minimum_spacing() {
        let tuning = LevelTuning::from_def(&forest_def()).expect("tuning");
        let mut registry = EntityRegistry::default();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        generate_level(&tuning, &PlayerProgress::default(), &mut registry, &mut rng);

        let corners: Vec<Vec2> = registry
            .iter_category(EntityCategory::Obstacle)
            .map(|entity| Vec2::new(entity.bounds.x, entity.bounds.y))
            .collect();
        for (index, a) in corners.iter().enumerate() {
            for b in &corners[index + 1..] {
                assert!(a.distance(*b) >= 80.0, "{a:?} too close to {b:?}");
            }
        }
    }

    #[test]
    fn owned_upgrades_shape_the_player_and_drone() {
        let mut def = forest_def();
        def.has_river = false;
        let tuning = LevelTuning::from_def(&def).expect("tuning");
        let mut progress = PlayerProgress::default();
        progress.add_coins(1_000);
        progress.purchase(UpgradeId::Tractor);
        progress.purchase(UpgradeId::AdvancedDrone);
        let mut registry = EntityRegistry::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        generate_level(&tuning, &progress, &mut registry, &mut rng);

        let (bounds, player) = registry.player().expect("player");
        assert_eq!(bounds.center(), Vec2::new(1200.0, 700.0));
        assert_eq!(player.capacity, 15);
        assert!(player.has_tractor);
        let drone = registry
            .iter_category(EntityCategory::Drone)
            .next()
            .expect("drone");
        assert_eq!(drone.kind.label(), "advanced_drone");
    }

    #[test]
    fn same_seed_same_layout() {
        let tuning = LevelTuning::from_def(&forest_def()).expect("tuning");
        let layout_of = |seed: u64| {
            let mut registry = EntityRegistry::default();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            generate_level(&tuning, &PlayerProgress::default(), &mut registry, &mut rng);
            registry
                .iter()
                .map(|entity| (entity.kind.label(), entity.bounds))
                .collect::<Vec<_>>()
        };
        assert_eq!(layout_of(5), layout_of(5));
        assert_ne!(layout_of(5), layout_of(6));
    }
}
