/// Per-level tuning as authored in `<LevelDef>`. Material and obstacle names
/// stay as tokens here; the game maps them onto its own types.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelDef {
    pub number: u32,
    pub label: String,
    pub litter_cooldown_ticks: u32,
    pub litter_spawn_cap: u32,
    pub litterer_min: u32,
    pub litterer_max: u32,
    pub initial_items: u32,
    pub item_materials: Vec<String>,
    pub obstacle_kinds: Vec<String>,
    pub obstacle_count: u32,
    pub obstacle_min_spacing: Option<f32>,
    pub poison_plants: u32,
    pub has_river: bool,
    pub has_quests: bool,
    pub special_collector_chance: f32,
    pub starts_with_drone: bool,
}

#[derive(Debug, Default, Clone)]
pub struct LevelDatabase {
    levels: Vec<LevelDef>,
    fingerprint_sha256_hex: String,
}

impl LevelDatabase {
    pub(crate) fn from_levels(mut levels: Vec<LevelDef>, fingerprint_sha256_hex: String) -> Self {
        levels.sort_by_key(|level| level.number);
        Self {
            levels,
            fingerprint_sha256_hex,
        }
    }

    pub fn level(&self, number: u32) -> Option<&LevelDef> {
        self.levels
            .binary_search_by_key(&number, |level| level.number)
            .ok()
            .map(|index| &self.levels[index])
    }

    pub fn first_level(&self) -> Option<&LevelDef> {
        self.levels.first()
    }

    /// The next authored level after `number`, skipping gaps in numbering.
    pub fn next_level_after(&self, number: u32) -> Option<&LevelDef> {
        self.levels.iter().find(|level| level.number > number)
    }

    pub fn levels(&self) -> &[LevelDef] {
        &self.levels
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint_sha256_hex
    }
}
