//! Mob templates: the blueprints `World::spawn_mob` stamps mobs from.
//!
//! Templates are plain data and load from JSON:
//!
//! ```
//! use mudforge_world::load_templates;
//!
//! let templates = load_templates(r#"{
//!     "wolf": {
//!         "name": "grey wolf",
//!         "aggressive": true,
//!         "aggro_delay_min": 2,
//!         "aggro_delay_max": 4,
//!         "loot_table": [
//!             { "item": { "id": "pelt", "name": "wolf pelt" }, "chance": 0.5 }
//!         ]
//!     }
//! }"#).unwrap();
//!
//! assert_eq!(templates["wolf"].strength, 20);
//! ```

use std::collections::BTreeMap;

use mudforge_protocol::RoomId;
use serde::{Deserialize, Serialize};

use crate::{Item, WorldError};

fn default_stat() -> u32 {
    20
}

fn default_max_stamina() -> i32 {
    100
}

fn default_damage() -> u32 {
    5
}

fn default_movement_interval() -> u64 {
    10
}

fn default_pronouns() -> String {
    "it".to_string()
}

/// One row of a loot table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootEntry {
    pub item: Item,
    /// Drop probability, 0.0–1.0.
    pub chance: f64,
}

/// Everything needed to spawn a mob, minus where and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobTemplate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_stat")]
    pub strength: u32,
    #[serde(default = "default_stat")]
    pub dexterity: u32,
    #[serde(default = "default_max_stamina")]
    pub max_stamina: i32,
    /// Flat damage bonus the mob adds to every hit.
    #[serde(default = "default_damage")]
    pub damage: u32,
    #[serde(default)]
    pub aggressive: bool,
    /// Ticks (inclusive range) before a freshly spawned or freshly
    /// arrived aggressive mob is ready to attack.
    #[serde(default)]
    pub aggro_delay_min: u32,
    #[serde(default)]
    pub aggro_delay_max: u32,
    /// Rooms visited in order, wrapping around. Fewer than two means the
    /// mob stays put.
    #[serde(default)]
    pub patrol_rooms: Vec<RoomId>,
    /// Ticks between patrol moves.
    #[serde(default = "default_movement_interval")]
    pub movement_interval: u64,
    #[serde(default)]
    pub loot_table: Vec<LootEntry>,
    /// Dies to any hit, whatever the damage.
    #[serde(default)]
    pub instant_death: bool,
    /// Points awarded to whoever kills it.
    #[serde(default)]
    pub point_value: u32,
    #[serde(default = "default_pronouns")]
    pub pronouns: String,
}

impl MobTemplate {
    /// A template with every optional field at its default.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            strength: default_stat(),
            dexterity: default_stat(),
            max_stamina: default_max_stamina(),
            damage: default_damage(),
            aggressive: false,
            aggro_delay_min: 0,
            aggro_delay_max: 0,
            patrol_rooms: Vec::new(),
            movement_interval: default_movement_interval(),
            loot_table: Vec::new(),
            instant_death: false,
            point_value: 0,
            pronouns: default_pronouns(),
        }
    }
}

/// Parses a JSON object of `template id → template`.
pub fn load_templates(json: &str) -> Result<BTreeMap<String, MobTemplate>, WorldError> {
    let templates: BTreeMap<String, MobTemplate> = serde_json::from_str(json)?;
    tracing::info!(count = templates.len(), "mob templates loaded");
    Ok(templates)
}
