//! Items and weapons.

use serde::{Deserialize, Serialize};

fn default_weight() -> f32 {
    1.0
}

/// Something that can lie in a room or sit in an inventory.
///
/// An item with `damage` set can be wielded; see [`Item::as_weapon`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_weight")]
    pub weight: f32,
    /// Points awarded when the item is swamped.
    #[serde(default)]
    pub value: u32,
    #[serde(default)]
    pub damage: Option<u32>,
}

impl Item {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            weight: default_weight(),
            value: 0,
            damage: None,
        }
    }

    /// Builder-style setter for weapon damage.
    pub fn with_damage(mut self, damage: u32) -> Self {
        self.damage = Some(damage);
        self
    }

    /// The weapon view of this item, if it can be wielded.
    pub fn as_weapon(&self) -> Option<Weapon> {
        self.damage.map(|damage| Weapon {
            item_id: self.id.clone(),
            name: self.name.clone(),
            damage,
        })
    }
}

/// The combat-relevant part of a wielded item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    pub item_id: String,
    pub name: String,
    /// Flat bonus added to the wielder's strength-derived damage.
    pub damage: u32,
}
