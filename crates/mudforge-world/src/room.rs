//! Rooms: the places players and mobs stand in.

use std::collections::BTreeMap;

use mudforge_protocol::RoomId;
use serde::{Deserialize, Serialize};

use crate::Item;

/// One location in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Direction → destination. A `BTreeMap` so exits always list in
    /// the same order.
    #[serde(default)]
    pub exits: BTreeMap<String, RoomId>,
    /// Items lying on the floor, oldest first.
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Room {
    pub fn new(id: impl Into<RoomId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            exits: BTreeMap::new(),
            items: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_exit(mut self, direction: impl Into<String>, to: impl Into<RoomId>) -> Self {
        self.exits.insert(direction.into(), to.into());
        self
    }

    pub fn add_items<I: IntoIterator<Item = Item>>(&mut self, items: I) {
        self.items.extend(items);
    }

    /// Name on the first line, description on the second.
    pub fn render(&self) -> String {
        format!("{}\n{}", self.name, self.description)
    }
}
