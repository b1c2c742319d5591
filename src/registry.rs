//! Item registry
//!
//! The registry exclusively owns every [`Item`]. Everything else refers to
//! items through their [`ItemId`], which is the arena index and stays stable
//! for the lifetime of one configuration.

use std::collections::HashMap;

use crate::item::{Item, ItemId, ItemKind};

#[derive(Debug, Clone, Default)]
pub struct Registry {
    items: Vec<Item>,

    /// Unique name (`host` or `host/description`) to id
    index: HashMap<String, ItemId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an item in place and return its id
    ///
    /// Returns `None` when the name is already taken.
    pub fn create(
        &mut self,
        kind: ItemKind,
        host_name: &str,
        description: Option<&str>,
    ) -> Option<ItemId> {
        let id = ItemId(self.items.len());
        let item = Item::new(id, kind, host_name, description);
        if self.index.contains_key(&item.name) {
            return None;
        }

        self.index.insert(item.name.clone(), id);
        self.items.push(item);
        Some(id)
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id.0)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(id.0)
    }

    /// Look up an item by its unique name
    pub fn resolve(&self, name: &str) -> Option<ItemId> {
        self.index.get(name).copied()
    }

    pub fn find_host(&self, host_name: &str) -> Option<ItemId> {
        self.resolve(host_name)
            .filter(|id| self.items[id.0].kind == ItemKind::Host)
    }

    /// Services and meta items are both addressed as `host/description`
    pub fn find_service(&self, host_name: &str, description: &str) -> Option<ItemId> {
        self.resolve(&format!("{host_name}/{description}"))
            .filter(|id| self.items[id.0].kind != ItemKind::Host)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Item> {
        self.items.iter_mut()
    }

    pub fn ids(&self) -> impl Iterator<Item = ItemId> + use<> {
        (0..self.items.len()).map(ItemId)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
