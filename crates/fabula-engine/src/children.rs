use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

/// Alias-indexed collection of child entities held by a component.
///
/// Two mutually derived indexes keep lookup and removal near O(1):
/// alias -> child and child -> aliases. Every alias of a present child is
/// indexed; removing a child removes all of its aliases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Children {
    child_by_alias: HashMap<String, EntityId>,
    aliases_of: HashMap<EntityId, Vec<String>>,
    /// Gates whether an ancestor's recursive alias lookup descends into
    /// this collection, and whether descriptions list its contents.
    pub revealed: bool,
    /// Heading used when describing the collection's contents.
    pub prefix: String,
}

impl Children {
    /// Create an empty, revealed collection with the given heading.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            child_by_alias: HashMap::new(),
            aliases_of: HashMap::new(),
            revealed: true,
            prefix: prefix.into(),
        }
    }

    /// Index a child under each of its aliases. A child with no aliases is
    /// not indexed at all (it cannot be referred to).
    pub fn insert(&mut self, child: EntityId, aliases: &[String]) {
        if aliases.is_empty() {
            return;
        }
        let entry = self.aliases_of.entry(child).or_default();
        for alias in aliases {
            entry.push(alias.clone());
            self.child_by_alias.insert(alias.clone(), child);
        }
    }

    /// Remove a child and every alias pointing at it.
    pub fn remove(&mut self, child: EntityId) {
        let Some(aliases) = self.aliases_of.remove(&child) else {
            return;
        };
        for alias in aliases {
            // only unmap the alias if it still points at this child;
            // a later insert may have claimed the same word
            if self.child_by_alias.get(&alias) == Some(&child) {
                self.child_by_alias.remove(&alias);
            }
        }
    }

    /// Direct (non-recursive) alias lookup.
    pub fn by_alias(&self, alias: &str) -> Option<EntityId> {
        self.child_by_alias.get(alias).copied()
    }

    /// Whether the entity is held in this collection.
    pub fn contains(&self, child: EntityId) -> bool {
        self.aliases_of.contains_key(&child)
    }

    /// All children currently held.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.aliases_of.keys().copied()
    }

    /// Number of children held.
    pub fn len(&self) -> usize {
        self.aliases_of.len()
    }

    /// Whether the collection holds no children.
    pub fn is_empty(&self) -> bool {
        self.aliases_of.is_empty()
    }
}

impl Default for Children {
    fn default() -> Self {
        Self::new("")
    }
}
