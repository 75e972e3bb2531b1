use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::component::{ComponentKind, ComponentSet};
use crate::value::Value;

/// Unique identifier for every entity in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Generate a new random entity ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Non-owning back-reference from a child to the collection that holds it.
///
/// The `Children` collection on the named component owns the entity
/// downward; the entity owns nothing upward, so this is a plain index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLink {
    /// The entity holding the child-bearing component.
    pub entity: EntityId,
    /// Which of the parent's components contains this child.
    pub component: ComponentKind,
}

/// A node in the runtime graph. Every world object is an Entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier for this entity.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Alias words players may refer to this entity by.
    pub aliases: Vec<String>,
    /// Tags for rule conditions.
    pub tags: Vec<String>,
    /// Mutable named fields, written by SetField actions.
    pub fields: HashMap<String, Value>,
    /// Back-reference into the owning Children collection, if attached.
    /// Never carried across a copy.
    pub parent: Option<ParentLink>,
    /// Typed component data attached to this entity.
    pub components: ComponentSet,
}

impl Entity {
    /// Create a detached entity with a random ID and no components.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            description: description.into(),
            aliases: Vec::new(),
            tags: Vec::new(),
            fields: HashMap::new(),
            parent: None,
            components: ComponentSet::default(),
        }
    }

    /// Add an alias (builder style).
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Add a tag (builder style).
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Returns true if the entity carries the given tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Read a field, yielding `Nil` when the field was never set.
    pub fn field(&self, name: &str) -> Value {
        self.fields.get(name).cloned().unwrap_or(Value::Nil)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_display_shows_short_form() {
        let id = EntityId(Uuid::parse_str("a3f2b1c8-1234-5678-9abc-def012345678").unwrap());
        assert_eq!(id.to_string(), "a3f2b1c8");
    }

    #[test]
    fn missing_field_reads_nil() {
        let e = Entity::new("Orb", "A mysterious orb");
        assert_eq!(e.field("charges"), Value::Nil);
    }

    #[test]
    fn tags_and_aliases() {
        let e = Entity::new("Orb", "A mysterious orb")
            .with_alias("orb")
            .with_tag("magical");
        assert!(e.has_tag("magical"));
        assert!(!e.has_tag("mundane"));
        assert_eq!(e.aliases, vec!["orb"]);
    }
}
