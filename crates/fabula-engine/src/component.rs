use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::children::Children;
use crate::rule::Rule;

/// Names the component types an entity may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Compile-time name/description/aliases/tags bundle; its data is
    /// folded onto the entity itself.
    Identity,
    /// A place with exits and visible contents.
    Room,
    /// A generic child-bearing holder.
    Container,
    /// Carried items.
    Inventory,
    /// The compiled rule list reacting to events.
    Eventful,
}

impl ComponentKind {
    /// Parse a component kind from its declaration name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Identity" | "identity" => Some(Self::Identity),
            "Room" | "room" => Some(Self::Room),
            "Container" | "container" => Some(Self::Container),
            "Inventory" | "inventory" => Some(Self::Inventory),
            "Eventful" | "eventful" => Some(Self::Eventful),
            _ => None,
        }
    }

    /// Whether this component type owns a Children collection.
    pub fn child_bearing(self) -> bool {
        matches!(self, Self::Room | Self::Container | Self::Inventory)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Identity => "Identity",
            Self::Room => "Room",
            Self::Container => "Container",
            Self::Inventory => "Inventory",
            Self::Eventful => "Eventful",
        };
        write!(f, "{name}")
    }
}

/// A place entities occupy. Child-bearing, plus a direction -> room-name
/// exit map resolved by the out-of-scope movement layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Direction word -> destination entity name.
    pub exits: HashMap<String, String>,
    /// Entities present in the room.
    pub children: Children,
}

impl Room {
    /// An empty room with the default contents heading.
    pub fn new() -> Self {
        Self {
            exits: HashMap::new(),
            children: Children::new("In the room"),
        }
    }
}

impl Default for Room {
    fn default() -> Self {
        Self::new()
    }
}

/// A generic child-bearing holder (a chest, a bag, a bookshelf).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    /// Entities inside the container.
    pub children: Children,
}

impl Container {
    /// An empty container with the default contents heading.
    pub fn new() -> Self {
        Self {
            children: Children::new("Inside"),
        }
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

/// Items carried by an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
    /// The carried entities.
    pub children: Children,
}

impl Inventory {
    /// An empty inventory with the default contents heading.
    pub fn new() -> Self {
        Self {
            children: Children::new("Carrying"),
        }
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new()
    }
}

/// The compiled rule lists of an entity, keyed by event kind.
///
/// Rules are immutable after compile and shared between copies of an
/// entity, so the store holds them behind `Arc`.
#[derive(Debug, Clone, Default)]
pub struct Eventful {
    rules: HashMap<String, Vec<Arc<Rule>>>,
}

impl Eventful {
    /// An empty rule store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule for an event kind, after any already registered.
    pub fn add_rule(&mut self, event: impl Into<String>, rule: Arc<Rule>) {
        self.rules.entry(event.into()).or_default().push(rule);
    }

    /// The rules registered for an event kind, in declared order.
    pub fn rules_for(&self, event: &str) -> &[Arc<Rule>] {
        self.rules.get(event).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Event kinds this entity reacts to.
    pub fn event_kinds(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Total number of rules across all event kinds.
    pub fn rule_count(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }
}

/// The set of typed components attached to an entity.
///
/// An entity holds at most one instance per component type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentSet {
    /// A place with exits and contents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<Room>,
    /// A generic holder of entities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<Container>,
    /// Carried items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory: Option<Inventory>,
    /// Compiled reaction rules. Not serialized; rules are rebuilt by the
    /// compiler, never persisted.
    #[serde(skip)]
    pub eventful: Option<Eventful>,
}

impl ComponentSet {
    /// Borrow the Children collection of a child-bearing component.
    pub fn children(&self, kind: ComponentKind) -> Option<&Children> {
        match kind {
            ComponentKind::Room => self.room.as_ref().map(|r| &r.children),
            ComponentKind::Container => self.container.as_ref().map(|c| &c.children),
            ComponentKind::Inventory => self.inventory.as_ref().map(|i| &i.children),
            ComponentKind::Identity | ComponentKind::Eventful => None,
        }
    }

    /// Mutably borrow the Children collection of a child-bearing component.
    pub fn children_mut(&mut self, kind: ComponentKind) -> Option<&mut Children> {
        match kind {
            ComponentKind::Room => self.room.as_mut().map(|r| &mut r.children),
            ComponentKind::Container => self.container.as_mut().map(|c| &mut c.children),
            ComponentKind::Inventory => self.inventory.as_mut().map(|i| &mut i.children),
            ComponentKind::Identity | ComponentKind::Eventful => None,
        }
    }

    /// The child-bearing component kinds present on this set.
    pub fn child_bearing_kinds(&self) -> Vec<ComponentKind> {
        let mut kinds = Vec::new();
        if self.room.is_some() {
            kinds.push(ComponentKind::Room);
        }
        if self.container.is_some() {
            kinds.push(ComponentKind::Container);
        }
        if self.inventory.is_some() {
            kinds.push(ComponentKind::Inventory);
        }
        kinds
    }
}
