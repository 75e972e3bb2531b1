use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::error::{EngineError, EngineResult};
use crate::scheduler::Scheduler;
use crate::world::World;

/// The grammatical slot an entity fills in an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventRole {
    /// The entity that caused the event.
    Source,
    /// The tool or item the source acted with.
    Instrument,
    /// The entity acted upon.
    Target,
    /// The room the event happened in.
    Room,
    /// The free-text payload of the event.
    Message,
}

impl EventRole {
    /// Parse a role from its declaration name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "source" => Some(Self::Source),
            "instrument" => Some(Self::Instrument),
            "target" => Some(Self::Target),
            "room" => Some(Self::Room),
            "message" => Some(Self::Message),
            _ => None,
        }
    }
}

impl fmt::Display for EventRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Source => "source",
            Self::Instrument => "instrument",
            Self::Target => "target",
            Self::Room => "room",
            Self::Message => "message",
        };
        write!(f, "{name}")
    }
}

/// A single occurrence flowing through the rule engine.
///
/// Events are pure data; the handles needed to react to one travel in
/// [`RunCtx`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Event {
    /// Event kind, matched against rule registrations ("poke", "tick").
    pub kind: String,
    /// Who caused it.
    pub source: Option<EntityId>,
    /// What it was done with.
    pub instrument: Option<EntityId>,
    /// Who it was done to.
    pub target: Option<EntityId>,
    /// Where it happened.
    pub room: Option<EntityId>,
    /// Free-text payload, for say/shout style events.
    pub message: Option<String>,
}

impl Event {
    /// A new event of the given kind with no roles filled.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// The entity filling a role, if any. The message role never
    /// resolves to an entity.
    pub fn role(&self, role: EventRole) -> Option<EntityId> {
        match role {
            EventRole::Source => self.source,
            EventRole::Instrument => self.instrument,
            EventRole::Target => self.target,
            EventRole::Room => self.room,
            EventRole::Message => None,
        }
    }

    /// The entity filling a role, or an error naming the caller's
    /// context when the slot is empty.
    pub fn require_role(&self, role: EventRole, context: &'static str) -> EngineResult<EntityId> {
        if role == EventRole::Message {
            return Err(EngineError::InvalidRole { role, context });
        }
        self.role(role).ok_or(EngineError::EmptyRole { role, context })
    }
}

/// Delivers rendered text to players without coupling the engine to a
/// transport.
pub trait Publisher {
    /// Broadcast `text` to everyone in `room` except the listed entities.
    fn publish(&mut self, world: &World, room: EntityId, text: &str, exclude: &[EntityId]);

    /// Deliver `text` to a single recipient, with the room for context
    /// when the event carries one.
    fn publish_to(
        &mut self,
        world: &World,
        room: Option<EntityId>,
        recipient: EntityId,
        text: &str,
    );
}

/// Collects published lines in memory. The test transport, and a useful
/// default for headless runs.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    /// Everything published, in order, as `(recipient, text)` pairs where
    /// a broadcast records a `None` recipient.
    pub lines: Vec<(Option<EntityId>, String)>,
}

impl Publisher for RecordingPublisher {
    fn publish(&mut self, _world: &World, _room: EntityId, text: &str, _exclude: &[EntityId]) {
        self.lines.push((None, text.to_string()));
    }

    fn publish_to(
        &mut self,
        _world: &World,
        _room: Option<EntityId>,
        recipient: EntityId,
        text: &str,
    ) {
        self.lines.push((Some(recipient), text.to_string()));
    }
}

/// Everything a condition or action may touch while reacting to an event.
///
/// Borrowed mutably for the length of one dispatch; the event itself
/// stays immutable.
pub struct RunCtx<'a> {
    /// The entity arena.
    pub world: &'a mut World,
    /// Text output transport.
    pub publisher: &'a mut dyn Publisher,
    /// Pending timed work.
    pub scheduler: &'a mut Scheduler,
    /// The compiler's entity-name table, for copy-from-catalog actions.
    pub catalog: &'a HashMap<String, EntityId>,
    /// Randomness source for dice expressions.
    pub rng: &'a mut StdRng,
    /// The current instant, injected so tests control time.
    pub now: DateTime<Utc>,
}
