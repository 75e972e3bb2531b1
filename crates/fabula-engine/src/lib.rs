//! Runtime for Fabula: entities, events, rules, and timed work.
//!
//! This crate is the data model and execution core that the DSL compiles
//! into. It knows nothing about source text; you can build a [`World`]
//! and its rules programmatically, or let `fabula-dsl` produce them from
//! declarations.

/// Actions performed when rules fire, plus template rendering.
pub mod action;
/// Alias-indexed child collections.
pub mod children;
/// Typed components (rooms, containers, inventories, rule stores).
pub mod component;
/// Predicates checked before a rule fires.
pub mod condition;
/// Entity types and identifiers.
pub mod entity;
/// Error types used throughout the crate.
pub mod error;
/// Events, roles, and the per-dispatch context.
pub mod event;
/// The expression language for conditions and field values.
pub mod expr;
/// Rules and event dispatch.
pub mod rule;
/// The min-heap of pending timed jobs.
pub mod scheduler;
/// The tagged value model for entity fields.
pub mod value;
/// The arena that owns every entity.
pub mod world;

/// Re-export the action type.
pub use action::Action;
/// Re-export the condition type.
pub use condition::Condition;
/// Re-export core entity types.
pub use entity::{Entity, EntityId, ParentLink};
/// Re-export error types.
pub use error::{EngineError, EngineResult};
/// Re-export event types.
pub use event::{Event, EventRole, Publisher, RunCtx};
/// Re-export the expression tree.
pub use expr::Expr;
/// Re-export the rule type.
pub use rule::Rule;
/// Re-export the scheduler.
pub use scheduler::{JobWork, Scheduler};
/// Re-export the value model.
pub use value::Value;
/// Re-export the world arena.
pub use world::World;
