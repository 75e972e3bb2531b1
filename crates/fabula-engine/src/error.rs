use crate::component::ComponentKind;
use crate::entity::EntityId;
use crate::event::EventRole;

/// Alias for `Result<T, EngineError>`.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised by expression evaluation, condition checks, and actions.
///
/// All of these surface to the caller of a dispatch as ordinary errors;
/// an authoring mistake (a missing role, a type mismatch) must never panic.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The requested entity ID does not exist in the world.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// A role that cannot be used in this position.
    #[error("invalid role '{role}' for {context}")]
    InvalidRole {
        /// The offending role.
        role: EventRole,
        /// What was being evaluated (action or condition name).
        context: &'static str,
    },

    /// A role that is valid here but carries no entity on this event.
    #[error("role '{role}' is empty for {context}")]
    EmptyRole {
        /// The unresolved role.
        role: EventRole,
        /// What was being evaluated.
        context: &'static str,
    },

    /// The resolved entity lacks a required child-bearing component.
    #[error("entity '{entity}' has no {component} component")]
    MissingComponent {
        /// Name of the entity that was inspected.
        entity: String,
        /// The component kind that was required.
        component: ComponentKind,
    },

    /// An attach that would make an entity an ancestor of itself.
    #[error("'{entity}' cannot contain itself")]
    ContainmentCycle {
        /// The entity that would become its own ancestor.
        entity: String,
    },

    /// A copy-by-name referenced an entity absent from the catalog.
    #[error("no entity named '{0}' to copy")]
    UnknownCatalogEntity(String),

    /// An operator was applied to operands of the wrong kind.
    #[error("{op} expects {expected}, got {got}")]
    TypeMismatch {
        /// The operator or construct.
        op: &'static str,
        /// What it accepts.
        expected: &'static str,
        /// The kind(s) actually supplied.
        got: &'static str,
    },

    /// Integer division by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// A dice roll with a non-positive count or sides below one.
    #[error("invalid dice roll: {count} d {sides}")]
    InvalidDice {
        /// Number of dice requested.
        count: i64,
        /// Sides per die requested.
        sides: i64,
    },

    /// The expression source could not be parsed.
    #[error("expression parse error: {0}")]
    ExprParse(String),

    /// An expression that must be constant referenced event state.
    #[error("expression is not constant: {0}")]
    NotConstant(&'static str),

    /// A condition expression did not evaluate to a boolean.
    #[error("condition expression evaluated to {0}, expected bool")]
    NonBoolCondition(&'static str),
}
