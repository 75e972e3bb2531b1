use serde::{Deserialize, Serialize};

use crate::component::ComponentKind;
use crate::entity::EntityId;
use crate::error::{EngineError, EngineResult};
use crate::event::{Event, EventRole, RunCtx};
use crate::expr::Expr;
use crate::value::Value;

/// A predicate over an event, checked before a rule's actions run.
///
/// The set is closed: every condition the compiler can emit is a variant
/// here, so dispatch is a plain match with no dynamic lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// The role's entity carries the tag. An unfilled role is simply
    /// false, not an error.
    HasTag {
        /// Which event slot to inspect.
        role: EventRole,
        /// The tag to look for.
        tag: String,
    },
    /// The role is filled at all.
    IsPresent {
        /// Which event slot to inspect.
        role: EventRole,
    },
    /// Two roles resolve to the same entity. Two unfilled roles count
    /// as equal.
    RolesEqual {
        /// First slot.
        left: EventRole,
        /// Second slot.
        right: EventRole,
    },
    /// The child role's entity sits inside the given component of the
    /// parent role's entity. The parent must carry the component.
    HasChild {
        /// Slot holding the would-be parent.
        parent: EventRole,
        /// Which child-bearing component to look in.
        component: ComponentKind,
        /// Slot holding the would-be child.
        child: EventRole,
    },
    /// The event message contains the needle, case-insensitively. An
    /// empty or missing message never matches.
    MessageContains {
        /// Substring to search for.
        needle: String,
    },
    /// An expression that must evaluate to a bool.
    ExprTrue(Expr),
    /// Logical negation.
    Not(Box<Condition>),
    /// Logical disjunction, short-circuiting.
    Or(Box<Condition>, Box<Condition>),
}

impl Condition {
    /// Check the condition against an event.
    pub fn check(&self, ev: &Event, ctx: &mut RunCtx<'_>) -> EngineResult<bool> {
        match self {
            Condition::HasTag { role, tag } => {
                let Some(id) = entity_role(*role, ev, "has tag condition")? else {
                    return Ok(false);
                };
                Ok(ctx.world.get(id)?.has_tag(tag))
            }
            Condition::IsPresent { role } => {
                Ok(entity_role(*role, ev, "is present condition")?.is_some())
            }
            Condition::RolesEqual { left, right } => {
                let a = entity_role(*left, ev, "roles equal condition")?;
                let b = entity_role(*right, ev, "roles equal condition")?;
                Ok(a == b)
            }
            Condition::HasChild {
                parent,
                component,
                child,
            } => {
                let parent_id = ev.require_role(*parent, "has child condition")?;
                let child_id = ev.require_role(*child, "has child condition")?;
                let entity = ctx.world.get(parent_id)?;
                let children = entity.components.children(*component).ok_or_else(|| {
                    EngineError::MissingComponent {
                        entity: entity.name.clone(),
                        component: *component,
                    }
                })?;
                Ok(children.contains(child_id))
            }
            Condition::MessageContains { needle } => {
                let Some(message) = ev.message.as_deref() else {
                    return Ok(false);
                };
                if message.is_empty() {
                    return Ok(false);
                }
                Ok(message.to_lowercase().contains(&needle.to_lowercase()))
            }
            Condition::ExprTrue(expr) => match expr.eval(ev, ctx)? {
                Value::Bool(b) => Ok(b),
                other => Err(EngineError::NonBoolCondition(other.kind())),
            },
            Condition::Not(inner) => Ok(!inner.check(ev, ctx)?),
            Condition::Or(a, b) => {
                if a.check(ev, ctx)? {
                    return Ok(true);
                }
                b.check(ev, ctx)
            }
        }
    }
}

/// Resolve a role that must name an entity slot. The message role is
/// invalid here; an unfilled slot is `None`.
fn entity_role(
    role: EventRole,
    ev: &Event,
    context: &'static str,
) -> EngineResult<Option<EntityId>> {
    if role == EventRole::Message {
        return Err(EngineError::InvalidRole { role, context });
    }
    Ok(ev.role(role))
}
