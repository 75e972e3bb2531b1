use std::sync::Arc;

use crate::action::Action;
use crate::condition::Condition;
use crate::entity::EntityId;
use crate::error::EngineResult;
use crate::event::{Event, RunCtx};

/// A compiled when/then pair. Immutable once built; shared between
/// entity copies and scheduler jobs via `Arc`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rule {
    /// Conditions, all of which must hold, checked left to right.
    pub when: Vec<Condition>,
    /// Actions run in order once the conditions hold.
    pub then: Vec<Action>,
}

impl Rule {
    /// Build a rule from its condition and action lists.
    pub fn new(when: Vec<Condition>, then: Vec<Action>) -> Self {
        Self { when, then }
    }

    /// Whether every condition holds for this event. Short-circuits on
    /// the first false; a condition error aborts the whole check.
    pub fn matches(&self, ev: &Event, ctx: &mut RunCtx<'_>) -> EngineResult<bool> {
        for cond in &self.when {
            if !cond.check(ev, ctx)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Run every action in order. Stops at the first failing action.
    pub fn run(&self, ev: &Event, ctx: &mut RunCtx<'_>) -> EngineResult<()> {
        for action in &self.then {
            action.execute(ev, ctx)?;
        }
        Ok(())
    }
}

/// Deliver an event to one entity's rules.
///
/// Rules registered for the event kind are tried in declared order. The
/// first rule whose conditions all hold runs its actions and ends the
/// dispatch; later rules never fire for the same event. Returns whether
/// any rule fired. An entity without rules simply ignores the event.
pub fn dispatch(target: EntityId, ev: &Event, ctx: &mut RunCtx<'_>) -> EngineResult<bool> {
    let rules: Vec<Arc<Rule>> = {
        let entity = ctx.world.get(target)?;
        match &entity.components.eventful {
            Some(eventful) => eventful.rules_for(&ev.kind).to_vec(),
            None => return Ok(false),
        }
    };

    for rule in rules {
        if rule.matches(ev, ctx)? {
            rule.run(ev, ctx)?;
            return Ok(true);
        }
    }
    Ok(false)
}
