use std::sync::Arc;

use chrono::Duration;

use crate::component::ComponentKind;
use crate::entity::EntityId;
use crate::error::{EngineError, EngineResult};
use crate::event::{Event, EventRole, RunCtx};
use crate::expr::Expr;
use crate::rule::Rule;
use crate::scheduler::JobWork;
use crate::value::Value;
use crate::world::World;

/// A state change performed when a rule fires.
///
/// Like [`Condition`](crate::condition::Condition), the set is closed;
/// the compiler maps declaration names onto these variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Render the template and deliver it to the resolved recipient.
    Print {
        /// Slot holding the recipient.
        role: EventRole,
        /// Template text, `{placeholder}` substituted at execute time.
        text: String,
    },
    /// Render the template and broadcast it to the event room, excluding
    /// the entities already involved in the event.
    Publish {
        /// Template text.
        text: String,
    },
    /// Deep-copy a catalog entity into the recipient's component.
    Copy {
        /// Catalog name of the entity to copy.
        entity: String,
        /// Slot holding the recipient.
        role: EventRole,
        /// Which child-bearing component receives the copy.
        component: ComponentKind,
    },
    /// Detach the object from its parent and attach it under the
    /// destination's component.
    Move {
        /// Slot holding the entity to move.
        object: EventRole,
        /// Slot holding the new parent.
        destination: EventRole,
        /// Which component of the destination takes the object.
        component: ComponentKind,
    },
    /// Detach the resolved entity from its parent. The entity itself
    /// stays in the world, just unreachable from the tree.
    Destroy {
        /// Slot holding the entity to remove.
        role: EventRole,
    },
    /// Evaluate the expression and write the result into the resolved
    /// entity's field map.
    SetField {
        /// Slot holding the entity to write to.
        role: EventRole,
        /// Field name.
        field: String,
        /// Value expression, evaluated per execution.
        value: Expr,
    },
    /// Toggle the revealed flag on a child collection.
    RevealChildren {
        /// Slot holding the owning entity.
        role: EventRole,
        /// Which child-bearing component to toggle.
        component: ComponentKind,
        /// New revealed state.
        reveal: bool,
    },
    /// Enqueue a one-shot job running the actions after the delay.
    ScheduleOnce {
        /// How long to wait.
        delay: Duration,
        /// Actions to run, shared with any already-queued copies.
        actions: Arc<[Action]>,
    },
    /// Enqueue a self-renewing job re-checking the rule every interval.
    ScheduleRepeating {
        /// Interval between runs.
        every: Duration,
        /// The rule to re-check and run.
        rule: Arc<Rule>,
    },
}

impl Action {
    /// Execute the action against an event.
    pub fn execute(&self, ev: &Event, ctx: &mut RunCtx<'_>) -> EngineResult<()> {
        match self {
            Action::Print { role, text } => {
                let recipient = ev.require_role(*role, "print action")?;
                let message = render(text, ev, ctx.world);
                // Direct delivery works on roomless events too, e.g. a
                // scheduled message to a carried item's owner.
                ctx.publisher.publish_to(ctx.world, ev.room, recipient, &message);
                Ok(())
            }
            Action::Publish { text } => {
                let room = ev.require_role(EventRole::Room, "publish action")?;
                let message = render(text, ev, ctx.world);
                let exclude: Vec<_> = [ev.source, ev.instrument, ev.target]
                    .into_iter()
                    .flatten()
                    .collect();
                ctx.publisher.publish(ctx.world, room, &message, &exclude);
                Ok(())
            }
            Action::Copy {
                entity,
                role,
                component,
            } => {
                let recipient = ev.require_role(*role, "copy action")?;
                let original = *ctx
                    .catalog
                    .get(entity)
                    .ok_or_else(|| EngineError::UnknownCatalogEntity(entity.clone()))?;
                require_children(ctx.world, recipient, *component)?;
                let copy = ctx.world.deep_copy(original)?;
                ctx.world.attach(recipient, *component, copy)
            }
            Action::Move {
                object,
                destination,
                component,
            } => {
                let object = ev.require_role(*object, "move action")?;
                let destination = ev.require_role(*destination, "move action")?;
                require_children(ctx.world, destination, *component)?;
                ctx.world.attach(destination, *component, object)
            }
            Action::Destroy { role } => {
                let id = ev.require_role(*role, "destroy action")?;
                ctx.world.detach(id)
            }
            Action::SetField { role, field, value } => {
                let id = ev.require_role(*role, "set field action")?;
                let result = value.eval(ev, ctx)?;
                ctx.world.get_mut(id)?.fields.insert(field.clone(), result);
                Ok(())
            }
            Action::RevealChildren {
                role,
                component,
                reveal,
            } => {
                let id = ev.require_role(*role, "reveal children action")?;
                let entity = ctx.world.get_mut(id)?;
                let name = entity.name.clone();
                let children = entity.components.children_mut(*component).ok_or(
                    EngineError::MissingComponent {
                        entity: name,
                        component: *component,
                    },
                )?;
                children.revealed = *reveal;
                Ok(())
            }
            Action::ScheduleOnce { delay, actions } => {
                ctx.scheduler.add(
                    ctx.now + *delay,
                    ev.clone(),
                    JobWork::Once(Arc::clone(actions)),
                );
                Ok(())
            }
            Action::ScheduleRepeating { every, rule } => {
                ctx.scheduler.add(
                    ctx.now + *every,
                    ev.clone(),
                    JobWork::Repeating {
                        every: *every,
                        rule: Arc::clone(rule),
                    },
                );
                Ok(())
            }
        }
    }
}

fn require_children(world: &World, id: EntityId, kind: ComponentKind) -> EngineResult<()> {
    let entity = world.get(id)?;
    if entity.components.children(kind).is_none() {
        return Err(EngineError::MissingComponent {
            entity: entity.name.clone(),
            component: kind,
        });
    }
    Ok(())
}

/// Substitute `{placeholder}` markers in a template.
///
/// Known placeholders are the entity roles (names), `{role.field}` for
/// scalar field values and `{message}` for the event text. Unknown or
/// unresolvable placeholders stay verbatim, and `{{`/`}}` escape to
/// literal braces.
pub fn render(template: &str, ev: &Event, world: &World) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(['{', '}']) {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(stripped) = tail.strip_prefix("{{") {
            out.push('{');
            rest = stripped;
            continue;
        }
        if let Some(stripped) = tail.strip_prefix("}}") {
            out.push('}');
            rest = stripped;
            continue;
        }
        if tail.starts_with('}') {
            out.push('}');
            rest = &tail[1..];
            continue;
        }
        let Some(end) = tail.find('}') else {
            out.push_str(tail);
            return out;
        };
        let key = &tail[1..end];
        match resolve_placeholder(key, ev, world) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&tail[..=end]),
        }
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    out
}

fn resolve_placeholder(key: &str, ev: &Event, world: &World) -> Option<String> {
    if key == "message" {
        return Some(ev.message.clone().unwrap_or_default());
    }
    let (role_name, field) = match key.split_once('.') {
        Some((role, field)) => (role, Some(field)),
        None => (key, None),
    };
    let role = EventRole::parse(role_name)?;
    let id = ev.role(role)?;
    let entity = world.get(id).ok()?;
    match field {
        None => Some(entity.name.clone()),
        Some(name) => match entity.field(name) {
            Value::Int(n) => Some(n.to_string()),
            Value::Str(s) => Some(s),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Utc;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::component::{Container, Room};
    use crate::entity::{Entity, EntityId};
    use crate::event::RecordingPublisher;
    use crate::expr;
    use crate::scheduler::Scheduler;

    struct Fixture {
        world: World,
        publisher: RecordingPublisher,
        scheduler: Scheduler,
        catalog: HashMap<String, EntityId>,
        rng: StdRng,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                world: World::new(),
                publisher: RecordingPublisher::default(),
                scheduler: Scheduler::new(),
                catalog: HashMap::new(),
                rng: StdRng::seed_from_u64(7),
            }
        }

        fn ctx(&mut self) -> RunCtx<'_> {
            RunCtx {
                world: &mut self.world,
                publisher: &mut self.publisher,
                scheduler: &mut self.scheduler,
                catalog: &self.catalog,
                rng: &mut self.rng,
                now: Utc::now(),
            }
        }

        fn room(&mut self, name: &str) -> EntityId {
            let mut e = Entity::new(name, format!("The {name}."));
            e.components.room = Some(Room::new());
            self.world.insert(e)
        }
    }

    #[test]
    fn render_substitutes_roles_fields_and_message() {
        let mut world = World::new();
        let mut hero = Entity::new("Edda", "A wanderer.");
        hero.fields.insert("hp".into(), Value::Int(7));
        let hero = world.insert(hero);
        let ev = Event {
            source: Some(hero),
            message: Some("onwards".into()),
            ..Event::new("say")
        };

        let out = render("{source} ({source.hp} hp) says: {message}", &ev, &world);
        assert_eq!(out, "Edda (7 hp) says: onwards");
    }

    #[test]
    fn render_leaves_unknowns_verbatim() {
        let world = World::new();
        let ev = Event::new("say");
        assert_eq!(render("hello {nobody}", &ev, &world), "hello {nobody}");
        assert_eq!(render("{target} waves", &ev, &world), "{target} waves");
        assert_eq!(render("a {{literal}} brace", &ev, &world), "a {literal} brace");
    }

    #[test]
    fn print_delivers_to_the_resolved_recipient() {
        let mut fx = Fixture::new();
        let cellar = fx.room("cellar");
        let hero = fx.world.insert(Entity::new("Edda", "A wanderer."));
        let ev = Event {
            source: Some(hero),
            room: Some(cellar),
            ..Event::new("look")
        };

        let action = Action::Print {
            role: EventRole::Source,
            text: "You see dust.".into(),
        };
        action.execute(&ev, &mut fx.ctx()).unwrap();
        assert_eq!(
            fx.publisher.lines,
            vec![(Some(hero), "You see dust.".to_string())]
        );
    }

    #[test]
    fn print_delivers_without_a_room() {
        let mut fx = Fixture::new();
        let hero = fx.world.insert(Entity::new("Edda", "A wanderer."));
        let ev = Event {
            source: Some(hero),
            ..Event::new("remind")
        };

        let action = Action::Print {
            role: EventRole::Source,
            text: "The lantern flickers.".into(),
        };
        action.execute(&ev, &mut fx.ctx()).unwrap();
        assert_eq!(
            fx.publisher.lines,
            vec![(Some(hero), "The lantern flickers.".to_string())]
        );

        // An unfilled recipient slot is still an error.
        let ev = Event::new("remind");
        assert!(action.execute(&ev, &mut fx.ctx()).is_err());
    }

    #[test]
    fn publish_excludes_the_involved_entities() {
        let mut fx = Fixture::new();
        let cellar = fx.room("cellar");
        let hero = fx.world.insert(Entity::new("Edda", "A wanderer."));
        let ev = Event {
            source: Some(hero),
            room: Some(cellar),
            ..Event::new("shout")
        };

        let action = Action::Publish {
            text: "{source} shouts!".into(),
        };
        action.execute(&ev, &mut fx.ctx()).unwrap();
        assert_eq!(fx.publisher.lines, vec![(None, "Edda shouts!".to_string())]);
    }

    #[test]
    fn copy_clones_from_the_catalog() {
        let mut fx = Fixture::new();
        let mut chest = Entity::new("chest", "Oak.");
        chest.components.container = Some(Container::new());
        let chest = fx.world.insert(chest);
        let proto = fx
            .world
            .insert(Entity::new("gold coin", "Shiny.").with_alias("coin"));
        fx.catalog.insert("gold coin".into(), proto);

        let ev = Event {
            target: Some(chest),
            ..Event::new("loot")
        };
        let action = Action::Copy {
            entity: "gold coin".into(),
            role: EventRole::Target,
            component: ComponentKind::Container,
        };
        action.execute(&ev, &mut fx.ctx()).unwrap();
        action.execute(&ev, &mut fx.ctx()).unwrap();

        let children = fx
            .world
            .get(chest)
            .unwrap()
            .components
            .children(ComponentKind::Container)
            .unwrap();
        assert_eq!(children.len(), 2);
        // The prototype itself stays outside the chest.
        assert!(!children.contains(proto));

        let missing = Action::Copy {
            entity: "unicorn".into(),
            role: EventRole::Target,
            component: ComponentKind::Container,
        };
        assert!(missing.execute(&ev, &mut fx.ctx()).is_err());
    }

    #[test]
    fn move_reparents_the_object() {
        let mut fx = Fixture::new();
        let cellar = fx.room("cellar");
        let mut hero = Entity::new("Edda", "A wanderer.");
        hero.components.inventory = Some(crate::component::Inventory::new());
        let hero = fx.world.insert(hero);
        let key = fx
            .world
            .insert(Entity::new("brass key", "Small.").with_alias("key"));
        fx.world.attach(cellar, ComponentKind::Room, key).unwrap();

        let ev = Event {
            source: Some(hero),
            target: Some(key),
            room: Some(cellar),
            ..Event::new("take")
        };
        let action = Action::Move {
            object: EventRole::Target,
            destination: EventRole::Source,
            component: ComponentKind::Inventory,
        };
        action.execute(&ev, &mut fx.ctx()).unwrap();

        assert_eq!(
            fx.world.get(key).unwrap().parent.unwrap().entity,
            hero
        );
        let room = fx.world.get(cellar).unwrap();
        assert!(room.components.children(ComponentKind::Room).unwrap().is_empty());
    }

    #[test]
    fn destroy_only_detaches() {
        let mut fx = Fixture::new();
        let cellar = fx.room("cellar");
        let rat = fx.world.insert(Entity::new("rat", "Grey.").with_alias("rat"));
        fx.world.attach(cellar, ComponentKind::Room, rat).unwrap();

        let ev = Event {
            target: Some(rat),
            room: Some(cellar),
            ..Event::new("kill")
        };
        Action::Destroy {
            role: EventRole::Target,
        }
        .execute(&ev, &mut fx.ctx())
        .unwrap();

        // Gone from the room, still in the arena.
        assert_eq!(fx.world.find_by_alias(cellar, "rat").unwrap(), None);
        assert!(fx.world.contains(rat));
        assert!(fx.world.get(rat).unwrap().parent.is_none());
    }

    #[test]
    fn set_field_writes_the_evaluated_value() {
        let mut fx = Fixture::new();
        let mut hero = Entity::new("Edda", "A wanderer.");
        hero.fields.insert("hp".into(), Value::Int(10));
        let hero = fx.world.insert(hero);

        let ev = Event {
            source: Some(hero),
            ..Event::new("rest")
        };
        Action::SetField {
            role: EventRole::Source,
            field: "hp".into(),
            value: expr::parse("source.hp + 5").unwrap(),
        }
        .execute(&ev, &mut fx.ctx())
        .unwrap();

        assert_eq!(fx.world.get(hero).unwrap().field("hp"), Value::Int(15));
    }

    #[test]
    fn reveal_children_toggles_the_flag() {
        let mut fx = Fixture::new();
        let mut chest = Entity::new("chest", "Oak.");
        let mut container = Container::new();
        container.children.revealed = false;
        chest.components.container = Some(container);
        let chest = fx.world.insert(chest);

        let ev = Event {
            target: Some(chest),
            ..Event::new("open")
        };
        Action::RevealChildren {
            role: EventRole::Target,
            component: ComponentKind::Container,
            reveal: true,
        }
        .execute(&ev, &mut fx.ctx())
        .unwrap();

        assert!(
            fx.world
                .get(chest)
                .unwrap()
                .components
                .children(ComponentKind::Container)
                .unwrap()
                .revealed
        );
    }

    #[test]
    fn schedule_once_enqueues_a_job() {
        let mut fx = Fixture::new();
        let ev = Event::new("fuse");
        let action = Action::ScheduleOnce {
            delay: Duration::seconds(3),
            actions: Arc::from(vec![Action::Publish {
                text: "Boom.".into(),
            }]),
        };
        action.execute(&ev, &mut fx.ctx()).unwrap();
        assert_eq!(fx.scheduler.len(), 1);
    }
}
