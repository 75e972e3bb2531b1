use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Duration;

use fabula_engine::action::Action;
use fabula_engine::component::{ComponentKind, Eventful};
use fabula_engine::condition::Condition;
use fabula_engine::entity::{Entity, EntityId};
use fabula_engine::event::EventRole;
use fabula_engine::expr::{self, Expr};
use fabula_engine::rule::Rule;
use fabula_engine::value::Value;
use fabula_engine::world::World;

use crate::command::CommandSpec;
use crate::decl::{
    ActionDecl, Block, ConditionDecl, Declaration, EntityDecl, FieldDecl, RuleDecl, TimeUnit,
    TraitDecl,
};
use crate::error::{CompileError, CompileResult};
use crate::registry::{self, BuiltComponent, ComponentRegistry};

/// The output of a successful compile.
#[derive(Debug)]
pub struct CompiledWorld {
    /// The arena holding every instantiated entity.
    pub world: World,
    /// Catalog: declaration name to instantiated entity.
    pub entities: HashMap<String, EntityId>,
    /// Compiled command surfaces, in declaration order.
    pub commands: Vec<CommandSpec>,
}

/// Compile declarations into a world.
///
/// Runs in three phases: collect (namespace and duplicate checks),
/// prototype lowering (trait expansion), and instantiation (deep copies
/// with children wired up). Any error aborts the whole compile.
pub fn compile(
    decls: &[Declaration],
    registry: &ComponentRegistry,
) -> CompileResult<CompiledWorld> {
    let collected = collect(decls)?;

    let mut compiler = Compiler {
        registry,
        traits: &collected.traits,
        world: World::new(),
        protos: HashMap::new(),
        children_plan: HashMap::new(),
    };

    for decl in &collected.entities {
        compiler.build_prototype(decl)?;
    }

    let mut entities = HashMap::with_capacity(collected.entities.len());
    for decl in &collected.entities {
        let mut visiting = HashSet::new();
        let id = compiler.instantiate(&decl.name, None, &mut visiting)?;
        entities.insert(decl.name.clone(), id);
    }

    // Prototypes have served their purpose; only instances remain.
    for proto in compiler.protos.values() {
        compiler.world.remove(*proto)?;
    }

    let commands = collected
        .commands
        .iter()
        .copied()
        .map(CommandSpec::from_decl)
        .collect();

    Ok(CompiledWorld {
        world: compiler.world,
        entities,
        commands,
    })
}

struct Collected<'a> {
    entities: Vec<&'a EntityDecl>,
    traits: HashMap<String, &'a TraitDecl>,
    commands: Vec<&'a crate::decl::CommandDecl>,
}

fn collect(decls: &[Declaration]) -> CompileResult<Collected<'_>> {
    let mut entities = Vec::new();
    let mut entity_names = HashSet::new();
    let mut traits = HashMap::new();
    let mut commands: Vec<&crate::decl::CommandDecl> = Vec::new();

    for decl in decls {
        match decl {
            Declaration::Entity(e) => {
                if !entity_names.insert(e.name.clone()) {
                    return Err(CompileError::DuplicateName {
                        namespace: "entity",
                        name: e.name.clone(),
                    });
                }
                entities.push(e);
            }
            Declaration::Trait(t) => {
                if traits.insert(t.name.clone(), t).is_some() {
                    return Err(CompileError::DuplicateName {
                        namespace: "trait",
                        name: t.name.clone(),
                    });
                }
            }
            Declaration::Command(c) => {
                if commands.iter().any(|other| other.name == c.name) {
                    return Err(CompileError::DuplicateName {
                        namespace: "command",
                        name: c.name.clone(),
                    });
                }
                commands.push(c);
            }
        }
    }

    Ok(Collected {
        entities,
        traits,
        commands,
    })
}

/// An entity or trait body after trait expansion, before instantiation.
#[derive(Default)]
struct Lowered {
    name: String,
    description: String,
    aliases: Vec<String>,
    tags: Vec<String>,
    fields: HashMap<String, Value>,
    components: Vec<BuiltComponent>,
    // Kept apart so trait rules always register before own rules.
    trait_rules: Vec<(String, Arc<Rule>)>,
    own_rules: Vec<(String, Arc<Rule>)>,
}

impl Lowered {
    fn rules(self) -> impl Iterator<Item = (String, Arc<Rule>)> {
        self.trait_rules.into_iter().chain(self.own_rules)
    }
}

struct Compiler<'a> {
    registry: &'a ComponentRegistry,
    traits: &'a HashMap<String, &'a TraitDecl>,
    world: World,
    protos: HashMap<String, EntityId>,
    children_plan: HashMap<String, Vec<(ComponentKind, Vec<String>)>>,
}

impl Compiler<'_> {
    /// Lower an entity declaration and park the result in the arena as
    /// a detached prototype.
    fn build_prototype(&mut self, decl: &EntityDecl) -> CompileResult<()> {
        let mut visiting = HashSet::new();
        let lowered = self.lower(&decl.name, &decl.blocks, &mut visiting)?;

        if lowered.name.is_empty() {
            return Err(CompileError::MissingIdentity {
                entity: decl.name.clone(),
                what: "name",
            });
        }
        if lowered.description.is_empty() {
            return Err(CompileError::MissingIdentity {
                entity: decl.name.clone(),
                what: "description",
            });
        }
        if lowered.aliases.is_empty() {
            return Err(CompileError::MissingIdentity {
                entity: decl.name.clone(),
                what: "aliases",
            });
        }

        let mut entity = Entity::new(lowered.name.clone(), lowered.description.clone());
        entity.aliases = lowered.aliases.clone();
        entity.tags = lowered.tags.clone();
        entity.fields = lowered.fields.clone();
        for component in lowered.components.iter().cloned() {
            component.install(&mut entity.components);
        }

        let mut rules = lowered.rules().peekable();
        if rules.peek().is_some() {
            let mut eventful = Eventful::new();
            for (event, rule) in rules {
                eventful.add_rule(event, rule);
            }
            entity.components.eventful = Some(eventful);
        }

        // Children listed on the entity's own component blocks are
        // deferred until instantiation.
        let mut plan = Vec::new();
        for block in &decl.blocks {
            let Block::Component(component) = block else {
                continue;
            };
            for field in &component.fields {
                if field.key != "children" {
                    continue;
                }
                let kind = ComponentKind::parse(&component.kind).ok_or_else(|| {
                    CompileError::UnknownComponent {
                        kind: component.kind.clone(),
                    }
                })?;
                let names = registry::const_string_list(&component.kind, field)?;
                plan.push((kind, names));
            }
        }
        if !plan.is_empty() {
            self.children_plan.insert(decl.name.clone(), plan);
        }

        let id = self.world.insert(entity);
        self.protos.insert(decl.name.clone(), id);
        Ok(())
    }

    /// Recursively expand traits into a flat body. The visiting set
    /// turns any use-cycle into a hard error.
    fn lower(
        &self,
        id: &str,
        blocks: &[Block],
        visiting: &mut HashSet<String>,
    ) -> CompileResult<Lowered> {
        if !visiting.insert(id.to_string()) {
            return Err(CompileError::Cycle {
                name: id.to_string(),
            });
        }

        let mut out = Lowered::default();

        for block in blocks {
            match block {
                Block::Reaction(reaction) => {
                    for rule_decl in &reaction.rules {
                        let rule = Arc::new(build_rule(rule_decl)?);
                        for event in &reaction.events {
                            out.own_rules.push((event.clone(), Arc::clone(&rule)));
                        }
                    }
                }
                Block::Component(component) => {
                    out.components.push(self.registry.build(component)?);
                }
                Block::TraitUse(tu) => {
                    let trait_decl =
                        self.traits
                            .get(&tu.name)
                            .ok_or_else(|| CompileError::UnknownTrait {
                                entity: id.to_string(),
                                name: tu.name.clone(),
                            })?;
                    let expanded = self.lower(&tu.name, &trait_decl.blocks, visiting)?;

                    // Passed-in fields, then trait defaults, each
                    // filling only keys not already set.
                    for field in &tu.fields {
                        let value = registry::const_value(&tu.name, field)?;
                        out.fields.entry(field.key.clone()).or_insert(value);
                    }
                    for (key, value) in expanded.fields {
                        out.fields.entry(key).or_insert(value);
                    }

                    out.components.extend(expanded.components);
                    out.trait_rules.extend(expanded.trait_rules);
                    out.trait_rules.extend(expanded.own_rules);
                }
                Block::Field(field) => self.lower_field(id, field, &mut out)?,
            }
        }

        visiting.remove(id);
        Ok(out)
    }

    fn lower_field(&self, id: &str, field: &FieldDecl, out: &mut Lowered) -> CompileResult<()> {
        match field.key.as_str() {
            "name" => out.name = registry::const_string(id, field)?,
            "description" => out.description = registry::const_string(id, field)?,
            "aliases" => out.aliases = registry::const_string_list(id, field)?,
            "tags" => out.tags = registry::const_string_list(id, field)?,
            _ => {
                let value = registry::const_value(id, field)?;
                out.fields.insert(field.key.clone(), value);
            }
        }
        Ok(())
    }

    /// Deep-copy a prototype and recursively wire its planned children.
    fn instantiate(
        &mut self,
        name: &str,
        parent: Option<&str>,
        visiting: &mut HashSet<String>,
    ) -> CompileResult<EntityId> {
        let Some(&proto) = self.protos.get(name) else {
            return Err(CompileError::UnknownChild {
                parent: parent.unwrap_or(name).to_string(),
                child: name.to_string(),
            });
        };
        if !visiting.insert(name.to_string()) {
            return Err(CompileError::Cycle {
                name: name.to_string(),
            });
        }

        let instance = self.world.deep_copy(proto)?;
        if let Some(plan) = self.children_plan.get(name).cloned() {
            for (kind, children) in plan {
                for child in children {
                    let child_instance = self.instantiate(&child, Some(name), visiting)?;
                    self.world.attach(instance, kind, child_instance)?;
                }
            }
        }

        visiting.remove(name);
        Ok(instance)
    }
}

fn build_rule(decl: &RuleDecl) -> CompileResult<Rule> {
    let when = decl
        .when
        .iter()
        .map(build_condition)
        .collect::<CompileResult<Vec<_>>>()?;
    let then = decl
        .then
        .iter()
        .map(build_action)
        .collect::<CompileResult<Vec<_>>>()?;
    Ok(Rule::new(when, then))
}

fn parse_role(name: &str) -> CompileResult<EventRole> {
    EventRole::parse(name).ok_or_else(|| CompileError::UnknownRole(name.to_string()))
}

fn parse_component(name: &str) -> CompileResult<ComponentKind> {
    ComponentKind::parse(name).ok_or_else(|| CompileError::UnknownComponent {
        kind: name.to_string(),
    })
}

fn parse_expr(context: &str, source: &str) -> CompileResult<Expr> {
    expr::parse(source).map_err(|source| CompileError::Expr {
        context: context.to_string(),
        source,
    })
}

fn build_condition(decl: &ConditionDecl) -> CompileResult<Condition> {
    Ok(match decl {
        ConditionDecl::HasTag { role, tag } => Condition::HasTag {
            role: parse_role(role)?,
            tag: tag.clone(),
        },
        ConditionDecl::IsPresent { role } => Condition::IsPresent {
            role: parse_role(role)?,
        },
        ConditionDecl::RolesEqual { left, right } => Condition::RolesEqual {
            left: parse_role(left)?,
            right: parse_role(right)?,
        },
        ConditionDecl::HasChild {
            parent,
            component,
            child,
        } => Condition::HasChild {
            parent: parse_role(parent)?,
            component: parse_component(component)?,
            child: parse_role(child)?,
        },
        ConditionDecl::MessageContains { needle } => Condition::MessageContains {
            needle: needle.clone(),
        },
        ConditionDecl::Expr { source } => {
            Condition::ExprTrue(parse_expr("condition expression", source)?)
        }
        ConditionDecl::Not(inner) => Condition::Not(Box::new(build_condition(inner)?)),
        ConditionDecl::Or(options) => {
            let mut iter = options.iter();
            let first = iter.next().ok_or(CompileError::EmptyBlock("or condition"))?;
            let mut acc = build_condition(first)?;
            for next in iter {
                acc = Condition::Or(Box::new(acc), Box::new(build_condition(next)?));
            }
            acc
        }
    })
}

fn build_action(decl: &ActionDecl) -> CompileResult<Action> {
    Ok(match decl {
        ActionDecl::Print { role, text } => Action::Print {
            role: parse_role(role)?,
            text: text.clone(),
        },
        ActionDecl::Publish { text } => Action::Publish { text: text.clone() },
        ActionDecl::Copy {
            entity,
            role,
            component,
        } => Action::Copy {
            entity: entity.clone(),
            role: parse_role(role)?,
            component: parse_component(component)?,
        },
        ActionDecl::Move {
            object,
            destination,
            component,
        } => Action::Move {
            object: parse_role(object)?,
            destination: parse_role(destination)?,
            component: parse_component(component)?,
        },
        ActionDecl::Destroy { role } => Action::Destroy {
            role: parse_role(role)?,
        },
        ActionDecl::SetField { role, field, value } => Action::SetField {
            role: parse_role(role)?,
            field: field.clone(),
            value: parse_expr("set field value", value)?,
        },
        ActionDecl::RevealChildren {
            role,
            component,
            reveal,
        } => Action::RevealChildren {
            role: parse_role(role)?,
            component: parse_component(component)?,
            reveal: *reveal,
        },
        ActionDecl::ScheduleOnce { amount, unit, then } => {
            let actions = then
                .iter()
                .map(build_action)
                .collect::<CompileResult<Vec<_>>>()?;
            Action::ScheduleOnce {
                delay: build_duration("schedule once delay", amount, *unit)?,
                actions: Arc::from(actions),
            }
        }
        ActionDecl::ScheduleRepeating {
            amount,
            unit,
            when,
            then,
        } => {
            let rule = build_rule(&RuleDecl {
                when: when.clone(),
                then: then.clone(),
            })?;
            Action::ScheduleRepeating {
                every: build_duration("schedule repeating interval", amount, *unit)?,
                rule: Arc::new(rule),
            }
        }
    })
}

/// Evaluate a schedule amount at compile time. It must be a constant
/// int of at least one; a zero interval would make the due-job loop
/// re-enqueue into its own run.
fn build_duration(context: &str, amount: &str, unit: TimeUnit) -> CompileResult<Duration> {
    let value = parse_expr(context, amount)?
        .eval_const()
        .map_err(|source| CompileError::Expr {
            context: context.to_string(),
            source,
        })?;
    match value {
        Value::Int(n) if n >= 1 => Ok(match unit {
            TimeUnit::Seconds => Duration::seconds(n),
            TimeUnit::Minutes => Duration::minutes(n),
        }),
        _ => Err(CompileError::FieldType {
            owner: context.to_string(),
            field: "amount".into(),
            expected: "a constant positive integer",
        }),
    }
}
