use std::collections::HashMap;

use fabula_engine::component::{ComponentKind, ComponentSet, Container, Inventory, Room};
use fabula_engine::expr;
use fabula_engine::value::Value;

use crate::decl::{ComponentDecl, FieldDecl, FieldValue};
use crate::error::{CompileError, CompileResult};

/// A component built from a declaration, ready to install on an entity.
#[derive(Debug, Clone)]
pub enum BuiltComponent {
    /// A configured room.
    Room(Room),
    /// A configured container.
    Container(Container),
    /// A configured inventory.
    Inventory(Inventory),
}

impl BuiltComponent {
    /// Which slot of the component set this fills.
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::Room(_) => ComponentKind::Room,
            Self::Container(_) => ComponentKind::Container,
            Self::Inventory(_) => ComponentKind::Inventory,
        }
    }

    /// Install into a component set, replacing any previous instance.
    pub fn install(self, set: &mut ComponentSet) {
        match self {
            Self::Room(room) => set.room = Some(room),
            Self::Container(container) => set.container = Some(container),
            Self::Inventory(inventory) => set.inventory = Some(inventory),
        }
    }
}

/// A builder turning a component declaration into a component.
pub type ComponentBuilder = fn(&ComponentDecl) -> CompileResult<BuiltComponent>;

/// Maps component-kind names to their builders.
///
/// The registry is explicit state passed into `compile`; nothing is
/// registered globally.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    builders: HashMap<String, ComponentBuilder>,
}

impl ComponentRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry with the built-in component kinds.
    pub fn standard() -> Self {
        let mut reg = Self::new();
        reg.register("Room", build_room);
        reg.register("Container", build_container);
        reg.register("Inventory", build_inventory);
        reg
    }

    /// Add or replace a builder for a component-kind name.
    pub fn register(&mut self, kind: impl Into<String>, builder: ComponentBuilder) {
        self.builders.insert(kind.into(), builder);
    }

    /// Build a component from its declaration.
    pub fn build(&self, decl: &ComponentDecl) -> CompileResult<BuiltComponent> {
        let builder = self
            .builders
            .get(&decl.kind)
            .ok_or_else(|| CompileError::UnknownComponent {
                kind: decl.kind.clone(),
            })?;
        builder(decl)
    }
}

/// Evaluate an expression field at compile time.
pub(crate) fn const_value(owner: &str, field: &FieldDecl) -> CompileResult<Value> {
    let FieldValue::Expr(source) = &field.value else {
        return Err(CompileError::FieldType {
            owner: owner.to_string(),
            field: field.key.clone(),
            expected: "an expression, not pairs",
        });
    };
    let parsed = expr::parse(source).map_err(|source| CompileError::Expr {
        context: format!("{owner} field '{}'", field.key),
        source,
    })?;
    parsed.eval_const().map_err(|source| CompileError::Expr {
        context: format!("{owner} field '{}'", field.key),
        source,
    })
}

pub(crate) fn const_string(owner: &str, field: &FieldDecl) -> CompileResult<String> {
    match const_value(owner, field)? {
        Value::Str(s) => Ok(s),
        _ => Err(CompileError::FieldType {
            owner: owner.to_string(),
            field: field.key.clone(),
            expected: "a string",
        }),
    }
}

pub(crate) fn const_bool(owner: &str, field: &FieldDecl) -> CompileResult<bool> {
    match const_value(owner, field)? {
        Value::Bool(b) => Ok(b),
        _ => Err(CompileError::FieldType {
            owner: owner.to_string(),
            field: field.key.clone(),
            expected: "a boolean",
        }),
    }
}

pub(crate) fn const_string_list(owner: &str, field: &FieldDecl) -> CompileResult<Vec<String>> {
    match const_value(owner, field)? {
        Value::StrList(list) => Ok(list),
        _ => Err(CompileError::FieldType {
            owner: owner.to_string(),
            field: field.key.clone(),
            expected: "a string list",
        }),
    }
}

fn build_room(decl: &ComponentDecl) -> CompileResult<BuiltComponent> {
    let mut room = Room::new();
    for field in &decl.fields {
        match field.key.as_str() {
            // Exits are the one place pairs are allowed.
            "exits" => match &field.value {
                FieldValue::Pairs(pairs) => {
                    room.exits = pairs.iter().cloned().collect();
                }
                FieldValue::Expr(_) => {
                    return Err(CompileError::FieldType {
                        owner: "Room".into(),
                        field: field.key.clone(),
                        expected: "direction/room pairs",
                    });
                }
            },
            "prefix" => room.children.prefix = const_string("Room", field)?,
            "revealed" => room.children.revealed = const_bool("Room", field)?,
            // Deferred; the compiler wires children after instantiation.
            "children" => {}
            _ => {
                return Err(CompileError::UnknownField {
                    owner: "Room".into(),
                    field: field.key.clone(),
                });
            }
        }
    }
    Ok(BuiltComponent::Room(room))
}

fn build_container(decl: &ComponentDecl) -> CompileResult<BuiltComponent> {
    let mut container = Container::new();
    for field in &decl.fields {
        match field.key.as_str() {
            "prefix" => container.children.prefix = const_string("Container", field)?,
            "revealed" => container.children.revealed = const_bool("Container", field)?,
            "children" => {}
            _ => {
                return Err(CompileError::UnknownField {
                    owner: "Container".into(),
                    field: field.key.clone(),
                });
            }
        }
    }
    Ok(BuiltComponent::Container(container))
}

fn build_inventory(decl: &ComponentDecl) -> CompileResult<BuiltComponent> {
    let mut inventory = Inventory::new();
    for field in &decl.fields {
        match field.key.as_str() {
            "prefix" => inventory.children.prefix = const_string("Inventory", field)?,
            "revealed" => inventory.children.revealed = const_bool("Inventory", field)?,
            "children" => {}
            _ => {
                return Err(CompileError::UnknownField {
                    owner: "Inventory".into(),
                    field: field.key.clone(),
                });
            }
        }
    }
    Ok(BuiltComponent::Inventory(inventory))
}
