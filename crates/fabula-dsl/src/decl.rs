use serde::{Deserialize, Serialize};

/// A top-level declaration.
///
/// The compiler consumes a flat list of these; any front end that can
/// produce the serde shape (a parser, a JSON file, test code) works.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Declaration {
    /// A concrete entity to instantiate into the world.
    Entity(EntityDecl),
    /// A reusable block bundle mixed into entities.
    Trait(TraitDecl),
    /// A player-facing command surface.
    Command(CommandDecl),
}

/// An entity declaration: a name and its blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDecl {
    /// Catalog name, unique among entities.
    pub name: String,
    /// Blocks in declaration order.
    pub blocks: Vec<Block>,
}

/// A trait declaration, structurally identical to an entity but never
/// instantiated on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitDecl {
    /// Trait name, unique among traits.
    pub name: String,
    /// Blocks in declaration order.
    pub blocks: Vec<Block>,
}

/// One block inside an entity or trait body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Block {
    /// Attach a component.
    Component(ComponentDecl),
    /// Mix in a trait's blocks.
    TraitUse(TraitUseDecl),
    /// React to events.
    Reaction(ReactionDecl),
    /// Set an identity or custom field.
    Field(FieldDecl),
}

/// A component attachment with its configuration fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDecl {
    /// Component-kind name, resolved through the registry.
    pub kind: String,
    /// Configuration fields, including the deferred `children` list.
    pub fields: Vec<FieldDecl>,
}

/// A trait use, optionally passing override fields into the expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitUseDecl {
    /// The trait to expand.
    pub name: String,
    /// Fields passed in; they fill only keys the entity has not set.
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

/// A reaction block: rules registered for one or more event kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionDecl {
    /// Event kinds these rules answer to.
    pub events: Vec<String>,
    /// Rules in priority order.
    pub rules: Vec<RuleDecl>,
}

/// One when/then rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDecl {
    /// Conditions, all of which must hold. May be empty.
    #[serde(default)]
    pub when: Vec<ConditionDecl>,
    /// Actions run when the conditions hold.
    pub then: Vec<ActionDecl>,
}

/// A key/value field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    /// Field key.
    pub key: String,
    /// Field value.
    pub value: FieldValue,
}

/// A field value: either expression source or literal pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    /// Expression source, evaluated at compile time.
    Expr(String),
    /// Key/value pairs. Only room exits accept these.
    Pairs(Vec<(String, String)>),
}

/// A condition declaration with role and component names as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionDecl {
    /// The role's entity carries the tag.
    HasTag {
        /// Role name.
        role: String,
        /// Tag to look for.
        tag: String,
    },
    /// The role is filled.
    IsPresent {
        /// Role name.
        role: String,
    },
    /// Two roles resolve to the same entity.
    RolesEqual {
        /// First role name.
        left: String,
        /// Second role name.
        right: String,
    },
    /// The child role's entity sits inside the parent role's component.
    HasChild {
        /// Role naming the parent.
        parent: String,
        /// Component-kind name on the parent.
        component: String,
        /// Role naming the child.
        child: String,
    },
    /// The event message contains the needle.
    MessageContains {
        /// Substring to look for.
        needle: String,
    },
    /// An expression that must be true.
    Expr {
        /// Expression source.
        source: String,
    },
    /// Negation.
    Not(Box<ConditionDecl>),
    /// Disjunction over two or more alternatives.
    Or(Vec<ConditionDecl>),
}

/// Time units accepted by the schedule actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    /// Whole seconds.
    Seconds,
    /// Whole minutes.
    Minutes,
}

/// An action declaration with role and component names as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionDecl {
    /// Deliver template text to the role's entity.
    Print {
        /// Recipient role name.
        role: String,
        /// Template text.
        text: String,
    },
    /// Broadcast template text to the event room.
    Publish {
        /// Template text.
        text: String,
    },
    /// Deep-copy a catalog entity into the role's component.
    Copy {
        /// Catalog name of the entity to copy.
        entity: String,
        /// Recipient role name.
        role: String,
        /// Component-kind name receiving the copy.
        component: String,
    },
    /// Reparent the object role under the destination role.
    Move {
        /// Role naming the entity to move.
        object: String,
        /// Role naming the new parent.
        destination: String,
        /// Component-kind name on the destination.
        component: String,
    },
    /// Detach the role's entity from its parent.
    Destroy {
        /// Role name.
        role: String,
    },
    /// Write an evaluated expression into the role's field.
    SetField {
        /// Role name.
        role: String,
        /// Field to write.
        field: String,
        /// Expression source, evaluated per execution.
        value: String,
    },
    /// Set the revealed flag on the role's component.
    RevealChildren {
        /// Role name.
        role: String,
        /// Component-kind name.
        component: String,
        /// New revealed state.
        reveal: bool,
    },
    /// Run actions once after a delay.
    ScheduleOnce {
        /// Delay amount as a constant expression.
        amount: String,
        /// Unit of the amount.
        unit: TimeUnit,
        /// Actions to run.
        then: Vec<ActionDecl>,
    },
    /// Re-check a rule on an interval for as long as it keeps matching.
    ScheduleRepeating {
        /// Interval amount as a constant expression.
        amount: String,
        /// Unit of the amount.
        unit: TimeUnit,
        /// Conditions re-checked each interval.
        #[serde(default)]
        when: Vec<ConditionDecl>,
        /// Actions run each interval.
        then: Vec<ActionDecl>,
    },
}

/// A command declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDecl {
    /// Command name. Lowercased when compiled.
    pub name: String,
    /// Alternative spellings.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Input patterns in match order.
    pub patterns: Vec<PatternDecl>,
}

/// One input pattern of a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternDecl {
    /// Syntax template, e.g. `"give {target} to {instrument}"`.
    pub syntax: String,
    /// Text shown when the pattern binds but no rule fires.
    #[serde(default)]
    pub no_match: Option<String>,
    /// Help text for the pattern.
    #[serde(default)]
    pub help: Option<String>,
}
