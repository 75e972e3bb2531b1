use fabula_engine::EngineError;

/// Alias for `Result<T, CompileError>`.
pub type CompileResult<T> = Result<T, CompileError>;

/// Errors raised while compiling declarations into a world.
///
/// Any compile error is fatal to the whole compile; a partial world is
/// never returned.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// Two declarations of the same kind share a name.
    #[error("duplicate {namespace} '{name}'")]
    DuplicateName {
        /// Which namespace the clash happened in.
        namespace: &'static str,
        /// The clashing name.
        name: String,
    },

    /// An entity or trait uses a trait that was never declared.
    #[error("entity '{entity}' uses unknown trait '{name}'")]
    UnknownTrait {
        /// The entity or trait carrying the use.
        entity: String,
        /// The missing trait name.
        name: String,
    },

    /// Trait expansion or child instantiation looped back on itself.
    #[error("cycle detected at '{name}'")]
    Cycle {
        /// The declaration where the cycle closed.
        name: String,
    },

    /// A children list names an entity that was never declared.
    #[error("entity '{parent}' lists unknown child '{child}'")]
    UnknownChild {
        /// The entity whose children list is bad.
        parent: String,
        /// The missing child name.
        child: String,
    },

    /// A component declaration names a kind the registry cannot build.
    #[error("unknown component '{kind}'")]
    UnknownComponent {
        /// The undeclared component-kind name.
        kind: String,
    },

    /// A component or command declaration carries a field the builder
    /// does not accept.
    #[error("{owner}: unknown field '{field}'")]
    UnknownField {
        /// Component kind or command the field appeared under.
        owner: String,
        /// The unexpected field key.
        field: String,
    },

    /// A field held a value of the wrong kind.
    #[error("{owner}: field '{field}' must be {expected}")]
    FieldType {
        /// Where the field appeared.
        owner: String,
        /// The field key.
        field: String,
        /// The kind the field requires.
        expected: &'static str,
    },

    /// A required identity field is missing from a top-level entity.
    #[error("entity '{entity}' has no {what}")]
    MissingIdentity {
        /// The incomplete entity.
        entity: String,
        /// Which of name/description/aliases is absent.
        what: &'static str,
    },

    /// A condition or action names an unknown event role.
    #[error("unknown event role '{0}'")]
    UnknownRole(String),

    /// A block that requires content was declared empty.
    #[error("empty {0}")]
    EmptyBlock(&'static str),

    /// An expression failed to parse or to evaluate at compile time.
    #[error("in {context}: {source}")]
    Expr {
        /// The declaration being compiled.
        context: String,
        /// The underlying engine error.
        source: EngineError,
    },

    /// The runtime arena rejected an operation during instantiation.
    #[error(transparent)]
    Engine(#[from] EngineError),
}
