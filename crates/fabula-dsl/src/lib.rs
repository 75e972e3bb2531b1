//! Compiler for Fabula world declarations.
//!
//! Declarations describe entities, reusable traits, and player-facing
//! commands as plain data ([`decl`]). [`compile`] lowers them in three
//! phases: collect the namespaces, expand traits into prototypes, and
//! instantiate the prototypes into a runnable
//! [`World`](fabula_engine::World). Component kinds are resolved through
//! an explicit [`ComponentRegistry`] handed to the compiler, so callers
//! can extend the component vocabulary without touching this crate.

/// Player-facing command surfaces and their syntax patterns.
pub mod command;
/// The three-phase compiler.
pub mod compiler;
/// The declaration tree consumed by the compiler.
pub mod decl;
/// Compile errors.
pub mod error;
/// Component-kind builders.
pub mod registry;

pub use command::{CommandSpec, PatToken, Pattern, tokenize_syntax};
pub use compiler::{CompiledWorld, compile};
pub use decl::{
    ActionDecl, Block, CommandDecl, ComponentDecl, ConditionDecl, Declaration, EntityDecl,
    FieldDecl, FieldValue, PatternDecl, ReactionDecl, RuleDecl, TimeUnit, TraitDecl, TraitUseDecl,
};
pub use error::{CompileError, CompileResult};
pub use registry::{BuiltComponent, ComponentBuilder, ComponentRegistry};
