//! Error types for declarative argument matching.
//!
//! Two failure levels exist and never mix:
//!
//! - [`DefinitionError`]: raised while building a [`Matcher`](crate::Matcher)
//!   from its declared handlers. Always fatal, never recoverable.
//! - [`UsageError`]: raised while matching a concrete `argv`. Inside one
//!   resolution attempt these travel as plain values so the resolver can
//!   offer the input to the next candidate; only the most informative one
//!   surfaces to the caller.
//!
//! [`ProcessError`] is what [`Matcher::process`](crate::Matcher::process)
//! returns: either the winning usage error or an error produced by the
//! invoked handler callback itself.

use thiserror::Error;

/// Errors detected while building handler definitions.
///
/// These indicate a broken declaration, not bad user input, and abort
/// [`MatcherBuilder::build`](crate::MatcherBuilder::build) immediately.
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// The same public name is declared twice within one handler.
    #[error("duplicate option \"{name}\" in handler {handler}")]
    DuplicateOption { name: String, handler: String },

    /// In getopt mode an alias must pair one short and one long name.
    #[error("bad alias {first}/{second}: aliases must pair a short and a long name")]
    AliasPairing { first: String, second: String },

    /// The alias target is already a known name in the same handler.
    #[error("bad alias {name}/{alias} in handler {handler}")]
    AliasCollision {
        name: String,
        alias: String,
        handler: String,
    },

    /// A public rename would collide with an existing name.
    #[error("{name} cannot be a public rename, already defined in handler {handler}")]
    RenameCollision { name: String, handler: String },

    /// A positional parameter was declared after the variadic catch-all.
    #[error("positional parameter {name} follows a variadic parameter in handler {handler}")]
    PositionalAfterVariadic { name: String, handler: String },

    /// A parameter was declared with an empty name.
    #[error("empty parameter name in handler {handler}")]
    EmptyName { handler: String },

    /// A common handler's `applies` pattern could not be compiled.
    #[error("invalid applies pattern: {pattern}")]
    InvalidApplies { pattern: String },

    /// `build` was called without a single primary handler.
    #[error("no handlers registered")]
    NoHandlers,
}

/// Errors detected while matching a command line.
///
/// The `Display` form is the single line shown to users.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UsageError {
    /// A token no candidate slot could absorb.
    #[error("unexpected argument: {arg}")]
    Unexpected { arg: String },

    /// An option-looking token after the first positional under GNU ordering.
    #[error("unexpected argument {arg} after non option arguments")]
    OptionAfterPositionals { arg: String },

    /// A token the tokenizer could not decompose at all (e.g. empty).
    #[error("unexpected argument {arg}")]
    Malformed { arg: String },

    /// A short name outside the handler's short namespace.
    #[error("unexpected flag {name} in argument {arg}")]
    UnexpectedFlag { name: String, arg: String },

    /// A flag given an inline value (`--verbose=yes`).
    #[error("incorrect flag {name}")]
    FlagWithValue { name: String },

    /// An option with no value available to consume.
    #[error("incorrect option {name}")]
    OptionMissingValue { name: String },

    /// A typed option whose value failed conversion.
    #[error("incorrect value for {name}")]
    InvalidValue { name: String },

    /// A short prefix with no name/value payload to consume.
    #[error("incorrect prefix {name}")]
    IncorrectPrefix { name: String },

    /// A long prefix used without a name remainder where none can follow.
    #[error("incorrect prefix usage on argument {arg}")]
    PrefixUsage { arg: String },

    /// A mandatory slot left unbound after the whole line was consumed.
    #[error("missing required {kind} {name}")]
    MissingRequired { kind: &'static str, name: String },

    /// Fallback when no attempt made any progress at all.
    #[error("invalid command line input")]
    NoMatch,
}

/// Error returned by [`Matcher::process`](crate::Matcher::process).
#[derive(Debug, Error)]
pub enum ProcessError {
    /// No handler matched; carries the most informative usage error.
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// The selected handler callback itself failed.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}
