//! Term-rewriting interpreter underlying the Weft environment.
//!
//! The engine owns a set of named rewrite rules (strategies), a table of
//! native operators installed by [`PrimitiveLibrary`] implementations, and a
//! current term the strategies rewrite. It knows nothing about locking; the
//! shared-access discipline lives in `weft-env`, which wraps every engine
//! entry point.

mod interp;
mod library;
mod rules;

use smol_str::SmolStr;

pub use interp::{Interpreter, InterpreterConfig};
pub use library::{
    EditorSupportLibrary, OperatorTable, ParseSupportLibrary, Primitive, PrimitiveLibrary,
};
pub use rules::{parse_definitions, Rule};

pub type Result<T> = std::result::Result<T, RewriteError>;

/// Errors produced by rule parsing, library installation, and strategy
/// invocation.
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("strategy `{strategy}` is not applicable to the current term")]
    StrategyFailed { strategy: SmolStr },

    #[error("unknown strategy `{strategy}`")]
    UnknownStrategy { strategy: SmolStr },

    #[error("rule for `{strategy}` uses unbound variable `?{variable}` on its right-hand side")]
    UnboundVariable { strategy: SmolStr, variable: SmolStr },

    #[error("library `{library}` must be installed after `{requires}`")]
    LibraryOrder {
        library: &'static str,
        requires: &'static str,
    },

    #[error("malformed strategy definition on line {line}: {reason}")]
    MalformedDefinition { line: usize, reason: String },

    #[error(transparent)]
    Term(#[from] weft_terms::TermError),
}
