//! First-order term data model shared by the Weft rewriting stack.
//!
//! This crate is intentionally small and dependency-light. It provides:
//! - [`Term`]: applications, lists, strings, integers, and pattern variables.
//! - A textual reader ([`Term::parse`]) and writer (`Display`) for the
//!   `Name(arg, ...)` / `[a, b]` / `"s"` / `42` / `?x` syntax.

mod parse;
mod term;

pub use parse::TermError;
pub use term::Term;
