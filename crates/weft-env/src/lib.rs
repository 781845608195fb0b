//! Shared term-rewriting environment for language tooling hosts.
//!
//! One [`Environment`] coordinates exclusive, reentrant access to a rewriting
//! interpreter and its language registries across a designated UI/event
//! thread and multiple background worker threads:
//!
//! - [`LanguageRegistry`]: descriptors and managed/unmanaged parse tables,
//!   keyed by language name, with atomic descriptor replacement and
//!   reinitialization fan-out.
//! - [`EnvLock`]: the reentrant lock serializing all interpreter access, with
//!   an injected UI-thread probe and a configurable assertion strictness that
//!   turns deadlock-prone call patterns into deterministic failures.
//! - [`GuardedInterpreter`]: interpreter handles whose operations check the
//!   lock discipline before touching shared engine state.
//!
//! All blocking is OS-thread blocking; there is no cancellation at this layer
//! — callers needing it interrupt the worker thread above this crate.

mod descriptor;
mod diagnostics;
mod env;
mod error;
mod interp;
mod lock;
mod registry;
mod sync;
mod table;

pub use descriptor::{DescriptorConfig, DescriptorId, LanguageDescriptor, ProviderFn};
pub use diagnostics::{DiagnosticSink, TracingSink};
pub use env::{Environment, EnvironmentOptions};
pub use error::{EnvError, Result};
pub use interp::{GuardedInterpreter, HandleState};
pub use lock::{EnvGuard, EnvLock, NoUiThread, PinnedUiThread, Strictness, UiThreadProbe};
pub use registry::{LanguageRegistry, ParseTableProvider};
pub use table::{ParseTable, TableError, TABLE_FORMAT_VERSION};

pub use weft_rewrite::RewriteError;
pub use weft_terms::Term;
