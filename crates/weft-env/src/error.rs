use std::path::PathBuf;

use smol_str::SmolStr;

use crate::table::TableError;

pub type Result<T> = std::result::Result<T, EnvError>;

/// Errors produced by the shared environment.
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    /// Registration-time configuration error: the descriptor is malformed.
    /// Surfaced to the registration caller, never retried internally.
    #[error("bad descriptor for language `{language}`: {reason}")]
    BadDescriptor { language: SmolStr, reason: String },

    /// No parse table or provider is registered for the language. This is a
    /// caller/configuration bug, not a recoverable condition.
    #[error("no parse table or table provider registered for language `{language}`")]
    NotAvailable { language: SmolStr },

    /// A guarded operation ran without the environment lock held (or a
    /// background acquire was attempted on the UI thread). Produced only
    /// under [`Strictness::Enforce`](crate::Strictness::Enforce).
    #[error("lock discipline violation in `{operation}`: {reason}")]
    LockDiscipline {
        operation: &'static str,
        reason: String,
    },

    #[error("interpreter handle used after dispose")]
    Disposed,

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Rewrite(#[from] weft_rewrite::RewriteError),

    #[error("failed to read parse table from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
