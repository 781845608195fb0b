use crate::EnvError;

/// External sink for failures the environment absorbs instead of propagating
/// (currently: per-descriptor reinitialization failures).
///
/// The environment never renders anything user-facing; hosts that want
/// dialogs or problem markers implement this and dispatch on their own
/// thread.
pub trait DiagnosticSink: Send + Sync {
    fn error(&self, message: &str, error: &EnvError);

    fn warning(&self, message: &str, error: Option<&EnvError>);
}

/// Default sink: forwards to `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn error(&self, message: &str, error: &EnvError) {
        tracing::error!(target: "weft.env", error = %error, "{}", message);
    }

    fn warning(&self, message: &str, error: Option<&EnvError>) {
        match error {
            Some(error) => {
                tracing::warn!(target: "weft.env", error = %error, "{}", message)
            }
            None => tracing::warn!(target: "weft.env", "{}", message),
        }
    }
}
