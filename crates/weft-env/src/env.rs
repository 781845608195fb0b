use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;

use crate::descriptor::{DescriptorConfig, LanguageDescriptor};
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::interp::GuardedInterpreter;
use crate::lock::{EnvLock, NoUiThread, Strictness, UiThreadProbe};
use crate::registry::{LanguageRegistry, ParseTableProvider};
use crate::table::ParseTable;
use crate::Result;

/// Construction-time wiring for an [`Environment`].
///
/// Defaults are suitable for headless hosts and tests: no UI thread, the
/// default strictness for the build profile, diagnostics forwarded to
/// `tracing`.
#[derive(Clone)]
pub struct EnvironmentOptions {
    pub strictness: Strictness,
    pub ui_probe: Arc<dyn UiThreadProbe>,
    pub sink: Arc<dyn DiagnosticSink>,
}

impl Default for EnvironmentOptions {
    fn default() -> Self {
        Self {
            strictness: Strictness::default(),
            ui_probe: Arc::new(NoUiThread),
            sink: Arc::new(TracingSink),
        }
    }
}

impl fmt::Debug for EnvironmentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentOptions")
            .field("strictness", &self.strictness)
            .finish()
    }
}

struct EnvInner {
    lock: Arc<EnvLock>,
    registry: LanguageRegistry,
}

/// The shared rewriting environment: language registries plus the reentrant
/// lock serializing interpreter access.
///
/// Explicitly constructed and explicitly owned — there is no process-wide
/// instance, and independent environments (each with its own lock and
/// registries) can coexist in one process. Cloning is cheap and shares the
/// same environment.
#[derive(Clone)]
pub struct Environment {
    inner: Arc<EnvInner>,
}

impl Environment {
    pub fn new(options: EnvironmentOptions) -> Self {
        let lock = Arc::new(EnvLock::new(options.ui_probe, options.strictness));
        let registry = LanguageRegistry::new(options.sink);
        Self {
            inner: Arc::new(EnvInner { lock, registry }),
        }
    }

    /// The lock serializing interpreter access in this environment.
    pub fn lock(&self) -> &Arc<EnvLock> {
        &self.inner.lock
    }

    pub fn registry(&self) -> &LanguageRegistry {
        &self.inner.registry
    }

    // Registry operations, delegated for call-site convenience.

    pub fn register_descriptor(&self, config: DescriptorConfig) -> Result<Arc<LanguageDescriptor>> {
        self.inner.registry.register_descriptor(config)
    }

    pub fn descriptor(&self, language: &str) -> Option<Arc<LanguageDescriptor>> {
        self.inner.registry.descriptor(language)
    }

    pub fn register_parse_table(
        &self,
        language: impl Into<SmolStr>,
        table: ParseTable,
    ) -> Arc<ParseTable> {
        self.inner.registry.register_parse_table(language, table)
    }

    pub fn register_unmanaged_parse_table(&self, name: impl Into<SmolStr>, table: ParseTable) {
        self.inner
            .registry
            .register_unmanaged_parse_table(name, table)
    }

    pub fn unmanaged_parse_table(&self, name: &str) -> Option<Arc<ParseTable>> {
        self.inner.registry.unmanaged_parse_table(name)
    }

    pub fn parse_table_provider(&self, language: &str) -> Result<ParseTableProvider> {
        self.inner.registry.parse_table_provider(language)
    }

    /// Creates a guarded interpreter: every operation checks the environment
    /// lock, the fixed parse-support and editor-support libraries are
    /// installed in order, and engine-level failure catching is disabled.
    pub fn create_interpreter(&self) -> Result<GuardedInterpreter> {
        GuardedInterpreter::new(self.inner.lock.clone(), true)
    }

    /// Escape hatch: an interpreter whose operations skip the lock check.
    ///
    /// Only for single-threaded bootstrap, before any worker threads exist
    /// (e.g. loading a prototype's rule base at startup). Each call site owns
    /// the justification; prefer [`Environment::create_interpreter`].
    pub fn create_interpreter_unguarded(&self) -> Result<GuardedInterpreter> {
        GuardedInterpreter::new(self.inner.lock.clone(), false)
    }

    /// Creates a guarded interpreter cloning `prototype`'s configuration
    /// (loaded rules) but not its mutable state; the fixed library wiring is
    /// re-established on the new instance.
    pub fn create_interpreter_from_prototype(
        &self,
        prototype: &GuardedInterpreter,
    ) -> Result<GuardedInterpreter> {
        GuardedInterpreter::from_prototype(self.inner.lock.clone(), true, prototype)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(EnvironmentOptions::default())
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("lock", &self.inner.lock)
            .field("registry", &self.inner.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_terms::Term;

    #[test]
    fn environments_are_independent() {
        let a = Environment::default();
        let b = Environment::default();
        let _guard = a.lock().acquire();
        // `b`'s lock is unaffected by `a`'s.
        assert!(!b.lock().is_held_by_current_thread());
        assert!(b.lock().try_acquire().is_some());
    }

    #[test]
    fn prototype_clone_shares_rules_not_state() {
        let env = Environment::new(EnvironmentOptions::default());
        let guard = env.lock().acquire();

        let proto = env.create_interpreter().unwrap();
        proto.load_definitions("step: A -> B\n").unwrap();
        proto.set_current(Term::atom("A")).unwrap();

        let clone = env.create_interpreter_from_prototype(&proto).unwrap();
        assert_eq!(clone.current().unwrap(), Term::List(Vec::new()));
        clone.set_current(Term::atom("A")).unwrap();
        assert!(clone.invoke("step").unwrap());
        assert_eq!(clone.current().unwrap(), Term::atom("B"));

        drop(guard);
    }

    #[test]
    fn unguarded_escape_hatch_is_explicit() {
        let env = Environment::default();
        let interp = env.create_interpreter_unguarded().unwrap();
        assert!(!interp.is_guarded());
        // No lock held, still usable.
        interp.set_current(Term::Int(1)).unwrap();
    }
}
