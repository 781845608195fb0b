use std::sync::{Arc, Mutex};

use weft_rewrite::{
    EditorSupportLibrary, Interpreter, InterpreterConfig, ParseSupportLibrary,
};
use weft_terms::Term;

use crate::lock::EnvLock;
use crate::sync::lock_recovering;
use crate::{EnvError, Result};

/// Lifecycle of a guarded interpreter handle.
///
/// `Invoking` is only ever entered while the environment lock is held by the
/// invoking thread; a failing invocation still exits back to `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Ready,
    Invoking,
    Disposed,
}

struct HandleInner {
    engine: Interpreter,
    state: HandleState,
}

/// A rewriting interpreter whose externally callable operations check the
/// environment's lock discipline before delegating to the engine.
///
/// Handles are created per analysis/build request and disposed after use;
/// they share the environment lock that produced them, so operations on any
/// two handles of one environment are mutually exclusive.
pub struct GuardedInterpreter {
    lock: Arc<EnvLock>,
    guarded: bool,
    inner: Mutex<HandleInner>,
}

impl GuardedInterpreter {
    pub(crate) fn new(lock: Arc<EnvLock>, guarded: bool) -> Result<Self> {
        Self::build(lock, guarded, InterpreterConfig::default())
    }

    pub(crate) fn from_prototype(
        lock: Arc<EnvLock>,
        guarded: bool,
        prototype: &GuardedInterpreter,
    ) -> Result<Self> {
        let config = prototype.configuration()?;
        Self::build(lock, guarded, config)
    }

    fn build(lock: Arc<EnvLock>, guarded: bool, config: InterpreterConfig) -> Result<Self> {
        let mut engine = Interpreter::from_config(config);
        // Failures must propagate to the caller, not be absorbed by the
        // engine's own logging.
        engine.set_catch_failures(false);
        // Fixed, ordered wiring: editor support augments operators that parse
        // support establishes.
        engine.install_library(&ParseSupportLibrary)?;
        engine.install_library(&EditorSupportLibrary)?;
        Ok(Self {
            lock,
            guarded,
            inner: Mutex::new(HandleInner {
                engine,
                state: HandleState::Ready,
            }),
        })
    }

    /// Whether operations on this handle check the lock discipline.
    pub fn is_guarded(&self) -> bool {
        self.guarded
    }

    pub fn state(&self) -> HandleState {
        lock_recovering(&self.inner, "guarded interpreter").state
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        if self.guarded {
            self.lock.assert_held(operation)?;
        }
        Ok(())
    }

    /// Invokes a strategy against the current term. Strategy failures
    /// propagate as errors; the handle returns to `Ready` either way.
    pub fn invoke(&self, strategy: &str) -> Result<bool> {
        self.check("invoke")?;
        let mut inner = lock_recovering(&self.inner, "guarded interpreter");
        if inner.state == HandleState::Disposed {
            return Err(EnvError::Disposed);
        }
        inner.state = HandleState::Invoking;
        let result = inner.engine.invoke(strategy);
        inner.state = HandleState::Ready;
        Ok(result?)
    }

    /// Parses and loads strategy definitions into the engine; returns the
    /// number of rules loaded.
    pub fn load_definitions(&self, definitions: &str) -> Result<usize> {
        self.check("load")?;
        let mut inner = lock_recovering(&self.inner, "guarded interpreter");
        if inner.state == HandleState::Disposed {
            return Err(EnvError::Disposed);
        }
        Ok(inner.engine.load_definitions(definitions)?)
    }

    /// The current term.
    pub fn current(&self) -> Result<Term> {
        self.check("current")?;
        let inner = lock_recovering(&self.inner, "guarded interpreter");
        if inner.state == HandleState::Disposed {
            return Err(EnvError::Disposed);
        }
        Ok(inner.engine.current().clone())
    }

    pub fn set_current(&self, term: Term) -> Result<()> {
        self.check("set_current")?;
        let mut inner = lock_recovering(&self.inner, "guarded interpreter");
        if inner.state == HandleState::Disposed {
            return Err(EnvError::Disposed);
        }
        inner.engine.set_current(term);
        Ok(())
    }

    /// Snapshot of the engine's cloneable configuration (loaded rules).
    pub fn configuration(&self) -> Result<InterpreterConfig> {
        self.check("configuration")?;
        let inner = lock_recovering(&self.inner, "guarded interpreter");
        if inner.state == HandleState::Disposed {
            return Err(EnvError::Disposed);
        }
        Ok(inner.engine.configuration())
    }

    /// Marks the handle disposed; subsequent operations fail with
    /// [`EnvError::Disposed`]. Idempotent.
    pub fn dispose(&self) {
        lock_recovering(&self.inner, "guarded interpreter").state = HandleState::Disposed;
    }
}

impl std::fmt::Debug for GuardedInterpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedInterpreter")
            .field("guarded", &self.guarded)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::{NoUiThread, Strictness};

    fn env_lock() -> Arc<EnvLock> {
        Arc::new(EnvLock::new(Arc::new(NoUiThread), Strictness::Enforce))
    }

    #[test]
    fn operations_without_lock_are_discipline_violations() {
        let lock = env_lock();
        let interp = GuardedInterpreter::new(lock, true).unwrap();
        assert!(matches!(
            interp.invoke("anything").unwrap_err(),
            EnvError::LockDiscipline { .. }
        ));
        assert!(matches!(
            interp.current().unwrap_err(),
            EnvError::LockDiscipline {
                operation: "current",
                ..
            }
        ));
        // Each operation reports itself as the violating call.
        assert!(matches!(
            interp.set_current(Term::Int(0)).unwrap_err(),
            EnvError::LockDiscipline {
                operation: "set_current",
                ..
            }
        ));
    }

    #[test]
    fn operations_with_lock_succeed_and_failures_propagate() {
        let lock = env_lock();
        let interp = GuardedInterpreter::new(lock.clone(), true).unwrap();
        let _guard = lock.acquire();

        interp.load_definitions("step: A -> B\n").unwrap();
        interp.set_current(Term::atom("A")).unwrap();
        assert!(interp.invoke("step").unwrap());
        assert_eq!(interp.current().unwrap(), Term::atom("B"));

        // Catching is disabled by the factory, so a non-applicable strategy
        // is an error rather than Ok(false).
        let err = interp.invoke("step").unwrap_err();
        assert!(matches!(
            err,
            EnvError::Rewrite(weft_rewrite::RewriteError::StrategyFailed { .. })
        ));
        assert_eq!(interp.state(), HandleState::Ready);
    }

    #[test]
    fn fixed_libraries_are_wired_in_order() {
        let lock = env_lock();
        let interp = GuardedInterpreter::new(lock.clone(), true).unwrap();
        let _guard = lock.acquire();

        interp.set_current(Term::parse("Pair(1, 2)").unwrap()).unwrap();
        assert!(interp.invoke("origin-explode").unwrap());
        assert_eq!(
            interp.current().unwrap(),
            Term::parse("Origin([\"Pair\", [1, 2]])").unwrap()
        );
    }

    #[test]
    fn unguarded_handle_skips_the_check() {
        let lock = env_lock();
        let interp = GuardedInterpreter::new(lock, false).unwrap();
        interp.set_current(Term::Int(1)).unwrap();
        assert_eq!(interp.current().unwrap(), Term::Int(1));
    }

    #[test]
    fn disposed_handle_rejects_operations() {
        let lock = env_lock();
        let interp = GuardedInterpreter::new(lock.clone(), true).unwrap();
        let _guard = lock.acquire();
        interp.dispose();
        assert!(matches!(interp.current().unwrap_err(), EnvError::Disposed));
        assert_eq!(interp.state(), HandleState::Disposed);
    }
}
