use std::marker::PhantomData;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{EnvError, Result};

/// Classifies the calling thread as the host's designated UI/event thread.
///
/// Injected by the host platform adapter; the environment never infers UI
/// identity from thread names.
pub trait UiThreadProbe: Send + Sync {
    fn is_ui_thread(&self) -> bool;
}

/// Probe for hosts without an event loop: no thread is the UI thread, which
/// disables the background-caller check.
#[derive(Debug, Default)]
pub struct NoUiThread;

impl UiThreadProbe for NoUiThread {
    fn is_ui_thread(&self) -> bool {
        false
    }
}

/// Probe pinned to a single thread, designated once at startup.
#[derive(Debug)]
pub struct PinnedUiThread {
    ui: ThreadId,
}

impl PinnedUiThread {
    /// Designates the calling thread as the UI thread.
    pub fn designate_current() -> Self {
        Self::designate(thread::current().id())
    }

    pub fn designate(ui: ThreadId) -> Self {
        Self { ui }
    }
}

impl UiThreadProbe for PinnedUiThread {
    fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.ui
    }
}

/// How lock-discipline violations are handled. Chosen by the host at
/// environment construction; the checks themselves are always compiled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strictness {
    /// Violations fail the operation with [`EnvError::LockDiscipline`].
    Enforce,
    /// Violations are logged and the operation proceeds.
    Log,
    /// No checking.
    Skip,
}

impl Default for Strictness {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Strictness::Enforce
        } else {
            Strictness::Log
        }
    }
}

#[derive(Debug, Default)]
struct OwnerState {
    owner: Option<ThreadId>,
    depth: usize,
}

/// The reentrant lock serializing all interpreter access in one environment.
///
/// The same thread may reacquire without self-deadlock (guarded interpreter
/// calls recurse into other guarded calls). The UI thread may hold the lock,
/// but must never wait on a background thread that itself needs it; that
/// deadlock cannot be prevented structurally, only surfaced by the
/// [`EnvLock::acquire_background`] probe check and [`EnvLock::assert_held`].
pub struct EnvLock {
    state: Mutex<OwnerState>,
    released: Condvar,
    probe: Arc<dyn UiThreadProbe>,
    strictness: Strictness,
}

impl EnvLock {
    pub(crate) fn new(probe: Arc<dyn UiThreadProbe>, strictness: Strictness) -> Self {
        Self {
            state: Mutex::new(OwnerState::default()),
            released: Condvar::new(),
            probe,
            strictness,
        }
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    /// Blocking, reentrant acquisition.
    pub fn acquire(&self) -> EnvGuard<'_> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        loop {
            match state.owner {
                None => {
                    state.owner = Some(me);
                    state.depth = 1;
                    break;
                }
                Some(owner) if owner == me => {
                    state.depth += 1;
                    break;
                }
                Some(_) => self.released.wait(&mut state),
            }
        }
        EnvGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    /// Non-blocking acquisition, for UI-thread call sites that must not
    /// stall behind background holders.
    pub fn try_acquire(&self) -> Option<EnvGuard<'_>> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        match state.owner {
            None => {
                state.owner = Some(me);
                state.depth = 1;
            }
            Some(owner) if owner == me => state.depth += 1,
            Some(_) => return None,
        }
        Some(EnvGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    /// Acquisition for background workers: checks that the caller is NOT the
    /// UI thread before blocking, surfacing UI/background deadlock risk as a
    /// discipline violation instead of a production hang.
    pub fn acquire_background(&self) -> Result<EnvGuard<'_>> {
        if self.probe.is_ui_thread() {
            self.violation(
                "acquire_background",
                "background acquire attempted on the designated UI thread",
            )?;
        }
        Ok(self.acquire())
    }

    pub fn is_held_by_current_thread(&self) -> bool {
        self.state.lock().owner == Some(thread::current().id())
    }

    /// Checks that the calling thread holds the lock; used at the top of
    /// every guarded interpreter operation so call sites that forget to
    /// acquire fail deterministically instead of racing.
    pub fn assert_held(&self, operation: &'static str) -> Result<()> {
        if matches!(self.strictness, Strictness::Skip) {
            return Ok(());
        }
        if self.is_held_by_current_thread() {
            return Ok(());
        }
        self.violation(operation, "environment lock not held by calling thread")
    }

    fn violation(&self, operation: &'static str, reason: &str) -> Result<()> {
        match self.strictness {
            Strictness::Enforce => Err(EnvError::LockDiscipline {
                operation,
                reason: reason.to_string(),
            }),
            Strictness::Log => {
                tracing::warn!(
                    target: "weft.env",
                    operation,
                    reason,
                    "lock discipline violation"
                );
                Ok(())
            }
            Strictness::Skip => Ok(()),
        }
    }

    fn release(&self) {
        let mut state = self.state.lock();
        debug_assert_eq!(state.owner, Some(thread::current().id()));
        state.depth -= 1;
        if state.depth == 0 {
            state.owner = None;
            drop(state);
            self.released.notify_one();
        }
    }
}

impl std::fmt::Debug for EnvLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("EnvLock")
            .field("owner", &state.owner)
            .field("depth", &state.depth)
            .field("strictness", &self.strictness)
            .finish()
    }
}

/// RAII guard for [`EnvLock`]; releases one level of reentrancy on drop.
///
/// Deliberately `!Send`: a guard must be released on the thread that
/// acquired it.
pub struct EnvGuard<'a> {
    lock: &'a EnvLock,
    _not_send: PhantomData<*const ()>,
}

impl Drop for EnvGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

impl std::fmt::Debug for EnvGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvGuard").finish_non_exhaustive()
    }
}
