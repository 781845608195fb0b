use std::sync::{Mutex, MutexGuard};

/// Locks a std mutex, recovering from poisoning instead of panicking.
///
/// Poisoning here means a holder panicked mid-update; the maps and sets
/// guarded this way are always left structurally valid, so continuing with
/// the recovered guard is safe.
#[track_caller]
pub(crate) fn lock_recovering<'a, T>(mutex: &'a Mutex<T>, what: &'static str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(err) => {
            let loc = std::panic::Location::caller();
            tracing::error!(
                target: "weft.env",
                what,
                file = loc.file(),
                line = loc.line(),
                "mutex poisoned; continuing with recovered guard"
            );
            err.into_inner()
        }
    }
}
