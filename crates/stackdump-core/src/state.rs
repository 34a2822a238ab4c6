//! # Shared State
//!
//! The only state that outlives a single capture:
//!
//! - a process-wide lock serialising capture and symbolication, since the
//!   unwinder, the loader queries and the translator are not safe to run
//!   concurrently within one process
//! - an optional snapshot of the process's module map, parsed on first use and
//!   then reused read-only for the rest of the process's life
//!
//! [`SharedState::global`] is the instance used by default. Tests and
//! embedders can create their own and hand it to a
//! [`Tracer`](crate::Tracer), which keeps unrelated tracers from contending on
//! one lock. State is never torn down: a snapshot, once taken, is never
//! refreshed, so later traces may describe modules loaded or unloaded since.

use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::{Mutex, MutexGuard};

use crate::error::Result;
use crate::modules::ModuleMap;

static GLOBAL: Lazy<Arc<SharedState>> = Lazy::new(|| Arc::new(SharedState::new()));

/// Serialisation lock plus cached module map.
#[derive(Debug, Default)]
pub struct SharedState
{
    lock: Mutex<()>,
    snapshot: OnceCell<Arc<ModuleMap>>,
}

impl SharedState
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// The process-wide instance.
    pub fn global() -> Arc<SharedState>
    {
        Arc::clone(&GLOBAL)
    }

    /// Block until no other capture holds the lock.
    ///
    /// The lock is not reentrant: calling back into a tracer sharing this
    /// state while holding the guard deadlocks.
    pub fn lock(&self) -> MutexGuard<'_, ()>
    {
        self.lock.lock()
    }

    /// The cached module map, reading `/proc/self/maps` on first use.
    ///
    /// ## Errors
    ///
    /// Returns an error if the region listing cannot be read or parsed; the
    /// next call tries again.
    pub fn snapshot(&self) -> Result<Arc<ModuleMap>>
    {
        self.snapshot
            .get_or_try_init(|| ModuleMap::from_proc_self().map(Arc::new))
            .map(Arc::clone)
    }

    /// Install `map` as the snapshot if none has been taken yet.
    ///
    /// Returns `false` when a snapshot already exists; it is left unchanged.
    pub fn seed_snapshot(&self, map: ModuleMap) -> bool
    {
        self.snapshot.set(Arc::new(map)).is_ok()
    }

    pub fn has_snapshot(&self) -> bool
    {
        self.snapshot.get().is_some()
    }
}

#[cfg(test)]
mod tests
{
    use std::path::Path;

    use super::*;
    use crate::types::Address;

    #[test]
    fn test_seeded_snapshot_is_never_replaced()
    {
        let state = SharedState::new();
        let first = ModuleMap::parse("1000-2000 r-xp 00000000 00:00 1 /first\n").unwrap();
        let second = ModuleMap::parse("1000-2000 r-xp 00000000 00:00 1 /second\n").unwrap();

        assert!(state.seed_snapshot(first));
        assert!(!state.seed_snapshot(second));

        let snapshot = state.snapshot().unwrap();
        let (path, _) = snapshot.lookup(Address::from(0x1800_u64)).unwrap();
        assert_eq!(path, Path::new("/first"));
    }

    #[test]
    fn test_global_is_shared()
    {
        assert!(Arc::ptr_eq(&SharedState::global(), &SharedState::global()));
    }
}
