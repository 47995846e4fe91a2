//! Owned, concurrent session storage.
//!
//! Each entry sits behind its own mutex: work on one id is serialized, work on
//! different ids runs in parallel. The map lock is never held while a session
//! is being mutated.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::error::{EngineError, Result};

#[derive(Debug)]
pub struct Slot<T> {
    pub value: T,
    pub last_active: Instant,
    /// Set when a resolution failed mid-turn; the slot then rejects further work.
    pub poisoned: bool,
}

/// Which error a missing id maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryKind {
    Battle,
    Session,
}

#[derive(Debug)]
pub struct SessionRegistry<T> {
    kind: RegistryKind,
    slots: DashMap<String, Arc<Mutex<Slot<T>>>>,
}

impl<T> SessionRegistry<T> {
    pub fn new(kind: RegistryKind) -> Self {
        Self {
            kind,
            slots: DashMap::new(),
        }
    }

    fn not_found(&self, id: &str) -> EngineError {
        match self.kind {
            RegistryKind::Battle => EngineError::BattleNotFound(id.to_string()),
            RegistryKind::Session => EngineError::SessionNotFound(id.to_string()),
        }
    }

    pub fn create(&self, id: impl Into<String>, value: T) -> Result<()> {
        use dashmap::mapref::entry::Entry;
        let id = id.into();
        match self.slots.entry(id) {
            Entry::Occupied(e) => Err(EngineError::DuplicateId(e.key().clone())),
            Entry::Vacant(e) => {
                let slot = Slot {
                    value,
                    last_active: Instant::now(),
                    poisoned: false,
                };
                e.insert(Arc::new(Mutex::new(slot)));
                Ok(())
            }
        }
    }

    pub fn get(&self, id: &str) -> Result<Arc<Mutex<Slot<T>>>> {
        self.slots.get(id).map(|s| Arc::clone(s.value())).ok_or_else(|| self.not_found(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.slots.contains_key(id)
    }

    pub fn remove(&self, id: &str) -> bool {
        self.slots.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Run `f` on one session under its lock.
    ///
    /// An engine-level error from `f` poisons the slot; poisoned slots fail fast
    /// until removed. Plain rejections (bad action, bad target) do not poison.
    pub fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut T) -> Result<R>) -> Result<R> {
        let slot = self.get(id)?;
        let mut guard = slot.lock();
        if guard.poisoned {
            return Err(EngineError::SessionPoisoned(id.to_string()));
        }
        guard.last_active = Instant::now();
        let result = f(&mut guard.value);
        if let Err(e) = &result {
            if !e.is_rejection() {
                warn!(id, error = %e, "session poisoned");
                guard.poisoned = true;
            }
        }
        result
    }

    /// Read-only access; does not refresh the idle clock.
    pub fn inspect<R>(&self, id: &str, f: impl FnOnce(&T) -> R) -> Result<R> {
        let slot = self.get(id)?;
        let guard = slot.lock();
        Ok(f(&guard.value))
    }

    /// Remove every entry idle for longer than `max_idle`. Returns the removed ids.
    ///
    /// Check and removal happen under the same shard lock, so an entry touched
    /// concurrently is either kept or was already idle when removed.
    pub fn sweep_idle(&self, max_idle: Duration) -> Vec<String> {
        let now = Instant::now();
        let mut stale = Vec::new();
        self.slots.retain(|id, slot| {
            // busy sessions are not idle
            let idle = slot
                .try_lock()
                .is_some_and(|slot| now.saturating_duration_since(slot.last_active) > max_idle);
            if idle {
                stale.push(id.clone());
            }
            !idle
        });
        if !stale.is_empty() {
            info!(kind = ?self.kind, swept = stale.len(), "idle sessions removed");
        }
        stale
    }
}
