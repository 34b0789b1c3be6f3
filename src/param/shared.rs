//! Mutex-wrapped parameter store for multi-context pipelines.
//!
//! The bus receivers, the compute tick and the persistence task all touch
//! the store; this wrapper makes every operation atomic with respect to the
//! others. Pick the raw mutex for the platform: `NoopRawMutex` inside a
//! single executor, `CriticalSectionRawMutex` across cores or interrupts.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::{Duration, Instant};

use super::id::ParamId;
use super::store::{ChangeHook, ObserverToken, ParamStore, Source};

pub struct SharedParamStore<M: RawMutex> {
    inner: Mutex<M, RefCell<ParamStore>>,
}

impl<M: RawMutex> Default for SharedParamStore<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> SharedParamStore<M> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(ParamStore::new())),
        }
    }

    pub fn update(&self, id: ParamId, value: f32, source: Source, timestamp: Instant) {
        self.inner
            .lock(|s| s.borrow_mut().update(id, value, source, timestamp));
    }

    pub fn get(&self, id: ParamId) -> Option<f32> {
        self.inner.lock(|s| s.borrow().get(id))
    }

    pub fn get_with_time(&self, id: ParamId) -> Option<(f32, Instant)> {
        self.inner.lock(|s| s.borrow().get_with_time(id))
    }

    pub fn is_fresh(&self, id: ParamId, now: Instant, max_age: Duration) -> bool {
        self.inner.lock(|s| s.borrow().is_fresh(id, now, max_age))
    }

    pub fn age(&self, id: ParamId, now: Instant) -> Duration {
        self.inner.lock(|s| s.borrow().age(id, now))
    }

    pub fn invalidate(&self, id: ParamId) {
        self.inner.lock(|s| s.borrow_mut().invalidate(id));
    }

    pub fn register_observer(&self, hook: ChangeHook) -> Option<ObserverToken> {
        self.inner.lock(|s| s.borrow_mut().register_observer(hook))
    }

    pub fn remove_observer(&self, token: ObserverToken) {
        self.inner.lock(|s| s.borrow_mut().remove_observer(token));
    }

    /// Run a closure against the store under the lock. Receivers use this
    /// to deposit a whole frame's worth of updates in one acquisition.
    pub fn with<R>(&self, f: impl FnOnce(&mut ParamStore) -> R) -> R {
        self.inner.lock(|s| f(&mut s.borrow_mut()))
    }
}
