/*!
 * Singleton Registry
 *
 * Lazily constructed, explicitly owned single instance.
 *
 * ## States
 *
 * ```text
 * Uninitialized --get_or_create--> Initializing --factory ok--> Ready
 *       ^                               |                         |
 *       +------- factory error/panic ---+                         |
 *                                                                 v
 * (any state) -----------------------shutdown------------------> Destroyed
 * ```
 *
 * Exactly one caller runs the factory; the others wait on a condvar until
 * the instance is Ready (or construction fails). The factory runs without
 * the lock held. `shutdown` is the only way out of Ready and the registry
 * never leaves Destroyed.
 */

mod context;

pub use context::ServiceContext;

use crate::core::errors::ResourceError;
use crate::core::types::ResourceResult;
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

type Factory<T> = Box<dyn Fn() -> ResourceResult<T> + Send + Sync>;

enum RegistryState<T> {
    Uninitialized,
    Initializing,
    Ready(Arc<T>),
    Destroyed,
}

/// Observable registry state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryStatus {
    Uninitialized,
    Initializing,
    Ready,
    Destroyed,
}

impl<T> RegistryState<T> {
    fn status(&self) -> RegistryStatus {
        match self {
            RegistryState::Uninitialized => RegistryStatus::Uninitialized,
            RegistryState::Initializing => RegistryStatus::Initializing,
            RegistryState::Ready(_) => RegistryStatus::Ready,
            RegistryState::Destroyed => RegistryStatus::Destroyed,
        }
    }
}

pub struct SingletonRegistry<T> {
    state: Mutex<RegistryState<T>>,
    ready: Condvar,
    factory: Factory<T>,
    constructions: AtomicU64,
}

/// Rolls Initializing back to Uninitialized if the factory unwinds
struct InitializingGuard<'a, T> {
    registry: &'a SingletonRegistry<T>,
    armed: bool,
}

impl<T> Drop for InitializingGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.registry.state.lock();
            if matches!(*state, RegistryState::Initializing) {
                *state = RegistryState::Uninitialized;
            }
            drop(state);
            self.registry.ready.notify_all();
            warn!("singleton construction unwound, registry reset");
        }
    }
}

impl<T: Send + Sync> SingletonRegistry<T> {
    /// Create an empty registry; `factory` runs on first access
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> ResourceResult<T> + Send + Sync + 'static,
    {
        Self {
            state: Mutex::new(RegistryState::Uninitialized),
            ready: Condvar::new(),
            factory: Box::new(factory),
            constructions: AtomicU64::new(0),
        }
    }

    /// Return the instance, constructing it on first call
    ///
    /// Concurrent first callers block until the single construction
    /// finishes. Fails with `RegistryClosed` after `shutdown`, and with the
    /// factory's error if construction fails (the next call retries).
    pub fn get_or_create(&self) -> ResourceResult<Arc<T>> {
        let mut state = self.state.lock();
        loop {
            match &*state {
                RegistryState::Ready(instance) => return Ok(Arc::clone(instance)),
                RegistryState::Destroyed => return Err(ResourceError::RegistryClosed),
                RegistryState::Initializing => self.ready.wait(&mut state),
                RegistryState::Uninitialized => break,
            }
        }
        *state = RegistryState::Initializing;
        drop(state);

        let mut guard = InitializingGuard {
            registry: self,
            armed: true,
        };
        let result = (self.factory)();
        guard.armed = false;

        let mut state = self.state.lock();
        let outcome = match result {
            Ok(instance) => {
                let instance = Arc::new(instance);
                *state = RegistryState::Ready(Arc::clone(&instance));
                self.constructions.fetch_add(1, Ordering::SeqCst);
                Ok(instance)
            }
            Err(e) => {
                *state = RegistryState::Uninitialized;
                Err(e)
            }
        };
        drop(state);
        self.ready.notify_all();

        // Logged after the lock is released; the subscriber may block on I/O
        match &outcome {
            Ok(_) => info!(
                constructions = self.construction_count(),
                "singleton instance constructed"
            ),
            Err(e) => warn!(error = %e, "singleton construction failed"),
        }
        outcome
    }

    /// The instance if it is Ready, without constructing it
    pub fn get(&self) -> Option<Arc<T>> {
        match &*self.state.lock() {
            RegistryState::Ready(instance) => Some(Arc::clone(instance)),
            _ => None,
        }
    }

    /// Close the registry, releasing the instance
    ///
    /// Waits for an in-flight construction to finish first. Returns `true`
    /// when an instance was held and has been released by the registry; the
    /// value itself is dropped once the last outstanding `Arc` goes away.
    /// Later calls are no-ops returning `false`.
    pub fn shutdown(&self) -> bool {
        let mut state = self.state.lock();
        while matches!(*state, RegistryState::Initializing) {
            self.ready.wait(&mut state);
        }
        let previous = std::mem::replace(&mut *state, RegistryState::Destroyed);
        drop(state);
        self.ready.notify_all();

        match previous {
            RegistryState::Ready(instance) => {
                debug!(
                    outstanding_refs = Arc::strong_count(&instance) - 1,
                    "singleton instance released"
                );
                drop(instance);
                info!("singleton registry shut down");
                true
            }
            RegistryState::Destroyed => false,
            _ => {
                info!("singleton registry closed before construction");
                false
            }
        }
    }

    pub fn status(&self) -> RegistryStatus {
        self.state.lock().status()
    }

    /// How many times the factory produced an instance
    pub fn construction_count(&self) -> u64 {
        self.constructions.load(Ordering::SeqCst)
    }
}
