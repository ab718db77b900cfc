/*!
 * Shared Counter Store
 *
 * A counter and an optional fixed-capacity text buffer behind one lock.
 *
 * The lock is built together with the store, so there is no state in which
 * the protected data exists but its lock does not. All fields are private
 * and every accessor goes through `with_state`, which holds the lock for the
 * whole access. `parking_lot::Mutex` releases on unwind and never poisons,
 * so a worker that panics inside a critical section cannot leave the store
 * locked.
 */

use crate::core::errors::ResourceError;
use crate::core::types::ResourceResult;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, trace};

/// Fixed-capacity text storage
#[derive(Debug)]
struct TextBuffer {
    capacity: usize,
    content: String,
}

impl TextBuffer {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            content: String::with_capacity(capacity),
        }
    }

    /// Replace the content, or reject without touching it
    fn write(&mut self, text: &str) -> ResourceResult<()> {
        if text.len() > self.capacity {
            return Err(ResourceError::Capacity {
                requested: text.len(),
                capacity: self.capacity,
            });
        }
        self.content.clear();
        self.content.push_str(text);
        Ok(())
    }
}

#[derive(Debug)]
struct StoreState {
    counter: u64,
    shared_text: Option<TextBuffer>,
}

/// Point-in-time view of the store, taken under one lock acquisition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreSnapshot {
    pub counter: u64,
    pub shared_text: Option<String>,
    pub shared_text_capacity: Option<usize>,
}

/// Process-scoped counter and shared text
///
/// Construct once and hand out `Arc<SharedCounterStore>`.
#[derive(Debug)]
pub struct SharedCounterStore {
    state: Mutex<StoreState>,
}

impl SharedCounterStore {
    /// Store with a zero counter and no shared text storage
    pub fn new() -> Self {
        Self::with_initial(0)
    }

    /// Store starting from `counter`
    pub fn with_initial(counter: u64) -> Self {
        Self {
            state: Mutex::new(StoreState {
                counter,
                shared_text: None,
            }),
        }
    }

    /// Attach shared text storage of `capacity` bytes
    pub fn with_shared_text(self, capacity: usize) -> Self {
        let mut state = self.state.into_inner();
        state.shared_text = Some(TextBuffer::with_capacity(capacity));
        debug!(capacity, "shared text storage attached");
        Self {
            state: Mutex::new(state),
        }
    }

    #[inline]
    fn with_state<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        let mut state = self.state.lock();
        f(&mut state)
    }

    /// Add one to the counter, returning the new value
    pub fn increment(&self) -> ResourceResult<u64> {
        let counter = self.with_state(|state| {
            state.counter = state
                .counter
                .checked_add(1)
                .ok_or(ResourceError::CounterOverflow)?;
            Ok::<_, ResourceError>(state.counter)
        })?;
        trace!(counter, "counter incremented");
        Ok(counter)
    }

    pub fn read_counter(&self) -> u64 {
        self.with_state(|state| state.counter)
    }

    /// Overwrite the shared text
    ///
    /// Text longer than the capacity is rejected with `Capacity` and the
    /// existing content stays as it was. Fails with `Configuration` when the
    /// store was built without text storage.
    pub fn write_shared_text(&self, text: &str) -> ResourceResult<()> {
        match self.write_shared_text_if_present(text)? {
            true => Ok(()),
            false => Err(ResourceError::Configuration(
                "store has no shared text storage".to_string(),
            )),
        }
    }

    /// Overwrite the shared text if storage exists
    ///
    /// Presence is checked under the same lock as the write. Returns whether
    /// a write happened.
    pub fn write_shared_text_if_present(&self, text: &str) -> ResourceResult<bool> {
        self.with_state(|state| match state.shared_text.as_mut() {
            Some(buffer) => buffer.write(text).map(|()| true),
            None => Ok(false),
        })
    }

    pub fn has_shared_text(&self) -> bool {
        self.with_state(|state| state.shared_text.is_some())
    }

    /// Copy of the current shared text, if storage exists
    pub fn read_shared_text(&self) -> Option<String> {
        self.with_state(|state| state.shared_text.as_ref().map(|b| b.content.clone()))
    }

    pub fn shared_text_capacity(&self) -> Option<usize> {
        self.with_state(|state| state.shared_text.as_ref().map(|b| b.capacity))
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.with_state(|state| StoreSnapshot {
            counter: state.counter,
            shared_text: state.shared_text.as_ref().map(|b| b.content.clone()),
            shared_text_capacity: state.shared_text.as_ref().map(|b| b.capacity),
        })
    }
}

impl Default for SharedCounterStore {
    fn default() -> Self {
        Self::new()
    }
}
