//! Singletons are not a separate storage class - a singleton is a regular binding whose factory
//! is wrapped in a [SingletonSlot]. The slot guarantees the wrapped factory runs at most once
//! successfully, no matter how many threads resolve the key concurrently, and commits the result
//! as the container instance for its key. From then on, the instance short-circuits the binding.
//!
//! Presence is tracked with an explicit state token, never inferred from the stored value:
//!
//! * `Unset` - nothing was created yet (or the last attempt failed)
//! * `Creating` - some thread is running the factory; others wait for the outcome
//! * `Set` - the instance exists and is returned to every caller
//!
//! Note: a factory resolving its own key while being constructed would wait for itself forever,
//! so such re-entrant resolution is reported as [ContainerError::CircularResolution] instead. The
//! same applies to cycles spanning several threads: each container keeps a record of which thread
//! creates which singleton and which singleton every blocked thread waits for. A thread about to
//! wait for a chain of creations leading back to itself fails instead.
//!
//! If the container is reset while a factory runs, the created value is returned to its resolver
//! but not cached in the container.

use crate::container::Container;
use crate::error::ContainerError;
use crate::instance::{Factory, Instance};
use fxhash::FxHashMap;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{debug, trace};

static NEXT_SLOT_ID: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug)]
enum SlotState {
    Unset,
    Creating(ThreadId),
    Set(Instance),
}

/// Wait-for record of singleton creations in a single container.
#[derive(Debug, Default)]
pub(crate) struct ResolutionTracker {
    owners: FxHashMap<usize, ThreadId>,
    waiting: FxHashMap<ThreadId, usize>,
}

impl ResolutionTracker {
    fn start_creating(&mut self, slot: usize, owner: ThreadId) {
        self.owners.insert(slot, owner);
    }

    fn finish_creating(&mut self, slot: usize) {
        self.owners.remove(&slot);
    }

    /// Records `waiter` as waiting for `slot`. Returns `false`, without recording anything, if
    /// the owners of `slot` and of everything they wait for lead back to `waiter`.
    fn start_waiting(&mut self, waiter: ThreadId, slot: usize) -> bool {
        let mut next = slot;
        // a chain cannot be longer than the number of waiting threads
        for _ in 0..=self.waiting.len() {
            match self.owners.get(&next) {
                Some(owner) if *owner == waiter => return false,
                Some(owner) => match self.waiting.get(owner) {
                    Some(slot) => next = *slot,
                    None => break,
                },
                None => break,
            }
        }

        self.waiting.insert(waiter, slot);
        true
    }

    fn stop_waiting(&mut self, waiter: ThreadId) {
        self.waiting.remove(&waiter);
    }
}

/// Per-key creation state of a singleton.
pub(crate) struct SingletonSlot {
    id: usize,
    key: String,
    factory: Factory,
    state: Mutex<SlotState>,
    ready: Condvar,
}

impl SingletonSlot {
    pub(crate) fn new(key: String, factory: Factory) -> Self {
        Self {
            id: NEXT_SLOT_ID.fetch_add(1, Ordering::Relaxed),
            key,
            factory,
            state: Mutex::new(SlotState::Unset),
            ready: Condvar::new(),
        }
    }

    pub(crate) fn resolve(&self, container: &Container) -> Result<Instance, ContainerError> {
        let current_thread = thread::current().id();
        let generation = {
            let mut state = self.state.lock();
            loop {
                match &*state {
                    SlotState::Set(instance) => return Ok(instance.clone()),
                    SlotState::Creating(owner) if *owner == current_thread => {
                        return Err(ContainerError::CircularResolution(self.key.clone()));
                    }
                    SlotState::Creating(_) => {}
                    SlotState::Unset => break,
                }

                if !container
                    .resolutions()
                    .lock()
                    .start_waiting(current_thread, self.id)
                {
                    return Err(ContainerError::CircularResolution(self.key.clone()));
                }

                self.ready.wait(&mut state);

                container.resolutions().lock().stop_waiting(current_thread);
            }

            if let Some(instance) = container.cached_instance(&self.key) {
                *state = SlotState::Set(instance.clone());
                return Ok(instance);
            }

            *state = SlotState::Creating(current_thread);
            container
                .resolutions()
                .lock()
                .start_creating(self.id, current_thread);

            container.generation()
        };

        let token = CreationToken {
            slot: self,
            container,
        };

        trace!("Creating singleton: {}", self.key);
        let instance = (self.factory)(container)?;

        if !container.commit_instance(&self.key, instance.clone(), generation) {
            debug!(
                "Container reset while creating singleton {} - not caching it.",
                self.key
            );
        }

        token.commit(instance.clone());

        Ok(instance)
    }
}

/// Held by the thread running the factory. Unless committed, returns the slot to `Unset` when
/// dropped - also when the factory fails or panics - so waiting threads can retry.
struct CreationToken<'a> {
    slot: &'a SingletonSlot,
    container: &'a Container,
}

impl CreationToken<'_> {
    fn commit(self, instance: Instance) {
        self.finish(SlotState::Set(instance));
        std::mem::forget(self);
    }

    fn finish(&self, state: SlotState) {
        let mut current = self.slot.state.lock();
        *current = state;
        self.container
            .resolutions()
            .lock()
            .finish_creating(self.slot.id);
        drop(current);

        self.slot.ready.notify_all();
    }
}

impl Drop for CreationToken<'_> {
    fn drop(&mut self) {
        self.finish(SlotState::Unset);
    }
}

/// Wraps given factory in a [SingletonSlot].
pub(crate) fn singleton_factory(key: String, factory: Factory) -> Factory {
    let slot = SingletonSlot::new(key, factory);
    Arc::new(move |container: &Container| slot.resolve(container))
}
