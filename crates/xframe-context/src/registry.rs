//! Per-type callback table.
//!
//! One callback per message type; registering again replaces the previous
//! one. Every registration gets a generation number so a stale
//! [`Registration`] cannot remove its replacement.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use xframe_envelope::Envelope;

/// A registered message handler.
pub type Callback = Rc<dyn Fn(&Envelope)>;

struct Entry {
    generation: u64,
    callback: Callback,
}

#[derive(Default)]
struct Entries {
    by_type: HashMap<String, Entry>,
    next_generation: u64,
}

/// Result of routing one envelope through the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchResult {
    Delivered,
    NoCallback,
    Panicked,
}

/// Shared handle to the callback table.
///
/// Clones refer to the same table.
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    entries: Rc<RefCell<Entries>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `callback` for `message_type`, replacing any previous one.
    pub fn register<F>(&self, message_type: &str, callback: F) -> Registration
    where
        F: Fn(&Envelope) + 'static,
    {
        self.register_rc(message_type, Rc::new(callback))
    }

    /// Like [`register`](Self::register) for an already shared callback.
    pub fn register_rc(&self, message_type: &str, callback: Callback) -> Registration {
        let (generation, replaced) = {
            let mut entries = self.entries.borrow_mut();
            entries.next_generation += 1;
            let generation = entries.next_generation;
            let replaced = entries.by_type.insert(
                message_type.to_string(),
                Entry {
                    generation,
                    callback,
                },
            );
            (generation, replaced)
        };
        // dropped outside the borrow; captured state may touch the registry
        if replaced.is_some() {
            tracing::debug!(message_type, "replaced registered callback");
        }
        drop(replaced);

        Registration {
            entries: Rc::downgrade(&self.entries),
            message_type: message_type.to_string(),
            generation,
        }
    }

    /// Route `envelope` to the callback registered for its type.
    ///
    /// The callback runs with the table unborrowed, so it may register or
    /// unregister freely. A panic inside the callback is caught and logged
    /// once at `error`. The process panic hook still runs first, so the
    /// default hook also prints the panic to stderr; embedders that want the
    /// `tracing` record alone should install their own hook with
    /// [`std::panic::set_hook`].
    pub fn dispatch(&self, envelope: &Envelope) -> DispatchResult {
        let Some(message_type) = envelope.message_type() else {
            return DispatchResult::NoCallback;
        };
        let Some(callback) = self.callback_for(message_type) else {
            tracing::trace!(message_type, "no callback registered");
            return DispatchResult::NoCallback;
        };

        match panic::catch_unwind(AssertUnwindSafe(|| callback(envelope))) {
            Ok(()) => DispatchResult::Delivered,
            Err(payload) => {
                tracing::error!(
                    message_type,
                    panic = %panic_message(&*payload),
                    "callback panicked"
                );
                DispatchResult::Panicked
            }
        }
    }

    pub fn callback_for(&self, message_type: &str) -> Option<Callback> {
        self.entries
            .borrow()
            .by_type
            .get(message_type)
            .map(|entry| Rc::clone(&entry.callback))
    }

    pub fn is_registered(&self, message_type: &str) -> bool {
        self.entries.borrow().by_type.contains_key(message_type)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered types, sorted.
    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.entries.borrow().by_type.keys().cloned().collect();
        types.sort();
        types
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("types", &self.registered_types())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Handle for one registration.
///
/// Dropping it leaves the callback installed. Call
/// [`unregister`](Self::unregister) to remove it.
#[derive(Debug, Clone)]
pub struct Registration {
    entries: Weak<RefCell<Entries>>,
    message_type: String,
    generation: u64,
}

impl Registration {
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    /// Whether this registration is still the installed one for its type.
    pub fn is_active(&self) -> bool {
        self.entries.upgrade().is_some_and(|entries| {
            entries
                .borrow()
                .by_type
                .get(&self.message_type)
                .is_some_and(|entry| entry.generation == self.generation)
        })
    }

    /// Remove the callback if it has not been replaced since.
    ///
    /// Returns true when this call removed it. Safe to call any number of
    /// times.
    pub fn unregister(&self) -> bool {
        let Some(entries) = self.entries.upgrade() else {
            return false;
        };
        let removed = {
            let mut entries = entries.borrow_mut();
            let current = entries
                .by_type
                .get(&self.message_type)
                .is_some_and(|entry| entry.generation == self.generation);
            if !current {
                tracing::trace!(
                    message_type = %self.message_type,
                    "unregister ignored for stale registration"
                );
                return false;
            }
            entries.by_type.remove(&self.message_type)
        };
        drop(removed);
        tracing::debug!(message_type = %self.message_type, "callback unregistered");
        true
    }
}
