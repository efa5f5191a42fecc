//! Observable value cell.
//!
//! A [`Store`] holds one value and an ordered list of listeners. Writes
//! replace the value and then notify every listener synchronously, in
//! registration order, before returning. No lock is held while listeners
//! run, so a listener may read or write the same store again; such nested
//! writes notify fully before the outer notification loop resumes.
//!
//! ```rust
//! use stagehand::store::Store;
//! use std::sync::{Arc, Mutex};
//!
//! let store = Store::new(1);
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let sink = Arc::clone(&seen);
//! let subscription = store.subscribe(move |value: &i32| sink.lock().unwrap().push(*value));
//! store.set(2);
//! subscription.unsubscribe();
//! store.set(3);
//!
//! assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
//! ```

mod patch;

pub use patch::{JsonContext, Patch};

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Inner<T> {
    value: T,
    listeners: Vec<(u64, Listener<T>)>,
    next_id: u64,
}

/// Shared, observable holder of a single value.
///
/// Cloning a `Store` yields another handle to the same cell.
pub struct Store<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Store<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                value,
                listeners: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.inner.lock().value.clone()
    }

    /// Replace the value and notify listeners.
    pub fn set(&self, value: T) {
        self.update(|current| *current = value);
    }

    /// Mutate the value in place and notify listeners.
    ///
    /// `f` runs under the cell's lock and must not touch this store.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        let (value, listeners) = {
            let mut inner = self.inner.lock();
            f(&mut inner.value);
            (inner.value.clone(), Self::snapshot(&inner))
        };
        Self::notify(&value, listeners);
    }

    /// Replace the value only if it still equals `expected`.
    ///
    /// Listeners are notified only when the swap happened. Returns whether it
    /// did.
    pub fn set_if(&self, expected: &T, value: T) -> bool
    where
        T: PartialEq,
    {
        let (value, listeners) = {
            let mut inner = self.inner.lock();
            if inner.value != *expected {
                return false;
            }
            inner.value = value;
            (inner.value.clone(), Self::snapshot(&inner))
        };
        Self::notify(&value, listeners);
        true
    }

    /// Register `listener`, deliver the current value to it immediately and
    /// return a handle that removes it again.
    ///
    /// The listener is registered before the initial delivery, so writes made
    /// while handling that delivery reach it too.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let listener: Listener<T> = Arc::new(listener);
        let (id, value) = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.push((id, Arc::clone(&listener)));
            (id, inner.value.clone())
        };

        listener(&value);

        let weak: Weak<Mutex<Inner<T>>> = Arc::downgrade(&self.inner);
        Subscription {
            remove: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.lock().listeners.retain(|(existing, _)| *existing != id);
                }
            })),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    fn snapshot(inner: &Inner<T>) -> Vec<Listener<T>> {
        inner
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    fn notify(value: &T, listeners: Vec<Listener<T>>) {
        for listener in listeners {
            listener(value);
        }
    }
}

/// Handle returned by [`Store::subscribe`].
///
/// Dropping it leaves the listener registered; call
/// [`unsubscribe`](Subscription::unsubscribe) to remove it.
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.remove.is_some())
            .finish()
    }
}
