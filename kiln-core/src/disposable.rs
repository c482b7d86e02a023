//! Scoped ownership of transient environment resources.

use std::sync::{
    Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};

type Callback = Box<dyn FnOnce() + Send>;

/// A named scope that owns cleanup callbacks for transient resources.
///
/// Callbacks run in reverse registration order, at most once, either on an
/// explicit [`Disposable::dispose`] or when the scope is dropped.
pub struct Disposable {
    name: String,
    callbacks: Mutex<Vec<Callback>>,
    disposed: AtomicBool,
}

impl Disposable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            callbacks: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a cleanup callback. Registering on a disposed scope runs the
    /// callback immediately.
    pub fn register(&self, callback: impl FnOnce() + Send + 'static) {
        if self.is_disposed() {
            callback();
            return;
        }
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(callback));
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Run every registered callback. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let callbacks =
            std::mem::take(&mut *self.callbacks.lock().unwrap_or_else(PoisonError::into_inner));
        tracing::debug!(scope = %self.name, count = callbacks.len(), "disposing");
        for callback in callbacks.into_iter().rev() {
            callback();
        }
    }
}

impl Drop for Disposable {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Disposable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposable")
            .field("name", &self.name)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
