//! Ordered observer registries fed by push subscriptions.

use parking_lot::RwLock;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::error;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Identifies one registered listener. Unique across all registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken(u64);

impl ListenerToken {
    fn next() -> Self {
        ListenerToken(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }
}

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Listeners for one push event type, invoked in registration order.
pub(crate) struct ListenerRegistry<T: ?Sized> {
    name: &'static str,
    isolate_panics: bool,
    listeners: RwLock<Vec<(ListenerToken, Listener<T>)>>,
}

impl<T: ?Sized> ListenerRegistry<T> {
    pub(crate) fn new(name: &'static str, isolate_panics: bool) -> Self {
        Self {
            name,
            isolate_panics,
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn register(&self, listener: Listener<T>) -> ListenerToken {
        let token = ListenerToken::next();
        self.listeners.write().push((token, listener));
        token
    }

    pub(crate) fn unregister(&self, token: ListenerToken) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(t, _)| *t != token);
        listeners.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Invoke every listener with `event`.
    ///
    /// Runs on a snapshot taken before the first call, so listeners may
    /// register or unregister from inside a callback. Returns how many
    /// listeners returned normally.
    pub(crate) fn dispatch(&self, event: &T) -> usize {
        let snapshot: Vec<Listener<T>> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        let mut delivered = 0;
        for listener in &snapshot {
            if invoke(self.name, self.isolate_panics, || listener(event)) {
                delivered += 1;
            }
        }
        delivered
    }
}

/// Run one listener call, catching a panic when `isolate` is set.
///
/// Returns false if the listener panicked.
pub(crate) fn invoke(name: &str, isolate: bool, call: impl FnOnce()) -> bool {
    if !isolate {
        call();
        return true;
    }
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(()) => true,
        Err(payload) => {
            error!(
                listener = name,
                panic = %panic_message(payload.as_ref()),
                "Listener panicked; delivery continues"
            );
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
