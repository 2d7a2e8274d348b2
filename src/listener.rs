use std::fmt;
use std::sync::Arc;

/// Shared handle to a change callback
///
/// A `Listener` is what gets registered with a [`ListenerRegistry`] and later
/// passed back to remove it. Equality is identity: two listeners are equal
/// only if one is a clone of the other. Wrapping the same closure twice
/// produces two different listeners.
///
/// # Usage
/// ```ignore
/// let listener = Listener::new(|| println!("changed"));
/// registry.add_listener(listener.clone());
/// // ...
/// registry.remove_listener(&listener);
/// ```
///
/// [`ListenerRegistry`]: crate::ListenerRegistry
#[derive(Clone)]
pub struct Listener {
    callback: Arc<dyn Fn() + Send + Sync>,
}

impl Listener {
    /// Wrap a callback in a new listener handle
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(f),
        }
    }

    /// Invoke the callback
    pub fn call(&self) {
        (self.callback)();
    }

    /// Whether `other` is a handle to the same callback
    pub fn ptr_eq(&self, other: &Listener) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }

    fn addr(&self) -> *const () {
        Arc::as_ptr(&self.callback) as *const ()
    }
}

impl<F> From<F> for Listener
where
    F: Fn() + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self::new(f)
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Listener {}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener").field(&self.addr()).finish()
    }
}
