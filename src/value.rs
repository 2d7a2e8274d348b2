use parking_lot::RwLock;

use crate::listenable::{Listenable, ValueListenable};
use crate::listener::Listener;
use crate::registry::{ListenerRegistry, RegistryBuilder};

/// A single value that notifies listeners when it changes
///
/// Setting a value equal to the current one (by `PartialEq`) is a no-op.
/// Setting a different value stores it and then notifies, so listeners
/// always observe the new value.
///
/// # Example
/// ```ignore
/// let volume = ObservableValue::new(5);
/// volume.add_listener(Listener::new(|| println!("volume changed")));
///
/// volume.set(5);  // equal, nothing happens
/// volume.set(6);  // prints once
/// assert_eq!(volume.get(), 6);
/// ```
pub struct ObservableValue<T> {
    value: RwLock<T>,
    registry: ListenerRegistry,
}

impl<T: PartialEq> ObservableValue<T> {
    /// Create an observable value labelled after its type
    pub fn new(value: T) -> Self {
        Self::with_registry(value, RegistryBuilder::new())
    }

    /// Create an observable value backed by a custom-configured registry
    ///
    /// Without a custom label the registry is labelled `ObservableValue<T>`.
    pub fn with_registry(value: T, builder: RegistryBuilder) -> Self {
        let builder = if builder.has_custom_label() {
            builder
        } else {
            builder.label(format!("ObservableValue<{}>", std::any::type_name::<T>()))
        };
        Self {
            value: RwLock::new(value),
            registry: builder.build(),
        }
    }

    /// Borrow the current value
    ///
    /// The read lock is held while `f` runs; `f` must not call `set` or
    /// `update` on this value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.read())
    }

    /// Replace the value, notifying listeners if it changed
    ///
    /// Returns whether listeners were notified.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.value.write();
            if *current == value {
                return false;
            }
            *current = value;
        }
        self.registry.notify();
        true
    }

    /// The registry that delivers this value's notifications
    pub fn registry(&self) -> &ListenerRegistry {
        &self.registry
    }

    /// Register a listener, see [`ListenerRegistry::add_listener`]
    pub fn add_listener(&self, listener: Listener) {
        self.registry.add_listener(listener);
    }

    /// Remove a listener, see [`ListenerRegistry::remove_listener`]
    pub fn remove_listener(&self, listener: &Listener) {
        self.registry.remove_listener(listener);
    }

    /// Whether any listener is registered
    pub fn has_listeners(&self) -> bool {
        self.registry.has_listeners()
    }

    /// Dispose the underlying registry, see [`ListenerRegistry::dispose`]
    pub fn dispose(&self) {
        self.registry.dispose();
    }
}

impl<T: Clone + PartialEq> ObservableValue<T> {
    /// Current value
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Modify a copy of the value, then store it as [`set`](Self::set) would
    ///
    /// `f` runs without any lock held, so it may read this value. If `f`
    /// panics the stored value is left untouched. Returns whether listeners
    /// were notified.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let mut draft = self.get();
        f(&mut draft);
        self.set(draft)
    }
}

impl<T: PartialEq + Default> Default for ObservableValue<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ObservableValue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableValue")
            .field("value", &*self.value.read())
            .field("registry", &self.registry)
            .finish()
    }
}

impl<T: PartialEq> Listenable for ObservableValue<T> {
    fn add_listener(&self, listener: Listener) {
        self.registry.add_listener(listener);
    }

    fn remove_listener(&self, listener: &Listener) {
        self.registry.remove_listener(listener);
    }
}

impl<T: Clone + PartialEq> ValueListenable<T> for ObservableValue<T> {
    fn value(&self) -> T {
        self.get()
    }
}
