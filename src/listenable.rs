use std::sync::Arc;

use crate::listener::Listener;

/// Something listeners can subscribe to
///
/// Implemented by [`ListenerRegistry`](crate::ListenerRegistry),
/// [`ObservableValue`](crate::ObservableValue) and [`MergedListenable`], so
/// code that only needs to subscribe can accept any of them.
pub trait Listenable {
    /// Register `listener` to be called on every notification
    fn add_listener(&self, listener: Listener);

    /// Remove the earliest registration of `listener`, if any
    fn remove_listener(&self, listener: &Listener);
}

/// A [`Listenable`] that also exposes a current value
pub trait ValueListenable<T>: Listenable {
    /// The value listeners are notified about
    fn value(&self) -> T;
}

impl<L: Listenable + ?Sized> Listenable for Arc<L> {
    fn add_listener(&self, listener: Listener) {
        (**self).add_listener(listener);
    }

    fn remove_listener(&self, listener: &Listener) {
        (**self).remove_listener(listener);
    }
}

impl<T, L: ValueListenable<T> + ?Sized> ValueListenable<T> for Arc<L> {
    fn value(&self) -> T {
        (**self).value()
    }
}

/// Fan-in over several listenables
///
/// A listener added here is added to every child, so it runs whenever any
/// child notifies. Removal is forwarded the same way. The merged listenable
/// owns no registry and never notifies by itself.
///
/// ```ignore
/// let either = merge([first.clone() as Arc<dyn Listenable + Send + Sync>, second.clone()]);
/// either.add_listener(listener.clone());
/// ```
#[derive(Clone, Default)]
pub struct MergedListenable {
    children: Vec<Arc<dyn Listenable + Send + Sync>>,
}

impl MergedListenable {
    /// Merge `children` into one listenable
    pub fn new(children: impl IntoIterator<Item = Arc<dyn Listenable + Send + Sync>>) -> Self {
        Self {
            children: children.into_iter().collect(),
        }
    }

    /// Number of merged children
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether there are no children
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Listenable for MergedListenable {
    fn add_listener(&self, listener: Listener) {
        for child in &self.children {
            child.add_listener(listener.clone());
        }
    }

    fn remove_listener(&self, listener: &Listener) {
        for child in &self.children {
            child.remove_listener(listener);
        }
    }
}

impl std::fmt::Debug for MergedListenable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergedListenable")
            .field("children", &self.children.len())
            .finish()
    }
}

/// Merge listenables into one, see [`MergedListenable`]
pub fn merge(
    children: impl IntoIterator<Item = Arc<dyn Listenable + Send + Sync>>,
) -> MergedListenable {
    MergedListenable::new(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ListenerRegistry, ObservableValue};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn merged_listener_hears_every_child() {
        let registry = Arc::new(ListenerRegistry::new());
        let value = Arc::new(ObservableValue::new(0));
        let merged = merge([
            registry.clone() as Arc<dyn Listenable + Send + Sync>,
            value.clone() as Arc<dyn Listenable + Send + Sync>,
        ]);
        assert_eq!(merged.len(), 2);

        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let listener = Listener::new(move || {
            count_clone.fetch_add(1, Ordering::Relaxed);
        });
        merged.add_listener(listener.clone());

        registry.notify();
        value.set(1);
        assert_eq!(count.load(Ordering::Relaxed), 2);

        merged.remove_listener(&listener);
        registry.notify();
        value.set(2);
        assert_eq!(count.load(Ordering::Relaxed), 2);
        assert!(!registry.has_listeners());
    }

    #[test]
    fn empty_merge_accepts_listeners() {
        let merged = MergedListenable::default();
        assert!(merged.is_empty());
        merged.add_listener(Listener::new(|| {}));
    }

    #[test]
    fn value_listenable_through_arc() {
        fn read<V: ValueListenable<&'static str>>(source: &V) -> &'static str {
            source.value()
        }
        let value = Arc::new(ObservableValue::new("ready"));
        assert_eq!(read(&value), "ready");
    }
}
