use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::arena::{EntryId, EntryList};
use crate::error::ListenerPanic;
use crate::listenable::Listenable;
use crate::listener::Listener;
use crate::report::{ErrorReporter, ListenerErrorDetails, TracingReporter};

/// Default number of entry slots allocated up front.
pub const DEFAULT_CAPACITY: usize = 4;

/// Default diagnostic label.
pub const DEFAULT_LABEL: &str = "ListenerRegistry";

/// Ordered set of listeners that can be notified of a change
///
/// Embed a `ListenerRegistry` in any type that wants to tell observers
/// "something changed", and call [`notify()`](Self::notify) whenever it does.
///
/// # Reentrancy
/// All methods take `&self`. Listeners may add, remove, or notify while a
/// notification is in progress:
/// - listeners added during a pass are first called by the next pass
/// - listeners removed during a pass are not called again, including a
///   listener removing itself
/// - a nested `notify()` runs its own complete pass
///
/// The internal lock is never held while a listener runs. Several threads
/// may notify at once; each pass keeps its own cursors and delivers to every
/// listener in its span.
///
/// # Failures
/// A panicking listener is caught, reported to the registry's
/// [`ErrorReporter`], and the pass continues with the next listener. A panic
/// inside the reporter itself is caught too and logged through `tracing`.
///
/// # Disposal
/// [`dispose()`](Self::dispose) is terminal. Every later call panics, since
/// using a disposed registry is a programming error.
pub struct ListenerRegistry {
    state: Mutex<RegistryState>,
    label: String,
    reporter: Arc<dyn ErrorReporter>,
}

enum RegistryState {
    Live(LiveRegistry),
    Disposed,
}

struct LiveRegistry {
    entries: EntryList,
    /// Cursor pairs for every notification pass in progress, in start order.
    passes: Vec<Pass>,
    /// Id handed to the next pass.
    next_pass: u64,
}

/// Position of one notification pass.
///
/// `active` is the entry most recently handed to a listener call (None before
/// the first one). `boundary` is the last entry that existed when the pass
/// started; entries appended after it are outside the pass.
#[derive(Clone, Copy, Debug)]
struct Pass {
    id: u64,
    active: Option<EntryId>,
    boundary: Option<EntryId>,
}

impl LiveRegistry {
    /// Remove an entry and pull back any pass cursor that points at it.
    ///
    /// Cursors move to the predecessor, so the next advance lands on the
    /// successor of the removed entry and the boundary still marks the end of
    /// the original span.
    fn unlink(&mut self, id: EntryId) {
        let prev = self.entries.prev(id);
        for pass in &mut self.passes {
            if pass.boundary == Some(id) {
                cov_mark::hit!(removal_retreats_boundary);
                pass.boundary = prev;
            }
            if pass.active == Some(id) {
                cov_mark::hit!(removal_retreats_active);
                pass.active = prev;
            }
        }
        self.entries.unlink(id);
    }

    /// Open a pass spanning every current entry. None if there are no entries.
    fn begin_pass(&mut self) -> Option<u64> {
        let boundary = self.entries.last()?;
        let id = self.next_pass;
        self.next_pass += 1;
        self.passes.push(Pass {
            id,
            active: None,
            boundary: Some(boundary),
        });
        Some(id)
    }

    /// Move the pass `pass_id` to its next entry and return that listener.
    ///
    /// Returns None once the boundary entry has been handed out or the span
    /// has emptied.
    fn advance(&mut self, pass_id: u64) -> Option<Listener> {
        let pass = self.passes.iter_mut().find(|pass| pass.id == pass_id)?;
        let boundary = pass.boundary?;
        if pass.active == Some(boundary) {
            return None;
        }
        let next = match pass.active {
            Some(active) => self.entries.next(active),
            None => self.entries.first(),
        }?;
        pass.active = Some(next);
        self.entries.get(next).map(|entry| entry.listener.clone())
    }
}

/// Closes its pass, even if dispatch unwinds.
///
/// Passes on other threads start and finish independently, so the pass is
/// found by id.
struct PassGuard<'a> {
    registry: &'a ListenerRegistry,
    pass_id: u64,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        if let RegistryState::Live(live) = &mut *self.registry.state.lock() {
            let pass_id = self.pass_id;
            if let Some(index) = live.passes.iter().position(|pass| pass.id == pass_id) {
                live.passes.remove(index);
            }
        }
    }
}

impl ListenerRegistry {
    /// Create an empty registry with default settings
    pub fn new() -> Self {
        RegistryBuilder::new().build()
    }

    /// Start configuring a registry
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Diagnostic label used in failure reports and usage-error panics
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Run `f` on the live state, panicking if the registry is disposed.
    fn with_live<R>(&self, f: impl FnOnce(&mut LiveRegistry) -> R) -> R {
        let mut state = self.state.lock();
        match &mut *state {
            RegistryState::Live(live) => f(live),
            RegistryState::Disposed => {
                drop(state);
                self.used_after_dispose()
            }
        }
    }

    #[cold]
    #[track_caller]
    fn used_after_dispose(&self) -> ! {
        panic!(
            "{} was used after being disposed; once dispose() has been called it can no longer be used",
            self.label
        )
    }

    /// Register a listener at the end of the sequence
    ///
    /// The same listener may be registered more than once. Each registration
    /// is called separately and has to be removed separately.
    pub fn add_listener(&self, listener: Listener) {
        self.with_live(|live| {
            live.entries.push_back(listener);
        });
    }

    /// Remove the earliest registration of `listener`
    ///
    /// Matching is by identity (see [`Listener`]). Removing a listener that is
    /// not registered does nothing. If a listener was registered twice, one
    /// call removes only the first registration.
    pub fn remove_listener(&self, listener: &Listener) {
        self.with_live(|live| {
            if let Some(id) = live.entries.find(|l| l.ptr_eq(listener)) {
                live.unlink(id);
            }
        });
    }

    /// Whether any listener is registered
    pub fn has_listeners(&self) -> bool {
        self.with_live(|live| !live.entries.is_empty())
    }

    /// Number of registrations, counting duplicates
    pub fn listener_count(&self) -> usize {
        self.with_live(|live| live.entries.len())
    }

    /// Whether [`dispose()`](Self::dispose) has been called
    ///
    /// Unlike every other method this never panics.
    pub fn is_disposed(&self) -> bool {
        matches!(*self.state.lock(), RegistryState::Disposed)
    }

    /// Call every registered listener once, in registration order
    ///
    /// Listeners run synchronously on the calling thread. See the type-level
    /// docs for what happens when listeners modify the registry meanwhile.
    pub fn notify(&self) {
        let Some(pass_id) = self.with_live(LiveRegistry::begin_pass) else {
            return;
        };

        let _guard = PassGuard {
            registry: self,
            pass_id,
        };
        loop {
            // The lock is released before the listener runs.
            let next = match &mut *self.state.lock() {
                RegistryState::Live(live) => live.advance(pass_id),
                RegistryState::Disposed => None,
            };
            let Some(listener) = next else {
                break;
            };

            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| listener.call())) {
                self.report_failure(ListenerPanic::from_payload(payload));
            }
        }
    }

    fn report_failure(&self, error: ListenerPanic) {
        let label = self.label.as_str();
        let details = ListenerErrorDetails::new(
            error,
            format!("while dispatching notifications for {label}"),
            || vec![format!("The {label} sending notification was: {label}")],
        );
        // Reporter panics are contained like listener panics.
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| self.reporter.report(&details))) {
            tracing::error!(
                label = %self.label,
                listener_error = %details.error,
                reporter_error = %ListenerPanic::from_payload(payload),
                "error reporter panicked"
            );
        }
    }

    /// Drop every listener and move to the terminal disposed state
    ///
    /// May be called from inside a listener; the pass in progress then stops.
    /// Panics if the registry is already disposed.
    pub fn dispose(&self) {
        let previous = std::mem::replace(&mut *self.state.lock(), RegistryState::Disposed);
        match previous {
            RegistryState::Live(live) => {
                tracing::trace!(
                    label = %self.label,
                    listeners = live.entries.len(),
                    "registry disposed"
                );
                // Listeners may own things whose drop re-enters us; drop them unlocked.
                drop(live);
            }
            RegistryState::Disposed => self.used_after_dispose(),
        }
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut out = f.debug_struct("ListenerRegistry");
        out.field("label", &self.label);
        match &*self.state.lock() {
            RegistryState::Live(live) => out.field("listeners", &live.entries.len()),
            RegistryState::Disposed => out.field("disposed", &true),
        };
        out.finish()
    }
}

impl Listenable for ListenerRegistry {
    fn add_listener(&self, listener: Listener) {
        ListenerRegistry::add_listener(self, listener);
    }

    fn remove_listener(&self, listener: &Listener) {
        ListenerRegistry::remove_listener(self, listener);
    }
}

/// Builder for configuring a [`ListenerRegistry`].
///
/// # Example
///
/// ```ignore
/// let registry = ListenerRegistry::builder()
///     .label("Cart")
///     .capacity(16)
///     .reporter(|details: &ListenerErrorDetails<'_>| eprintln!("{}", details.error))
///     .build();
/// ```
pub struct RegistryBuilder {
    capacity: usize,
    label: Option<String>,
    reporter: Arc<dyn ErrorReporter>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    /// Create a builder with default settings.
    ///
    /// Defaults:
    /// - `capacity`: 4 entries
    /// - `label`: "ListenerRegistry"
    /// - `reporter`: [`TracingReporter`]
    pub fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            label: None,
            reporter: Arc::new(TracingReporter),
        }
    }

    /// Set how many entries fit before the pool first grows.
    ///
    /// The pool doubles each time it fills up.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the label that identifies this registry in reports and panics.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the reporter that receives listener failures.
    pub fn reporter(self, reporter: impl ErrorReporter + 'static) -> Self {
        self.shared_reporter(Arc::new(reporter))
    }

    /// Set a reporter shared with other registries.
    pub fn shared_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Whether [`label()`](Self::label) was called, even with the default text
    pub(crate) fn has_custom_label(&self) -> bool {
        self.label.is_some()
    }

    /// Build the registry.
    pub fn build(self) -> ListenerRegistry {
        ListenerRegistry {
            state: Mutex::new(RegistryState::Live(LiveRegistry {
                entries: EntryList::with_capacity(self.capacity),
                passes: Vec::new(),
                next_pass: 0,
            })),
            label: self.label.unwrap_or_else(|| DEFAULT_LABEL.to_owned()),
            reporter: self.reporter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, Listener) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let listener = Listener::new(move || {
            count_clone.fetch_add(1, Ordering::Relaxed);
        });
        (count, listener)
    }

    #[test]
    fn notify_on_empty_registry_is_noop() {
        let registry = ListenerRegistry::new();
        registry.notify();
        assert!(!registry.has_listeners());
    }

    #[test]
    fn builder_defaults() {
        let registry = ListenerRegistry::builder().build();
        assert_eq!(registry.label(), DEFAULT_LABEL);
        assert_eq!(registry.listener_count(), 0);
        assert!(!registry.is_disposed());
    }

    #[test]
    fn builder_sets_label() {
        let builder = RegistryBuilder::new().label("Cart");
        assert!(builder.has_custom_label());

        let registry = builder.capacity(0).build();
        assert_eq!(registry.label(), "Cart");
    }

    #[test]
    fn explicit_default_label_counts_as_set() {
        assert!(!RegistryBuilder::new().has_custom_label());
        assert!(RegistryBuilder::new().label(DEFAULT_LABEL).has_custom_label());
    }

    #[test]
    fn finished_pass_leaves_cursor_stack_empty() {
        let registry = ListenerRegistry::new();
        registry.add_listener(Listener::new(|| {}));
        registry.notify();
        registry.notify();

        match &*registry.state.lock() {
            RegistryState::Live(live) => {
                assert!(live.passes.is_empty());
                assert_eq!(live.next_pass, 2);
            }
            RegistryState::Disposed => panic!("registry unexpectedly disposed"),
        }
    }

    #[test]
    fn removing_boundary_retreats_boundary() {
        cov_mark::check!(removal_retreats_boundary);
        let registry = Arc::new(ListenerRegistry::new());
        let (first_count, first) = counter();
        let (last_count, last) = counter();

        let registry_clone = registry.clone();
        let last_clone = last.clone();
        registry.add_listener(first.clone());
        registry.add_listener(Listener::new(move || {
            registry_clone.remove_listener(&last_clone);
        }));
        registry.add_listener(last);

        registry.notify();

        assert_eq!(first_count.load(Ordering::Relaxed), 1);
        assert_eq!(last_count.load(Ordering::Relaxed), 0);
        assert_eq!(registry.listener_count(), 2);
    }

    #[test]
    fn removing_active_retreats_active() {
        cov_mark::check!(removal_retreats_active);
        let registry = Arc::new(ListenerRegistry::new());
        let (after_count, after) = counter();

        let registry_clone = registry.clone();
        let slot: Arc<Mutex<Option<Listener>>> = Arc::new(Mutex::new(None));
        let slot_clone = slot.clone();
        let remover = Listener::new(move || {
            if let Some(me) = slot_clone.lock().as_ref() {
                registry_clone.remove_listener(me);
            }
        });
        *slot.lock() = Some(remover.clone());

        registry.add_listener(remover);
        registry.add_listener(after);

        registry.notify();

        assert_eq!(after_count.load(Ordering::Relaxed), 1);
        assert_eq!(registry.listener_count(), 1);
    }

    #[test]
    fn debug_reports_state() {
        let registry = ListenerRegistry::builder().label("Debuggable").build();
        registry.add_listener(Listener::new(|| {}));
        let live = format!("{registry:?}");
        assert!(live.contains("Debuggable"));
        assert!(live.contains("listeners: 1"));

        registry.dispose();
        assert!(format!("{registry:?}").contains("disposed"));
    }
}
