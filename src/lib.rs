#![deny(missing_docs)]

//! Reentrancy-safe change notification.
//!
//! A [`ListenerRegistry`] holds an ordered list of listeners and calls each of
//! them when told something changed. It is meant to be embedded in your own
//! types. [`ObservableValue<T>`] wraps one value and notifies only when the
//! value actually changes.
//!
//! # Quick Start
//!
//! ```ignore
//! use chime::{Listener, ListenerRegistry, ObservableValue};
//!
//! struct Cart {
//!     items: Vec<String>,
//!     changed: ListenerRegistry,
//! }
//!
//! impl Cart {
//!     fn add(&mut self, item: String) {
//!         self.items.push(item);
//!         self.changed.notify();  // Call every listener, in order
//!     }
//! }
//!
//! let on_change = Listener::new(|| println!("cart changed"));
//! cart.changed.add_listener(on_change.clone());
//! cart.changed.remove_listener(&on_change);  // Identity-based
//!
//! let count = ObservableValue::new(0);
//! count.set(0);  // Equal: no notification
//! count.set(1);  // Notifies
//! ```
//!
//! # Core Types
//!
//! - [`Listener`] - Shared callback handle, compared by identity.
//! - [`ListenerRegistry`] - Ordered listeners with reentrancy-safe [`notify()`](ListenerRegistry::notify).
//! - [`ObservableValue<T>`] - Value holder that notifies on change.
//! - [`Listenable`] / [`ValueListenable`] - Subscription traits; [`merge`] fans in several listenables.
//! - [`ErrorReporter`] - Receives panics caught from listeners.
//!
//! # Notification
//!
//! ```ignore
//! registry.notify();
//! // - listeners added during notify() wait for the next call
//! // - listeners removed during notify() are not called again
//! // - a panicking listener is reported and the rest still run
//! ```
//!
//! # Configuration
//!
//! ```ignore
//! let registry = ListenerRegistry::builder()
//!     .label("Cart")                // Shown in reports and panics
//!     .capacity(32)                 // Entry slots before the pool grows
//!     .reporter(NullReporter)       // Default: TracingReporter
//!     .build();
//! ```
//!
//! # Disposal
//!
//! ```ignore
//! registry.dispose();
//! registry.notify();  // Panics: used after being disposed
//! ```

// Internal modules
pub(crate) mod arena;
mod error;
mod listenable;
mod listener;
mod registry;
mod report;
mod value;

// Core types
pub use listener::Listener;
pub use registry::{DEFAULT_CAPACITY, DEFAULT_LABEL, ListenerRegistry, RegistryBuilder};
pub use value::ObservableValue;

// Subscription traits
pub use listenable::{Listenable, MergedListenable, ValueListenable, merge};

// Failure reporting
pub use error::ListenerPanic;
pub use report::{
    ErrorReporter, LIBRARY, ListenerErrorDetails, NullReporter, TracingReporter,
};
