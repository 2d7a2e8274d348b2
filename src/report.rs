//! Reporting of listener failures.
//!
//! A registry never decides how failures are surfaced. It hands each caught
//! listener panic to the [`ErrorReporter`] it was built with and keeps
//! dispatching. [`TracingReporter`] is the default and emits a `tracing`
//! event; applications plug in their own reporter through
//! [`RegistryBuilder::reporter`](crate::RegistryBuilder::reporter).

use std::backtrace::Backtrace;
use std::fmt;

use crate::error::ListenerPanic;

/// Library name attached to every report.
pub const LIBRARY: &str = "chime";

/// Everything known about one failed listener call.
pub struct ListenerErrorDetails<'a> {
    /// The panic caught around the listener
    pub error: ListenerPanic,
    /// Backtrace captured where the panic was caught
    pub backtrace: Backtrace,
    /// Library that caught the panic
    pub library: &'static str,
    /// What the library was doing, e.g. "while dispatching notifications for ListenerRegistry"
    pub context: String,
    information: Box<dyn Fn() -> Vec<String> + 'a>,
}

impl<'a> ListenerErrorDetails<'a> {
    /// Bundle a caught panic, capturing a backtrace at this point
    pub fn new<F>(error: ListenerPanic, context: String, information: F) -> Self
    where
        F: Fn() -> Vec<String> + 'a,
    {
        Self {
            error,
            backtrace: Backtrace::capture(),
            library: LIBRARY,
            context,
            information: Box::new(information),
        }
    }

    /// Extra diagnostic lines, produced on demand
    ///
    /// Identifies the instance that was dispatching. Reporters that drop the
    /// report never pay for building these.
    pub fn information(&self) -> Vec<String> {
        (self.information)()
    }
}

impl fmt::Debug for ListenerErrorDetails<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerErrorDetails")
            .field("error", &self.error)
            .field("library", &self.library)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Receiver for listener failures caught during dispatch.
///
/// Called once per failing listener, on the dispatching thread, with no
/// registry lock held. A reporter that panics is caught and logged, and the
/// pass carries on with the next listener.
pub trait ErrorReporter: Send + Sync {
    /// Handle one failure
    fn report(&self, details: &ListenerErrorDetails<'_>);
}

impl<F> ErrorReporter for F
where
    F: Fn(&ListenerErrorDetails<'_>) + Send + Sync,
{
    fn report(&self, details: &ListenerErrorDetails<'_>) {
        self(details);
    }
}

/// Default reporter: one `tracing` error event per failure.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, details: &ListenerErrorDetails<'_>) {
        tracing::error!(
            library = details.library,
            context = %details.context,
            error = %details.error,
            information = ?details.information(),
            "listener failed"
        );
        tracing::debug!(backtrace = %details.backtrace, "listener failure backtrace");
    }
}

/// Reporter that drops every report.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullReporter;

impl ErrorReporter for NullReporter {
    fn report(&self, _details: &ListenerErrorDetails<'_>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::cell::Cell;
    use std::panic::catch_unwind;

    fn fail() {
        panic!("nope");
    }

    fn sample_error() -> ListenerPanic {
        ListenerPanic::from_payload(catch_unwind(fail).unwrap_err())
    }

    #[test]
    fn information_is_lazy() {
        let calls = Cell::new(0);
        let details = ListenerErrorDetails::new(sample_error(), "ctx".to_owned(), || {
            calls.set(calls.get() + 1);
            vec!["line".to_owned()]
        });

        assert_eq!(calls.get(), 0);
        assert_eq!(details.information(), vec!["line".to_owned()]);
        assert_eq!(calls.get(), 1);
        assert_eq!(details.library, LIBRARY);
    }

    #[test]
    fn closures_are_reporters() {
        let seen = Mutex::new(Vec::new());
        let reporter = |details: &ListenerErrorDetails<'_>| {
            seen.lock().push(details.error.message().to_owned());
        };

        let details = ListenerErrorDetails::new(sample_error(), "ctx".to_owned(), Vec::new);
        reporter.report(&details);

        assert_eq!(*seen.lock(), vec!["nope".to_owned()]);
    }

    #[test]
    fn builtin_reporters_accept_reports() {
        let details = ListenerErrorDetails::new(sample_error(), "ctx".to_owned(), Vec::new);
        TracingReporter.report(&details);
        NullReporter.report(&details);
    }
}
