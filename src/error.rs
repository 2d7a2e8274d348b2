use std::any::Any;

use thiserror::Error;

/// A listener panicked while a registry was dispatching notifications.
///
/// Built from the panic payload caught around the listener call. Payloads
/// that are neither `&str` nor `String` keep a placeholder message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("listener panicked: {message}")]
pub struct ListenerPanic {
    message: String,
}

impl ListenerPanic {
    /// Convert a payload returned by `catch_unwind`
    pub fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => (*message).to_owned(),
                Err(_) => "Box<dyn Any>".to_owned(),
            },
        };
        Self { message }
    }

    /// The panic message
    pub fn message(&self) -> &str {
        &self.message
    }
}
