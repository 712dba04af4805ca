use std::fmt::Display;

use thiserror::Error;

/// A failure described only by text, usually a cause prefixed with what was
/// being attempted. Crate errors absorb it through `From<Message>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct Message(pub String);

/// `.context()` and `.with_context()` for `Result` and `Option`.
///
/// The output error is always [`Message`]; `?` then lifts it into the
/// caller's error type.
pub trait Context<T> {
    fn context(self, context: impl Into<String>) -> Result<T, Message>;

    fn with_context<C: Into<String>>(self, f: impl FnOnce() -> C) -> Result<T, Message>;
}

impl<T, E: Display> Context<T> for Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T, Message> {
        self.map_err(|cause| Message(format!("{}: {cause}", context.into())))
    }

    fn with_context<C: Into<String>>(self, f: impl FnOnce() -> C) -> Result<T, Message> {
        self.map_err(|cause| Message(format!("{}: {cause}", f().into())))
    }
}

impl<T> Context<T> for Option<T> {
    fn context(self, context: impl Into<String>) -> Result<T, Message> {
        self.ok_or_else(|| Message(context.into()))
    }

    fn with_context<C: Into<String>>(self, f: impl FnOnce() -> C) -> Result<T, Message> {
        self.ok_or_else(|| Message(f().into()))
    }
}
