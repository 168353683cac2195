//! Driver trait for abstracting platform I/O.
//!
//! The [`Driver`] trait decouples the runtime from a specific frontend. Each
//! frontend supplies user input and rendering; the generic
//! [`crate::Runtime`] handles all orchestration.

use std::future::Future;

use crate::{ThreadView, UserInput};

/// Platform-specific input and output for the runtime.
///
/// # Implementations
///
/// - **Terminal**: line-based stdin/stdout in `kennel-cli`
/// - **Tests**: scripted inputs and recorded frames
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Wait for the next user input. `None` means the input source closed.
    ///
    /// Must be cancel safe: the runtime polls it inside `select!`.
    fn poll_input(&mut self) -> impl Future<Output = Result<Option<UserInput>, Self::Error>> + Send;

    /// Render the view.
    ///
    /// # Errors
    ///
    /// Returns an error if output fails.
    fn render(&mut self, view: &ThreadView) -> Result<(), Self::Error>;

    /// Release platform resources.
    fn stop(&mut self);
}
