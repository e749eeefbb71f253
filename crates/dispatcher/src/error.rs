//! Dispatcher error types
//!
//! Only construction and submission can fail. Protocol outcomes (timeouts,
//! negative responses) are delivered to response callbacks instead.

use contracts::Header;
use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Timing or retry configuration rejected by the builder
    #[error("invalid dispatcher config '{field}': {message}")]
    InvalidConfig { field: String, message: String },

    /// The dispatcher owning the queue has been dropped
    #[error("dispatcher closed, message {header} dropped")]
    Closed { header: Header },
}

impl DispatcherError {
    /// Create an invalid config error
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }
}
