//! Store-level errors.

use thiserror::Error;

/// Errors raised synchronously by the store and its builders.
///
/// Failures inside async thunk work are not store errors: they are normalized
/// into a rejected action (see [`crate::SerializedError`]).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Invalid reducer, slice or store construction arguments.
    #[error("Invalid store configuration: {0}")]
    Configuration(String),

    /// The dispatched value is not a valid action.
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// A reducer, middleware or listener dispatched while a dispatch was in flight.
    #[error("Reducers, middleware and listeners may not dispatch actions (tried to dispatch '{action_type}')")]
    ReentrantDispatch { action_type: String },

    /// A typed payload could not be converted into a serializable value.
    #[error("Payload of '{action_type}' is not serializable: {source}")]
    NonSerializablePayload {
        action_type: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn invalid_action(message: impl Into<String>) -> Self {
        Self::InvalidAction(message.into())
    }
}
