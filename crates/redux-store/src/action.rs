//! Actions - plain, serializable messages describing a state change
//!
//! An action is a record with a required `type` and optional `payload`,
//! `error` and `meta` fields. Payload and meta are JSON values, so an action
//! can never carry callables or live handles.

use crate::error::StoreError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Action type dispatched once by the store to obtain the initial state.
pub const INIT_ACTION_TYPE: &str = "@@init";

/// Action type dispatched after the root reducer was replaced.
pub const REPLACE_ACTION_TYPE: &str = "@@replace";

/// Immutable action record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    action_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<SerializedError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    meta: Option<Value>,
}

impl Action {
    /// Create an action without payload
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            payload: None,
            error: None,
            meta: None,
        }
    }

    /// Create an action with a typed payload
    ///
    /// Fails with [`StoreError::NonSerializablePayload`] when the payload's
    /// `Serialize` impl refuses to produce a JSON value.
    pub fn with_payload<T: Serialize>(
        action_type: impl Into<String>,
        payload: &T,
    ) -> Result<Self, StoreError> {
        let action_type = action_type.into();
        match serde_json::to_value(payload) {
            Ok(value) => Ok(Self::new(action_type).payload(value)),
            Err(source) => Err(StoreError::NonSerializablePayload {
                action_type,
                source,
            }),
        }
    }

    /// Parse an untyped value into an action
    ///
    /// The value must be an object with a non-empty string `type`.
    pub fn from_value(value: Value) -> Result<Self, StoreError> {
        match value.get("type") {
            Some(Value::String(_)) => {}
            Some(other) => {
                return Err(StoreError::invalid_action(format!(
                    "'type' must be a string, got {}",
                    other
                )))
            }
            None => {
                return Err(StoreError::invalid_action(
                    "actions must be objects with a 'type' field",
                ))
            }
        }

        let action: Action = serde_json::from_value(value)
            .map_err(|e| StoreError::invalid_action(e.to_string()))?;
        action.validate()?;
        Ok(action)
    }

    /// Builder: set the payload
    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Builder: set the error
    pub fn error(mut self, error: SerializedError) -> Self {
        self.error = Some(error);
        self
    }

    /// Builder: set the meta information
    pub fn meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn action_type(&self) -> &str {
        &self.action_type
    }

    /// Check the action type
    pub fn is(&self, action_type: &str) -> bool {
        self.action_type == action_type
    }

    pub fn payload_value(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn error_value(&self) -> Option<&SerializedError> {
        self.error.as_ref()
    }

    pub fn meta_value(&self) -> Option<&Value> {
        self.meta.as_ref()
    }

    /// Look up a single field of the meta object
    pub fn meta_field(&self, key: &str) -> Option<&Value> {
        self.meta.as_ref().and_then(|meta| meta.get(key))
    }

    /// Decode the payload into a concrete type
    ///
    /// Returns `None` when there is no payload or it does not decode.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Option<T> {
        let value = self.payload.as_ref()?;
        match T::deserialize(value) {
            Ok(payload) => Some(payload),
            Err(e) => {
                log::warn!(
                    "Payload of '{}' does not match the expected shape: {}",
                    self.action_type,
                    e
                );
                None
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<(), StoreError> {
        if self.action_type.trim().is_empty() {
            return Err(StoreError::invalid_action(
                "action type must be a non-empty string",
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.action_type)
    }
}

impl TryFrom<Value> for Action {
    type Error = StoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Action::from_value(value)
    }
}

/// Serializable description of a failure, carried by rejected actions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl SerializedError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            message: Some(message.into()),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Normalize an arbitrary error
    ///
    /// A `SerializedError` travelling inside the `anyhow::Error` is kept as is;
    /// anything else becomes `{name: "Error", message: <display chain>}`.
    pub fn from_error(err: &anyhow::Error) -> Self {
        if let Some(serialized) = err.downcast_ref::<SerializedError>() {
            return serialized.clone();
        }
        Self::new("Error", format!("{:#}", err))
    }
}

impl fmt::Display for SerializedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, &self.message) {
            (Some(name), Some(message)) => write!(f, "{}: {}", name, message),
            (Some(name), None) => f.write_str(name),
            (None, Some(message)) => f.write_str(message),
            (None, None) => f.write_str("Unknown error"),
        }
    }
}

impl std::error::Error for SerializedError {}

/// Action creator bound to one action type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionCreator {
    action_type: String,
}

impl ActionCreator {
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
        }
    }

    pub fn action_type(&self) -> &str {
        &self.action_type
    }

    /// Create the action without payload
    pub fn create(&self) -> Action {
        Action::new(self.action_type.clone())
    }

    /// Create the action with a typed payload
    pub fn with_payload<T: Serialize>(&self, payload: &T) -> Result<Action, StoreError> {
        Action::with_payload(self.action_type.clone(), payload)
    }

    /// Does the action carry this creator's type?
    pub fn matches(&self, action: &Action) -> bool {
        action.is(&self.action_type)
    }
}

impl fmt::Display for ActionCreator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.action_type)
    }
}
