//! Component-level error types.

use std::fmt;

/// Which half of the serialisation pair failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Component → payload.
    Serialize,
    /// Payload → component.
    Deserialize,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serialize => f.write_str("serialization"),
            Self::Deserialize => f.write_str("deserialization"),
        }
    }
}

/// Errors raised by a component's serialisation capability.
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    /// The component kind kept the default serialise/deserialise behaviour.
    #[error("{operation} process not implemented [component: {component}]")]
    NotImplemented {
        /// Name of the offending component kind.
        component: &'static str,
        /// The operation that was attempted.
        operation: Operation,
    },

    /// Failed to encode a component into its payload.
    #[error("failed to encode component {component}: {source}")]
    Encode {
        /// Name of the component kind.
        component: &'static str,
        /// Underlying serde error.
        source: serde_json::Error,
    },

    /// Failed to decode a payload into a component.
    #[error("failed to decode component {component}: {source}")]
    Decode {
        /// Name of the component kind.
        component: &'static str,
        /// Underlying serde error.
        source: serde_json::Error,
    },
}

impl ComponentError {
    /// Name of the component kind this error is about.
    #[must_use]
    pub fn component(&self) -> &'static str {
        match self {
            Self::NotImplemented { component, .. }
            | Self::Encode { component, .. }
            | Self::Decode { component, .. } => component,
        }
    }
}
