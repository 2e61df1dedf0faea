//! Components used by the demo.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use venus_component::{Component, ComponentError, Payload, decode_payload, encode_payload};

/// World-space position.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    /// Coordinates in world units.
    pub value: Vec3,
}

impl Position {
    /// Create a new position.
    #[must_use]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            value: Vec3::new(x, y, z),
        }
    }
}

impl Component for Position {
    fn type_name() -> &'static str {
        "Position"
    }

    fn to_payload(&self) -> Result<Payload, ComponentError> {
        encode_payload(self)
    }

    fn from_payload(payload: &Payload) -> Result<Self, ComponentError> {
        decode_payload(payload)
    }
}

/// A 3D velocity component.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Velocity {
    /// Linear velocity in world units per second.
    pub linear: Vec3,
}

impl Velocity {
    /// Zero velocity.
    pub const ZERO: Self = Self { linear: Vec3::ZERO };

    /// Create a new velocity.
    #[must_use]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            linear: Vec3::new(x, y, z),
        }
    }
}

impl Default for Velocity {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Component for Velocity {
    fn type_name() -> &'static str {
        "Velocity"
    }

    fn to_payload(&self) -> Result<Payload, ComponentError> {
        encode_payload(self)
    }

    fn from_payload(payload: &Payload) -> Result<Self, ComponentError> {
        decode_payload(payload)
    }
}

/// A simple name tag component for debugging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Name {
    /// The entity's display name.
    pub value: String,
}

impl Name {
    /// Create a new name component.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { value: name.into() }
    }
}

impl Component for Name {
    fn type_name() -> &'static str {
        "Name"
    }

    fn to_payload(&self) -> Result<Payload, ComponentError> {
        encode_payload(self)
    }

    fn from_payload(payload: &Payload) -> Result<Self, ComponentError> {
        decode_payload(payload)
    }
}
