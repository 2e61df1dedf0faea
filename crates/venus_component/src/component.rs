//! Core [`Component`] trait and component kind identity.
//!
//! A component is a named, opaque bundle of data attached to an entity. The
//! name doubles as the component's kind: [`ComponentTypeId`] is derived from
//! it, the component index is keyed by it, and serialised entity records use
//! it to pick a decoder.
//!
//! ## Kind Identity
//!
//! [`ComponentTypeId`] is the FNV-1a 64-bit hash of the kind's **string
//! name**. The hash is deterministic and language-neutral, so a snapshot
//! written by one build can be read by another as long as the names agree.
//! Two Rust types must never share a name; the engine's prototype catalog
//! refuses such registrations.

use std::any::Any;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ComponentError, Operation};

/// Opaque serialised form of a single component instance.
///
/// Only the component kind that produced a payload knows how to read it.
pub type Payload = serde_json::Value;

/// A unique identifier for a component kind, derived from its string name
/// using the FNV-1a 64-bit hash algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ComponentTypeId(pub u64);

impl ComponentTypeId {
    /// FNV-1a 64-bit offset basis.
    const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

    /// FNV-1a 64-bit prime.
    const FNV_PRIME: u64 = 0x0100_0000_01b3;

    /// Compute the [`ComponentTypeId`] from a component's name.
    ///
    /// # Algorithm (FNV-1a 64-bit)
    ///
    /// ```text
    /// hash = 0xcbf29ce484222325          (offset basis)
    /// for each byte in name.as_bytes():
    ///     hash = hash XOR byte
    ///     hash = hash * 0x00000100000001b3  (prime)
    /// return hash
    /// ```
    #[must_use]
    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash = Self::FNV_OFFSET_BASIS;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u64;
            hash = hash.wrapping_mul(Self::FNV_PRIME);
            i += 1;
        }
        Self(hash)
    }

    /// Compute the [`ComponentTypeId`] for a Rust component type `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self::from_name(T::type_name())
    }
}

impl fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// The core component trait.
///
/// Implementors pick a unique [`type_name`](Component::type_name). The
/// serialisation pair is optional: the defaults fail with
/// [`ComponentError::NotImplemented`], which is fine for components that are
/// never persisted. Kinds that take part in snapshots override both, usually
/// through [`encode_payload`] and [`decode_payload`].
///
/// # Examples
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use venus_component::{decode_payload, encode_payload, Component, ComponentError, Payload};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {
///     fn type_name() -> &'static str {
///         "Health"
///     }
///
///     fn to_payload(&self) -> Result<Payload, ComponentError> {
///         encode_payload(self)
///     }
///
///     fn from_payload(payload: &Payload) -> Result<Self, ComponentError> {
///         decode_payload(payload)
///     }
/// }
/// ```
pub trait Component: Any + Send + Sync + fmt::Debug + Sized {
    /// The component's name, which is also its kind tag.
    fn type_name() -> &'static str;

    /// Returns the [`ComponentTypeId`] for this component.
    fn component_type_id() -> ComponentTypeId {
        ComponentTypeId::from_name(Self::type_name())
    }

    /// Serialise this instance into an opaque payload.
    ///
    /// # Errors
    ///
    /// The default implementation always returns
    /// [`ComponentError::NotImplemented`].
    fn to_payload(&self) -> Result<Payload, ComponentError> {
        Err(ComponentError::NotImplemented {
            component: Self::type_name(),
            operation: Operation::Serialize,
        })
    }

    /// Build a fresh instance from a payload produced by
    /// [`to_payload`](Component::to_payload).
    ///
    /// # Errors
    ///
    /// The default implementation always returns
    /// [`ComponentError::NotImplemented`].
    fn from_payload(payload: &Payload) -> Result<Self, ComponentError> {
        let _ = payload;
        Err(ComponentError::NotImplemented {
            component: Self::type_name(),
            operation: Operation::Deserialize,
        })
    }
}

/// Object-safe view of a [`Component`], used for type-erased storage inside
/// entities.
///
/// Blanket-implemented for every [`Component`]; there is no reason to
/// implement it by hand.
pub trait AnyComponent: Any + Send + Sync + fmt::Debug + 'static {
    /// The component's name.
    fn name(&self) -> &'static str;

    /// The component's kind identifier.
    fn kind(&self) -> ComponentTypeId;

    /// Serialise through the concrete type's [`Component::to_payload`].
    ///
    /// # Errors
    ///
    /// Propagates whatever the concrete implementation returns.
    fn serialize_payload(&self) -> Result<Payload, ComponentError>;

    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete type.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Owned upcast, for taking a removed component back by value.
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;
}

impl<T: Component> AnyComponent for T {
    fn name(&self) -> &'static str {
        T::type_name()
    }

    fn kind(&self) -> ComponentTypeId {
        T::component_type_id()
    }

    fn serialize_payload(&self) -> Result<Payload, ComponentError> {
        self.to_payload()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        self
    }
}

impl dyn AnyComponent {
    /// Returns `true` if the erased component is a `T`.
    #[must_use]
    pub fn is<T: Component>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Downcast to a shared reference of the concrete type.
    #[must_use]
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Downcast to a mutable reference of the concrete type.
    #[must_use]
    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// Encode any serde-capable component into a [`Payload`].
///
/// # Errors
///
/// Returns [`ComponentError::Encode`] if serialisation fails.
pub fn encode_payload<T: Component + Serialize>(value: &T) -> Result<Payload, ComponentError> {
    serde_json::to_value(value).map_err(|source| ComponentError::Encode {
        component: T::type_name(),
        source,
    })
}

/// Decode a [`Payload`] into a fresh instance of a serde-capable component.
///
/// # Errors
///
/// Returns [`ComponentError::Decode`] if the payload does not match `T`.
pub fn decode_payload<T: Component + DeserializeOwned>(
    payload: &Payload,
) -> Result<T, ComponentError> {
    serde_json::from_value(payload.clone()).map_err(|source| ComponentError::Decode {
        component: T::type_name(),
        source,
    })
}
