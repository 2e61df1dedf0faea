//! Process-wide catalogs: constants, globals, and serialisable-component
//! prototypes.
//!
//! All three are populate-once, read-many tables with no removal. They must
//! be filled before the first deserialize: the engine seals them at that
//! point and later registrations fail with [`EngineError::RegistrySealed`].
//! [`Catalogs::reset`] exists so independent tests can start over.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;
use venus_component::{AnyComponent, Component, ComponentError, Payload};

use crate::error::EngineError;

type Decoder = fn(&Payload) -> Result<Box<dyn AnyComponent>, ComponentError>;

fn decode_as<T: Component>(payload: &Payload) -> Result<Box<dyn AnyComponent>, ComponentError> {
    Ok(Box::new(T::from_payload(payload)?))
}

/// Decoding entry for one component kind.
#[derive(Debug, Clone, Copy)]
struct Prototype {
    rust_type: TypeId,
    rust_name: &'static str,
    decode: Decoder,
}

/// The three engine catalogs.
#[derive(Debug, Default)]
pub struct Catalogs {
    constants: IndexMap<String, String>,
    globals: HashMap<String, Box<dyn Any + Send + Sync>>,
    prototypes: HashMap<&'static str, Prototype>,
    sealed: bool,
}

impl Catalogs {
    /// Create empty, unsealed catalogs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn check_open(&self, key: &str) -> Result<(), EngineError> {
        if self.sealed {
            return Err(EngineError::RegistrySealed(key.to_string()));
        }
        Ok(())
    }

    /// Register a named constant. The value defaults to the key itself.
    ///
    /// # Errors
    ///
    /// [`EngineError::DuplicateEntry`] if the key exists,
    /// [`EngineError::RegistrySealed`] after the first deserialize.
    pub fn add_constant(&mut self, key: &str, value: Option<&str>) -> Result<(), EngineError> {
        self.check_open(key)?;
        if self.constants.contains_key(key) {
            return Err(EngineError::DuplicateEntry {
                catalog: "constant",
                key: key.to_string(),
            });
        }
        self.constants
            .insert(key.to_string(), value.unwrap_or(key).to_string());
        Ok(())
    }

    /// Look up a constant.
    #[must_use]
    pub fn constant(&self, key: &str) -> Option<&str> {
        self.constants.get(key).map(String::as_str)
    }

    /// Register a named global of any shareable type.
    ///
    /// # Errors
    ///
    /// [`EngineError::DuplicateEntry`] if the key exists,
    /// [`EngineError::RegistrySealed`] after the first deserialize.
    pub fn add_global<T>(&mut self, key: &str, value: T) -> Result<(), EngineError>
    where
        T: Any + Send + Sync,
    {
        self.check_open(key)?;
        if self.globals.contains_key(key) {
            return Err(EngineError::DuplicateEntry {
                catalog: "global",
                key: key.to_string(),
            });
        }
        self.globals.insert(key.to_string(), Box::new(value));
        Ok(())
    }

    /// Look up a global, `None` if absent or of another type.
    #[must_use]
    pub fn global<T: Any>(&self, key: &str) -> Option<&T> {
        self.globals.get(key)?.downcast_ref::<T>()
    }

    /// Register `T` as the decoder for records naming `T::type_name()`.
    ///
    /// Registering the same type twice is harmless. A different type under
    /// an already-claimed name is rejected, which keeps component names
    /// unique across the whole catalog.
    ///
    /// # Errors
    ///
    /// [`EngineError::DuplicateComponentKind`] on a name collision,
    /// [`EngineError::RegistrySealed`] after the first deserialize.
    pub fn register_prototype<T: Component>(&mut self) -> Result<(), EngineError> {
        let name = T::type_name();
        self.check_open(name)?;
        if let Some(existing) = self.prototypes.get(name) {
            if existing.rust_type == TypeId::of::<T>() {
                return Ok(());
            }
            return Err(EngineError::DuplicateComponentKind {
                name,
                existing: existing.rust_name,
            });
        }
        self.prototypes.insert(
            name,
            Prototype {
                rust_type: TypeId::of::<T>(),
                rust_name: std::any::type_name::<T>(),
                decode: decode_as::<T>,
            },
        );
        debug!(component = name, "prototype registered");
        Ok(())
    }

    /// Returns `true` if a prototype is registered for `name`.
    #[must_use]
    pub fn has_prototype(&self, name: &str) -> bool {
        self.prototypes.contains_key(name)
    }

    /// Decode a payload through the prototype registered for `name`.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownComponentType`] if nothing is registered under
    /// `name`; [`EngineError::Component`] if the prototype rejects the payload.
    pub fn decode(
        &self,
        name: &str,
        payload: &Payload,
    ) -> Result<Box<dyn AnyComponent>, EngineError> {
        let prototype = self
            .prototypes
            .get(name)
            .ok_or_else(|| EngineError::UnknownComponentType(name.to_string()))?;
        Ok((prototype.decode)(payload)?)
    }

    /// Refuse any further registration.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Returns `true` once sealed.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Forget every entry and unseal.
    pub fn reset(&mut self) {
        self.constants.clear();
        self.globals.clear();
        self.prototypes.clear();
        self.sealed = false;
    }
}
