//! Subsystem registry, keyed by name.
//!
//! Iteration order is registration order. The engine relies on it both for
//! stepping and for message delivery, so removing a subsystem keeps the
//! relative order of the rest.

use std::fmt;

use indexmap::IndexMap;
use tracing::info;

use crate::error::EngineError;
use crate::subsystem::{DynSubsystem, Subsystem, SubsystemCell};

/// Registered subsystems, in registration order.
#[derive(Default)]
pub struct SubsystemRegistry {
    systems: IndexMap<String, Box<dyn DynSubsystem>>,
}

impl SubsystemRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            systems: IndexMap::new(),
        }
    }

    /// Register a subsystem under its own name.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateSubsystem`] if the name is taken.
    pub fn register(&mut self, system: Box<dyn DynSubsystem>) -> Result<(), EngineError> {
        let name = system.name().to_string();
        if self.systems.contains_key(&name) {
            return Err(EngineError::DuplicateSubsystem(name));
        }
        info!(subsystem = %name, "subsystem registered");
        self.systems.insert(name, system);
        Ok(())
    }

    /// Remove a subsystem. Returns it if it was registered.
    pub fn unregister(&mut self, name: &str) -> Option<Box<dyn DynSubsystem>> {
        let removed = self.systems.shift_remove(name);
        if removed.is_some() {
            info!(subsystem = name, "subsystem removed");
        }
        removed
    }

    /// Look up a subsystem by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn DynSubsystem> {
        self.systems.get(name).map(|system| &**system)
    }

    /// Look up a subsystem by name, mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut (dyn DynSubsystem + 'static)> {
        self.systems.get_mut(name).map(|system| &mut **system)
    }

    /// Typed lookup. `None` if the name is unknown or holds another state type.
    #[must_use]
    pub fn cell<S: Subsystem>(&self, name: &str) -> Option<&SubsystemCell<S>> {
        self.get(name)?.as_any().downcast_ref()
    }

    /// Typed mutable lookup.
    pub fn cell_mut<S: Subsystem>(&mut self, name: &str) -> Option<&mut SubsystemCell<S>> {
        self.get_mut(name)?.as_any_mut().downcast_mut()
    }

    /// Subsystem at a registration position.
    pub(crate) fn get_index_mut(
        &mut self,
        index: usize,
    ) -> Option<&mut (dyn DynSubsystem + 'static)> {
        self.systems
            .get_index_mut(index)
            .map(|(_, system)| &mut **system)
    }

    /// Every subsystem, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn DynSubsystem> {
        self.systems.values().map(|system| &**system)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.systems.keys().map(String::as_str)
    }

    /// Number of registered subsystems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

impl fmt::Debug for SubsystemRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use venus_component::Requirements;

    use super::*;
    use crate::subsystem::SubsystemBuilder;

    #[derive(Debug, Default)]
    struct Counter(u32);

    impl Subsystem for Counter {}

    fn boxed(name: &str) -> Box<dyn DynSubsystem> {
        Box::new(SubsystemBuilder::new(name, Counter::default()).build())
    }

    #[test]
    fn test_register_keeps_order() {
        let mut registry = SubsystemRegistry::new();
        registry.register(boxed("physics")).unwrap();
        registry.register(boxed("audio")).unwrap();
        registry.register(boxed("ai")).unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), ["physics", "audio", "ai"]);

        registry.unregister("audio").unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), ["physics", "ai"]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = SubsystemRegistry::new();
        registry.register(boxed("physics")).unwrap();
        assert!(matches!(
            registry.register(boxed("physics")),
            Err(EngineError::DuplicateSubsystem(name)) if name == "physics"
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_unknown_is_none() {
        let mut registry = SubsystemRegistry::new();
        assert!(registry.unregister("ghost").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_typed_cell_access() {
        let mut registry = SubsystemRegistry::new();
        registry.register(boxed("counter")).unwrap();

        registry.cell_mut::<Counter>("counter").unwrap().state_mut().0 = 3;
        assert_eq!(registry.cell::<Counter>("counter").unwrap().state().0, 3);
        assert!(registry.cell::<()>("counter").is_none());

        registry
            .get_mut("counter")
            .unwrap()
            .set_requirements(Requirements::named(["Position"]));
        assert_eq!(
            registry.get("counter").unwrap().requirements(),
            &Requirements::named(["Position"])
        );
    }
}
