//! Requirement expressions for subsystem entity selection.
//!
//! A subsystem declares which entities it wants as a disjunction of
//! conjunctions over component kinds: `[[A, B], [C]]` selects entities that
//! own (A *and* B) *or* C. The engine evaluates each [`RequirementGroup`]
//! separately and calls the subsystem once per group, so an entity that
//! satisfies several groups is seen several times.

use serde::{Deserialize, Serialize};

use crate::component::{Component, ComponentTypeId};

/// A conjunction of component kinds. Every kind must be present.
///
/// The empty group is satisfied by every entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementGroup {
    kinds: Vec<ComponentTypeId>,
}

impl RequirementGroup {
    /// Create an empty group.
    #[must_use]
    pub fn new() -> Self {
        Self { kinds: Vec::new() }
    }

    /// Add a component kind by id.
    #[must_use]
    pub fn with(mut self, kind: ComponentTypeId) -> Self {
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
        self
    }

    /// Add the kind of component type `T`.
    #[must_use]
    pub fn require<T: Component>(self) -> Self {
        self.with(T::component_type_id())
    }

    /// Build a group from component names.
    #[must_use]
    pub fn named<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        names
            .into_iter()
            .map(ComponentTypeId::from_name)
            .collect()
    }

    /// The kinds in this group.
    #[must_use]
    pub fn kinds(&self) -> &[ComponentTypeId] {
        &self.kinds
    }

    /// Returns `true` if the group places no constraint.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl FromIterator<ComponentTypeId> for RequirementGroup {
    fn from_iter<I: IntoIterator<Item = ComponentTypeId>>(iter: I) -> Self {
        iter.into_iter().fold(Self::new(), Self::with)
    }
}

/// A normalised OR-of-AND requirement expression.
///
/// Always holds at least one group. The default is a single empty group,
/// which matches every entity of a layer once per tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    groups: Vec<RequirementGroup>,
}

impl Requirements {
    /// A flat list of kinds, treated as a single AND group.
    #[must_use]
    pub fn all(kinds: impl IntoIterator<Item = ComponentTypeId>) -> Self {
        Self {
            groups: vec![kinds.into_iter().collect()],
        }
    }

    /// Explicit OR-of-AND groups.
    ///
    /// An empty outer list normalises to the default single empty group.
    #[must_use]
    pub fn any_of<G, K>(groups: G) -> Self
    where
        G: IntoIterator<Item = K>,
        K: IntoIterator<Item = ComponentTypeId>,
    {
        let groups: Vec<RequirementGroup> = groups
            .into_iter()
            .map(|group| group.into_iter().collect())
            .collect();
        if groups.is_empty() {
            return Self::default();
        }
        Self { groups }
    }

    /// A flat list of component names, treated as a single AND group.
    #[must_use]
    pub fn named<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            groups: vec![RequirementGroup::named(names)],
        }
    }

    /// Explicit OR-of-AND groups given by component names.
    #[must_use]
    pub fn named_groups<'a, G, K>(groups: G) -> Self
    where
        G: IntoIterator<Item = K>,
        K: IntoIterator<Item = &'a str>,
    {
        Self::any_of(
            groups
                .into_iter()
                .map(|group| group.into_iter().map(ComponentTypeId::from_name)),
        )
    }

    /// Append another alternative group.
    #[must_use]
    pub fn or(mut self, group: RequirementGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// The groups in declaration order.
    #[must_use]
    pub fn groups(&self) -> &[RequirementGroup] {
        &self.groups
    }
}

impl Default for Requirements {
    fn default() -> Self {
        Self {
            groups: vec![RequirementGroup::new()],
        }
    }
}

impl From<RequirementGroup> for Requirements {
    fn from(group: RequirementGroup) -> Self {
        Self {
            groups: vec![group],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> ComponentTypeId {
        ComponentTypeId::from_name(name)
    }

    #[test]
    fn test_default_is_single_empty_group() {
        let reqs = Requirements::default();
        assert_eq!(reqs.groups().len(), 1);
        assert!(reqs.groups()[0].is_empty());
    }

    #[test]
    fn test_flat_list_becomes_one_group() {
        let reqs = Requirements::named(["Position", "Velocity"]);
        assert_eq!(reqs.groups().len(), 1);
        assert_eq!(reqs.groups()[0].kinds(), &[id("Position"), id("Velocity")]);
    }

    #[test]
    fn test_explicit_groups_are_kept() {
        let reqs = Requirements::named_groups([vec!["A", "B"], vec!["C"]]);
        assert_eq!(reqs.groups().len(), 2);
        assert_eq!(reqs.groups()[1].kinds(), &[id("C")]);
    }

    #[test]
    fn test_empty_outer_list_normalises_to_default() {
        let reqs = Requirements::any_of(Vec::<Vec<ComponentTypeId>>::new());
        assert_eq!(reqs, Requirements::default());
    }

    #[test]
    fn test_duplicate_kinds_collapse() {
        let group = RequirementGroup::named(["A", "A", "B"]);
        assert_eq!(group.kinds().len(), 2);
    }

    #[test]
    fn test_or_appends_group() {
        let reqs = Requirements::named(["A"]).or(RequirementGroup::new().with(id("B")));
        assert_eq!(reqs.groups().len(), 2);
    }
}
