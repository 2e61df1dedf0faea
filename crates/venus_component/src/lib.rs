//! # venus_component
//!
//! The "C" in ECS for the Venus runtime: what a component is, how its kind
//! is identified, and how it is serialised.
//!
//! This crate provides:
//!
//! - [`Component`] trait and its object-safe [`AnyComponent`] view.
//! - [`ComponentTypeId`]: name-derived component kind identifiers.
//! - [`EntityId`] and [`EntityAllocator`]: monotonically increasing ids.
//! - [`Requirements`]: OR-of-AND requirement expressions for subsystems.
//! - [`ComponentError`]: serialisation contract violations.

pub mod component;
pub mod entity;
pub mod error;
pub mod requirements;

pub use component::{
    AnyComponent, Component, ComponentTypeId, Payload, decode_payload, encode_payload,
};
pub use entity::{EntityAllocator, EntityId};
pub use error::{ComponentError, Operation};
pub use requirements::{RequirementGroup, Requirements};
