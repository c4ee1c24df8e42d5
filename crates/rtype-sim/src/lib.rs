//! Components and per-tick simulation systems for the rtype-server core.
//!
//! This crate has no fallible surface of its own beyond `rtype_ecs`'s
//! `RegistryError` (systems log and skip rather than propagate, per the
//! spec's "programmer error" policy); it exposes plain functions over
//! [`rtype_ecs::Registry`] invoked in a fixed order by the room's game
//! loop, plus the [`events::EventBus`] systems publish to within a tick.

pub mod components;
pub mod events;
pub mod systems;

pub use events::{DamageEvent, DestroyEvent, EventBus};
