//! Entity/component registry for the rtype-server simulation core.
//!
//! An [`entity::EntityId`] is a generational 64-bit handle allocated by an
//! [`entity::EntityAllocator`]. The [`registry::Registry`] stores components
//! in per-type sparse maps keyed by `EntityId`, and exposes a lazy, ascending-
//! order [`registry::View`] over any tuple of component types. No component
//! storage allocates eagerly for a type that is never inserted, and no view
//! materializes a vector internally.
//!
//! # Quick start
//!
//! ```
//! use rtype_ecs::Registry;
//!
//! #[derive(Debug, Clone, Copy)]
//! struct Position { x: f32, y: f32 }
//! #[derive(Debug, Clone, Copy)]
//! struct Velocity { vx: f32, vy: f32 }
//!
//! let mut registry = Registry::new();
//! let e = registry.create();
//! registry.emplace(e, Position { x: 0.0, y: 0.0 }).unwrap();
//! registry.emplace(e, Velocity { vx: 1.0, vy: 0.0 }).unwrap();
//!
//! for (id, (pos, vel)) in registry.view::<(Position, Velocity)>() {
//!     assert_eq!(id, e);
//!     assert_eq!((pos.x, vel.vx), (0.0, 1.0));
//! }
//! ```

pub mod entity;
pub mod error;
pub mod registry;

pub use entity::{EntityAllocator, EntityId};
pub use error::RegistryError;
pub use registry::{Registry, View, ViewTuple};
