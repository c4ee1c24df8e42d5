//! Data-driven level loading and progression: JSON schema v1 parsing and
//! validation ([`loader`]), the segment/trigger/scroll state machine
//! ([`director`]), and translating dispatched events into registry entities
//! ([`spawn`]).

pub mod data;
pub mod director;
pub mod loader;
pub mod spawn;

pub use data::LevelData;
pub use director::{DispatchedEvent, LevelDirector};
pub use loader::{LevelError, LevelRegistry};
pub use spawn::{LevelSideEffect, LevelSpawnSystem, SpawnResult, SpawnScaling};
