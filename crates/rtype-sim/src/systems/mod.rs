//! Simulation systems: pure functions over `&mut Registry` plus a per-tick
//! `dt` or other tunables, invoked in a fixed order each tick (input,
//! movement, AI, collision, damage, scoring, destruction, bounds).

pub mod boundary;
pub mod collision;
pub mod damage;
pub mod destruction;
pub mod enemy_shooting;
pub mod input;
pub mod monster_movement;
pub mod movement;
pub mod player_bounds;
pub mod score;
