//! # Game Rules
//!
//! The "World Bible" crate - contains actor definitions, the action set and the
//! environment state store (locations, placement, event log, time, weather).
//! This crate is the single source of truth for world state and does not
//! contain any decision-making or scheduling logic.

pub mod entities;
pub mod error;
pub mod mechanics;
pub mod world_state;

pub use entities::*;
pub use error::*;
pub use mechanics::*;
pub use world_state::*;
