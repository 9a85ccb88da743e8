//! # NPC Session
//!
//! Event orchestration for a single game session. A submitted event is routed
//! to the actors it affects, the primary actor reacts on the caller's path, and
//! everyone else reacts in the background without blocking the caller.
//!
//! ## Core Components
//!
//! - **session**: lifecycle, event submission and the shared state lock
//! - **resolver**: deterministic affected-actor ordering
//! - **decision**: the injected decision backend interface
//! - **worker**: background fan-out over queued jobs
//! - **scheduler**: autonomous behaviour, the environment clock and maintenance
//! - **registry**: explicit ownership of live sessions
//!
//! World data (locations, actors, actions, the event log) lives in
//! `game_rules`; this crate never decides *what* an actor does, only when it
//! is asked and how the answer is applied.

pub mod config;
pub mod decision;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod response;
pub mod session;
pub mod supervisor;

mod scheduler;
mod worker;

pub use config::*;
pub use decision::*;
pub use error::*;
pub use registry::*;
pub use resolver::resolve;
pub use response::*;
pub use session::*;
pub use supervisor::TaskSupervisor;
