//! Pipeline domain: phases, the run state machine, results and events.

pub mod config;
pub mod entities;
pub mod events;
pub mod phase;
pub mod result;
pub mod state;
