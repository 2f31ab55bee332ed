//! Resilient gateway: provider session lifecycle and task routing.
//!
//! - [`session_manager::SessionManager`]: per-provider session state and recovery
//! - [`agent_router::AgentRouter`]: retry, fallback and safety-net dispatch

pub mod agent_router;
pub mod session_manager;
