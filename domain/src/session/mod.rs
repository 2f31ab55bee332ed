//! Provider session domain: lifecycle state, metadata and credentials.

pub mod credential;
pub mod metadata;
pub mod state;
