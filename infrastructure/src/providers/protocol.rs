//! JSON payloads exchanged with a bridge process over stdin/stdout.
//!
//! | Subcommand | stdin            | stdout            |
//! |------------|------------------|-------------------|
//! | `send`     | [`SendRequest`]  | [`SendResponse`]  |
//! | `check`    | -                | -                 |
//! | `refresh`  | -                | -                 |
//! | `login`    | -                | -                 |
//! | `export`   | -                | [`SessionBundle`] or empty |
//! | `import`   | [`SessionBundle`]| -                 |
//!
//! Status-only subcommands report through the exit code alone.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct SendRequest<'a> {
    pub prompt: &'a str,
    pub context: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct SendResponse {
    pub content: String,
    #[serde(default)]
    pub tokens_used: u32,
}

/// Exported browser session
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionBundle {
    pub secret: String,
    #[serde(default)]
    pub item_count: usize,
}
