//! Configuration file loading for aigenflow
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. Environment: `AIGENFLOW_<SECTION>__<KEY>`
//! 2. `--config <path>` specified file
//! 3. Project root: `./aigenflow.toml` or `./.aigenflow.toml`
//! 4. Global: `~/.config/aigenflow/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileContextConfig, FileLoggingConfig, FilePipelineConfig,
    FileProviderConfig, FileRecoveryConfig, FileRetryConfig, FileRouteConfig, FileRoutingConfig,
    FileStorageConfig,
};
pub use loader::ConfigLoader;
