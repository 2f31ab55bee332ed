//! Provider adapters backed by external bridge processes.

pub mod command_adapter;
pub mod error;
pub mod protocol;

pub use command_adapter::CommandProviderAdapter;
pub use error::BridgeError;

use crate::config::FileConfig;
use aigenflow_application::ProviderAdapter;
use aigenflow_domain::ProviderKind;
use std::sync::Arc;
use tracing::{debug, warn};

/// One adapter per enabled provider, in [`ProviderKind::ALL`] order.
///
/// Providers whose bridge cannot be found are still registered; their calls
/// fail as unavailable and the router falls back around them.
pub fn build_adapters(config: &FileConfig) -> Vec<Arc<dyn ProviderAdapter>> {
    ProviderKind::ALL
        .iter()
        .filter_map(|&kind| {
            let settings = config.provider(kind);
            if !settings.enabled {
                debug!(provider = %kind, "Provider disabled by configuration");
                return None;
            }
            let adapter = CommandProviderAdapter::from_config(kind, &settings);
            if !adapter.is_installed() {
                warn!(provider = %kind, command = %settings.command, "Bridge command not found on PATH");
            }
            Some(Arc::new(adapter) as Arc<dyn ProviderAdapter>)
        })
        .collect()
}
