use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

use crate::config::{FailureStatus, WatcherConfig};

/// Settings the host may change while the plugin is running.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSettings {
    #[serde(default)]
    pub failure_status: FailureStatus,
}

impl PluginSettings {
    pub fn from_config(config: &WatcherConfig) -> Self {
        Self {
            failure_status: config.upstream.failure_status,
        }
    }
}

/// Shared, swappable [`PluginSettings`].
///
/// Readers take a cheap `Arc` snapshot under the shared lock; a configuration
/// change replaces the snapshot under the exclusive lock. Snapshots handed out
/// earlier keep their values.
#[derive(Debug, Default)]
pub struct ConfigurationStore {
    current: RwLock<Arc<PluginSettings>>,
}

impl ConfigurationStore {
    pub fn new(settings: PluginSettings) -> Self {
        Self {
            current: RwLock::new(Arc::new(settings)),
        }
    }

    pub fn get(&self) -> Arc<PluginSettings> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    pub fn set(&self, settings: PluginSettings) {
        let next = Arc::new(settings);
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}
