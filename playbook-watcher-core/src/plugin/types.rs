use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginInfo {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
}

impl PluginInfo {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            version: version.into(),
            description: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    #[default]
    Inactive,
    Activating,
    Active,
    Deactivated,
}

impl PluginState {
    pub fn can_activate(&self) -> bool {
        matches!(self, PluginState::Inactive | PluginState::Deactivated)
    }
}

impl std::fmt::Display for PluginState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PluginState::Inactive => write!(f, "inactive"),
            PluginState::Activating => write!(f, "activating"),
            PluginState::Active => write!(f, "active"),
            PluginState::Deactivated => write!(f, "deactivated"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PluginEvent {
    Activated {
        plugin_id: String,
        bot_id: String,
        timestamp: DateTime<Utc>,
    },
    ActivationFailed {
        plugin_id: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
    Deactivated {
        plugin_id: String,
        timestamp: DateTime<Utc>,
    },
    ConfigurationChanged {
        plugin_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl PluginEvent {
    pub fn activated(plugin_id: impl Into<String>, bot_id: impl Into<String>) -> Self {
        Self::Activated {
            plugin_id: plugin_id.into(),
            bot_id: bot_id.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn activation_failed(plugin_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self::ActivationFailed {
            plugin_id: plugin_id.into(),
            error: error.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn deactivated(plugin_id: impl Into<String>) -> Self {
        Self::Deactivated {
            plugin_id: plugin_id.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn configuration_changed(plugin_id: impl Into<String>) -> Self {
        Self::ConfigurationChanged {
            plugin_id: plugin_id.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn plugin_id(&self) -> &str {
        match self {
            Self::Activated { plugin_id, .. }
            | Self::ActivationFailed { plugin_id, .. }
            | Self::Deactivated { plugin_id, .. }
            | Self::ConfigurationChanged { plugin_id, .. } => plugin_id,
        }
    }
}
