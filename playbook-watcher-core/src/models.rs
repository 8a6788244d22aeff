use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_BOT_USERNAME: &str = "playbook-watcher";
pub const DEFAULT_BOT_DISPLAY_NAME: &str = "Playbook Watcher";

/// Identity of the bot principal the plugin acts as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotSpec {
    pub username: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
}

impl BotSpec {
    pub fn new(username: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            display_name: display_name.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl Default for BotSpec {
    fn default() -> Self {
        Self::new(DEFAULT_BOT_USERNAME, DEFAULT_BOT_DISPLAY_NAME)
    }
}

/// A bot id together with the access token the plugin authenticates with.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotCredential {
    pub bot_id: String,
    pub token: String,
}

impl BotCredential {
    pub fn new(bot_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            bot_id: bot_id.into(),
            token: token.into(),
        }
    }

    /// Token with everything but the last four characters hidden.
    pub fn masked_token(&self) -> String {
        mask_secret(&self.token)
    }
}

impl std::fmt::Debug for BotCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotCredential")
            .field("bot_id", &self.bot_id)
            .field("token", &self.masked_token())
            .finish()
    }
}

pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("****{}", visible)
    }
}

/// Access token as minted by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccessToken {
    #[serde(default)]
    pub id: String,
    pub token: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub description: String,
}

/// The subset of host configuration the plugin reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostConfig {
    pub site_url: Option<String>,
}

impl HostConfig {
    pub fn with_site_url(site_url: impl Into<String>) -> Self {
        Self {
            site_url: Some(site_url.into()),
        }
    }
}

/// One upstream workflow run. The payload is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaybookRun(serde_json::Value);

impl PlaybookRun {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(|v| v.as_str())
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(|v| v.as_str())
    }

    pub fn current_status(&self) -> Option<&str> {
        self.0.get("current_status").and_then(|v| v.as_str())
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

impl From<serde_json::Value> for PlaybookRun {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// A page of runs as returned by the playbooks API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybookRunList {
    #[serde(default)]
    pub total_count: i64,
    #[serde(default)]
    pub page_count: i64,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub items: Vec<PlaybookRun>,
}

impl PlaybookRunList {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<PlaybookRun>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<PlaybookRun>>::deserialize(deserializer)?.unwrap_or_default())
}
