//! Bot account and access-token bootstrap.
//!
//! The provisioner makes sure the plugin has a bot principal and a persisted
//! access token for it. A token is minted only when none is stored under
//! [`BOT_TOKEN_KEY_PREFIX`]`<bot_id>`; a stored token is reused as-is.

use tracing::{debug, info};

use crate::error::{WatcherError, WatcherResult};
use crate::host::{get_json, set_json, DynHostApi, DynKvStore};
use crate::models::{BotCredential, BotSpec};

pub const BOT_TOKEN_KEY_PREFIX: &str = "bot-token-key-";

pub fn bot_token_key(bot_id: &str) -> String {
    format!("{}{}", BOT_TOKEN_KEY_PREFIX, bot_id)
}

pub struct BotProvisioner {
    host: DynHostApi,
    kv: DynKvStore,
    bot: BotSpec,
}

impl BotProvisioner {
    pub fn new(host: DynHostApi, kv: DynKvStore, bot: BotSpec) -> Self {
        Self { host, kv, bot }
    }

    pub fn bot(&self) -> &BotSpec {
        &self.bot
    }

    pub async fn ensure_bot_ready(&self) -> WatcherResult<BotCredential> {
        let bot_id = self.host.ensure_bot(&self.bot).await.map_err(|e| {
            WatcherError::BotEnsureFailed {
                username: self.bot.username.clone(),
                message: e.to_string(),
            }
        })?;

        let key = bot_token_key(&bot_id);

        let stored: Option<String> =
            get_json(self.kv.as_ref(), &key)
                .await
                .map_err(|e| WatcherError::TokenLookupFailed {
                    key: key.clone(),
                    message: e.to_string(),
                })?;

        if let Some(token) = stored.filter(|t| !t.is_empty()) {
            debug!(bot_id = %bot_id, "Reusing stored bot token");
            return Ok(BotCredential::new(bot_id, token));
        }

        let minted = self
            .host
            .create_access_token(&bot_id, "")
            .await
            .map_err(|e| WatcherError::TokenCreateFailed {
                bot_id: bot_id.clone(),
                message: e.to_string(),
            })?;

        set_json(self.kv.as_ref(), &key, &minted.token)
            .await
            .map_err(|e| WatcherError::TokenPersistFailed {
                key: key.clone(),
                message: e.to_string(),
            })?;

        info!(bot_id = %bot_id, "Minted and stored new bot token");
        Ok(BotCredential::new(bot_id, minted.token))
    }
}
