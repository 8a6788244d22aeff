use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::HostApi;
use crate::error::{WatcherError, WatcherResult};
use crate::models::{BotSpec, HostConfig, UserAccessToken};

const HOST_API_PREFIX: &str = "/api/v4";

/// [`HostApi`] backed by the chat server's REST API, authenticated with an
/// administrator token.
pub struct RestHostApi {
    client: Client,
    site_url: String,
    admin_token: String,
}

#[derive(Debug, Deserialize)]
struct HostUser {
    id: String,
    #[serde(default)]
    is_bot: bool,
    #[serde(default)]
    delete_at: i64,
}

#[derive(Debug, Serialize)]
struct CreateBotRequest<'a> {
    username: &'a str,
    display_name: &'a str,
    description: &'a str,
}

#[derive(Debug, Deserialize)]
struct HostBot {
    user_id: String,
}

#[derive(Debug, Serialize)]
struct CreateTokenRequest<'a> {
    description: &'a str,
}

#[derive(Debug, Deserialize)]
struct HostErrorBody {
    #[serde(default)]
    message: String,
}

impl RestHostApi {
    pub fn new(
        site_url: impl Into<String>,
        admin_token: impl Into<String>,
        timeout: Duration,
    ) -> WatcherResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WatcherError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            site_url: site_url.into().trim_end_matches('/').to_string(),
            admin_token: admin_token.into(),
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}{}", self.site_url, HOST_API_PREFIX, path)
    }

    async fn error_from_response(resp: Response) -> WatcherError {
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<HostErrorBody>(&text)
            .map(|b| b.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| text.chars().take(200).collect());
        WatcherError::HostRequestFailed { status, message }
    }

    async fn find_user(&self, username: &str) -> WatcherResult<Option<HostUser>> {
        let resp = self
            .client
            .get(self.api_url(&format!("/users/username/{}", username)))
            .bearer_auth(&self.admin_token)
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }

        Ok(Some(resp.json::<HostUser>().await?))
    }

    async fn create_bot(&self, bot: &BotSpec) -> WatcherResult<String> {
        let resp = self
            .client
            .post(self.api_url("/bots"))
            .bearer_auth(&self.admin_token)
            .json(&CreateBotRequest {
                username: &bot.username,
                display_name: &bot.display_name,
                description: &bot.description,
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }

        let created = resp.json::<HostBot>().await?;
        info!(bot_id = %created.user_id, username = %bot.username, "Created bot account");
        Ok(created.user_id)
    }

    async fn enable_bot(&self, bot_id: &str) -> WatcherResult<()> {
        let resp = self
            .client
            .post(self.api_url(&format!("/bots/{}/enable", bot_id)))
            .bearer_auth(&self.admin_token)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }
        Ok(())
    }
}

#[async_trait]
impl HostApi for RestHostApi {
    async fn ensure_bot(&self, bot: &BotSpec) -> WatcherResult<String> {
        match self.find_user(&bot.username).await? {
            Some(user) if user.is_bot => {
                if user.delete_at != 0 {
                    warn!(bot_id = %user.id, "Bot account is disabled, re-enabling");
                    self.enable_bot(&user.id).await?;
                }
                debug!(bot_id = %user.id, "Bot account already exists");
                Ok(user.id)
            }
            Some(_) => Err(WatcherError::HostRequestFailed {
                status: StatusCode::CONFLICT.as_u16(),
                message: format!("username '{}' belongs to a non-bot user", bot.username),
            }),
            None => self.create_bot(bot).await,
        }
    }

    async fn create_access_token(
        &self,
        user_id: &str,
        description: &str,
    ) -> WatcherResult<UserAccessToken> {
        let resp = self
            .client
            .post(self.api_url(&format!("/users/{}/tokens", user_id)))
            .bearer_auth(&self.admin_token)
            .json(&CreateTokenRequest { description })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }

        let token = resp.json::<UserAccessToken>().await?;
        info!(user_id = user_id, token_id = %token.id, "Created access token");
        Ok(token)
    }

    fn get_config(&self) -> HostConfig {
        HostConfig::with_site_url(&self.site_url)
    }
}
