use playbook_watcher_core::{
    bot_token_key, get_json, BotProvisioner, BotSpec, FileKvStore, KvStore, PlaybookWatcherPlugin,
    Plugin, PluginEvent, PluginState, RestHostApi, WatcherError,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ADMIN_TOKEN: &str = "admin-token";

fn host_for(server: &MockServer) -> Arc<RestHostApi> {
    Arc::new(RestHostApi::new(server.uri(), ADMIN_TOKEN, Duration::from_secs(5)).unwrap())
}

async fn mount_existing_bot(server: &MockServer, bot_id: &str) {
    Mock::given(method("GET"))
        .and(path("/api/v4/users/username/playbook-watcher"))
        .and(header("authorization", "Bearer admin-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": bot_id,
            "username": "playbook-watcher",
            "is_bot": true,
            "delete_at": 0
        })))
        .mount(server)
        .await;
}

async fn mount_token_mint(server: &MockServer, bot_id: &str, token: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path(format!("/api/v4/users/{}/tokens", bot_id)))
        .and(body_json(serde_json::json!({"description": ""})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "token-id",
            "token": token,
            "user_id": bot_id,
            "description": ""
        })))
        .expect(times)
        .mount(server)
        .await;
}

mod provisioning_tests {
    use super::*;

    #[tokio::test]
    async fn test_fresh_bot_mints_one_token_and_persists_it() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let kv_path = dir.path().join("kv.json");

        Mock::given(method("GET"))
            .and(path("/api/v4/users/username/playbook-watcher"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "message": "user not found"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v4/bots"))
            .and(body_json(serde_json::json!({
                "username": "playbook-watcher",
                "display_name": "Playbook Watcher",
                "description": ""
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "user_id": "bot-fresh",
                "username": "playbook-watcher"
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_token_mint(&server, "bot-fresh", "fresh-token", 1).await;

        let kv = Arc::new(FileKvStore::open(&kv_path).await.unwrap());
        let provisioner = BotProvisioner::new(host_for(&server), kv, BotSpec::default());
        let credential = provisioner.ensure_bot_ready().await.unwrap();

        assert_eq!(credential.bot_id, "bot-fresh");
        assert_eq!(credential.token, "fresh-token");

        let reopened = FileKvStore::open(&kv_path).await.unwrap();
        let stored: Option<String> = get_json(&reopened, &bot_token_key("bot-fresh"))
            .await
            .unwrap();
        assert_eq!(stored.as_deref(), Some("fresh-token"));
    }

    #[tokio::test]
    async fn test_token_survives_restart() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let kv_path = dir.path().join("nested").join("kv.json");

        mount_existing_bot(&server, "bot-1").await;
        mount_token_mint(&server, "bot-1", "first-token", 1).await;

        let first = {
            let kv = Arc::new(FileKvStore::open(&kv_path).await.unwrap());
            BotProvisioner::new(host_for(&server), kv, BotSpec::default())
                .ensure_bot_ready()
                .await
                .unwrap()
        };

        let second = {
            let kv = Arc::new(FileKvStore::open(&kv_path).await.unwrap());
            BotProvisioner::new(host_for(&server), kv, BotSpec::default())
                .ensure_bot_ready()
                .await
                .unwrap()
        };

        assert_eq!(first.token, "first-token");
        assert_eq!(second.token, "first-token");
        assert_eq!(first.bot_id, second.bot_id);
    }

    #[tokio::test]
    async fn test_empty_stored_token_is_reminted() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let kv_path = dir.path().join("kv.json");
        std::fs::write(&kv_path, r#"{"bot-token-key-bot-1": ""}"#).unwrap();

        mount_existing_bot(&server, "bot-1").await;
        mount_token_mint(&server, "bot-1", "new-token", 1).await;

        let kv = Arc::new(FileKvStore::open(&kv_path).await.unwrap());
        let credential = BotProvisioner::new(host_for(&server), kv, BotSpec::default())
            .ensure_bot_ready()
            .await
            .unwrap();
        assert_eq!(credential.token, "new-token");
    }

    #[tokio::test]
    async fn test_non_bot_username_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v4/users/username/playbook-watcher"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "human",
                "username": "playbook-watcher",
                "is_bot": false
            })))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let kv = Arc::new(FileKvStore::open(dir.path().join("kv.json")).await.unwrap());
        let err = BotProvisioner::new(host_for(&server), kv, BotSpec::default())
            .ensure_bot_ready()
            .await
            .unwrap_err();

        assert!(matches!(err, WatcherError::BotEnsureFailed { .. }));
        assert!(err.is_provision_error());
    }
}

mod activation_failure_tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    #[tokio::test]
    async fn test_token_mint_failure_keeps_plugin_inactive() {
        let server = MockServer::start().await;
        mount_existing_bot(&server, "bot-1").await;
        Mock::given(method("POST"))
            .and(path("/api/v4/users/bot-1/tokens"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "message": "personal access tokens are disabled"
            })))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let kv = Arc::new(FileKvStore::open(dir.path().join("kv.json")).await.unwrap());
        let plugin = PlaybookWatcherPlugin::new(host_for(&server), kv.clone());

        let err = plugin.on_activate().await.unwrap_err();
        assert!(matches!(err, WatcherError::TokenCreateFailed { .. }));
        assert!(err.to_string().contains("personal access tokens are disabled"));

        assert_eq!(plugin.state().await, PluginState::Inactive);
        assert!(kv.get(&bot_token_key("bot-1")).await.unwrap().is_none());
        assert!(matches!(
            plugin.events().as_slice(),
            [PluginEvent::ActivationFailed { .. }]
        ));

        let request = Request::builder().uri("/hello").body(Body::empty()).unwrap();
        let response = plugin.serve_http(request).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_host_unreachable_fails_activation() {
        let host = Arc::new(
            RestHostApi::new("http://127.0.0.1:1", ADMIN_TOKEN, Duration::from_secs(2)).unwrap(),
        );
        let dir = TempDir::new().unwrap();
        let kv = Arc::new(FileKvStore::open(dir.path().join("kv.json")).await.unwrap());
        let plugin = PlaybookWatcherPlugin::new(host, kv);

        let err = plugin.on_activate().await.unwrap_err();
        assert!(matches!(err, WatcherError::BotEnsureFailed { .. }));
        assert_eq!(plugin.state().await, PluginState::Inactive);
    }
}
