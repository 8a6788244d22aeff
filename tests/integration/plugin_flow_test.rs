use playbook_watcher_core::{
    DynPlugin, FailureStatus, InMemoryKvStore, PlaybookWatcherPlugin, Plugin, PluginSettings,
    RestHostApi, WatcherServer,
};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RUNS_PATH: &str = "/plugins/playbooks/api/v0/runs";

/// One mock server plays both the chat server REST API and the playbooks API.
async fn mock_site(bot_token: &str) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/users/username/playbook-watcher"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "bot-1",
            "username": "playbook-watcher",
            "is_bot": true,
            "delete_at": 0
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v4/users/bot-1/tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "token-id",
            "token": bot_token,
            "user_id": "bot-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    server
}

async fn start_watcher(site: &MockServer) -> (Arc<PlaybookWatcherPlugin>, WatcherServer) {
    let host = Arc::new(RestHostApi::new(site.uri(), "admin", Duration::from_secs(5)).unwrap());
    let plugin = Arc::new(
        PlaybookWatcherPlugin::new(host, Arc::new(InMemoryKvStore::new()))
            .with_timeout(Duration::from_secs(2)),
    );
    plugin.on_activate().await.unwrap();

    let dyn_plugin: DynPlugin = plugin.clone();
    let server = WatcherServer::start("127.0.0.1:0", "playbook-watcher", dyn_plugin)
        .await
        .unwrap();
    (plugin, server)
}

mod hello_tests {
    use super::*;

    #[tokio::test]
    async fn test_hello_over_http() {
        let site = mock_site("bot-token").await;
        let (_plugin, server) = start_watcher(&site).await;
        let client = reqwest::Client::new();

        for m in [reqwest::Method::GET, reqwest::Method::POST, reqwest::Method::PUT] {
            let resp = client
                .request(m, format!("{}/hello", server.plugin_url()))
                .body("ignored")
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status(), 200);
            assert_eq!(resp.text().await.unwrap(), "Hello World!");
        }
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let site = mock_site("bot-token").await;
        let (_plugin, server) = start_watcher(&site).await;

        let resp = reqwest::get(format!("{}/missing", server.plugin_url()))
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn test_health_reports_active() {
        let site = mock_site("bot-token").await;
        let (_plugin, server) = start_watcher(&site).await;

        let json: serde_json::Value = reqwest::get(format!("{}/health", server.url()))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(json["state"], "active");
        assert_eq!(json["plugin"], "playbook-watcher");
    }
}

mod runs_tests {
    use super::*;

    #[tokio::test]
    async fn test_runs_relayed_in_order_with_bot_token() {
        let site = mock_site("bot-token").await;
        Mock::given(method("GET"))
            .and(path(RUNS_PATH))
            .and(header("authorization", "Bearer bot-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total_count": 3,
                "page_count": 1,
                "has_more": false,
                "items": [
                    {"id": "r2", "name": "Second", "checklists": [{"title": "a"}]},
                    {"id": "r1", "name": "First"},
                    {"id": "r3", "name": "Third", "extra": {"nested": true}}
                ]
            })))
            .mount(&site)
            .await;

        let (_plugin, server) = start_watcher(&site).await;
        let resp = reqwest::get(format!("{}/runs", server.plugin_url()))
            .await
            .unwrap();

        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers()["content-type"].to_str().unwrap(),
            "application/json"
        );
        let runs: Vec<serde_json::Value> = resp.json().await.unwrap();
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0]["id"], "r2");
        assert_eq!(runs[1]["id"], "r1");
        assert_eq!(runs[2]["id"], "r3");
        assert_eq!(runs[0]["checklists"][0]["title"], "a");
        assert_eq!(runs[2]["extra"]["nested"], true);
    }

    #[tokio::test]
    async fn test_runs_empty_list() {
        let site = mock_site("bot-token").await;
        Mock::given(method("GET"))
            .and(path(RUNS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total_count": 0,
                "page_count": 0,
                "has_more": false,
                "items": []
            })))
            .mount(&site)
            .await;

        let (_plugin, server) = start_watcher(&site).await;
        let body = reqwest::get(format!("{}/runs", server.plugin_url()))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "[]");
    }

    #[tokio::test]
    async fn test_runs_upstream_error_returns_null() {
        let site = mock_site("bot-token").await;
        Mock::given(method("GET"))
            .and(path(RUNS_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&site)
            .await;

        let (_plugin, server) = start_watcher(&site).await;
        let resp = reqwest::get(format!("{}/runs", server.plugin_url()))
            .await
            .unwrap();

        assert_eq!(resp.status(), 200);
        assert_eq!(resp.text().await.unwrap(), "null");
    }

    #[tokio::test]
    async fn test_failure_policy_change_applies_to_next_request() {
        let site = mock_site("bot-token").await;
        Mock::given(method("GET"))
            .and(path(RUNS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&site)
            .await;

        let (plugin, server) = start_watcher(&site).await;
        let url = format!("{}/runs", server.plugin_url());

        assert_eq!(reqwest::get(&url).await.unwrap().status(), 200);

        plugin
            .on_configuration_change(PluginSettings {
                failure_status: FailureStatus::BadGateway,
            })
            .unwrap();

        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), 502);
        assert_eq!(resp.text().await.unwrap(), "null");
    }

    #[tokio::test]
    async fn test_concurrent_requests() {
        let site = mock_site("bot-token").await;
        Mock::given(method("GET"))
            .and(path(RUNS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"id": "only"}]
            })))
            .expect(10)
            .mount(&site)
            .await;

        let (_plugin, server) = start_watcher(&site).await;
        let client = reqwest::Client::new();
        let mut handles = Vec::new();

        for i in 0..20 {
            let client = client.clone();
            let route = if i % 2 == 0 { "runs" } else { "hello" };
            let url = format!("{}/{}", server.plugin_url(), route);
            handles.push(tokio::spawn(async move {
                let resp = client.get(url).send().await.unwrap();
                (route, resp.status().as_u16(), resp.text().await.unwrap())
            }));
        }

        for handle in handles {
            let (route, status, body) = handle.await.unwrap();
            assert_eq!(status, 200);
            match route {
                "runs" => assert_eq!(body, r#"[{"id":"only"}]"#),
                _ => assert_eq!(body, "Hello World!"),
            }
        }
    }
}

mod lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn test_deactivated_plugin_returns_503() {
        let site = mock_site("bot-token").await;
        let (plugin, mut server) = start_watcher(&site).await;

        plugin.on_deactivate().await.unwrap();

        let resp = reqwest::get(format!("{}/hello", server.plugin_url()))
            .await
            .unwrap();
        assert_eq!(resp.status(), 503);

        server.stop();
        server.wait().await.unwrap();
    }
}
