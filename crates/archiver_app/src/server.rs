//! HTTP trigger: each request runs a full archive and answers with the
//! fetched workspace as JSON.

use std::sync::Arc;

use anyhow::{Context, Result};
use archiver_core::WorkspaceSnapshot;
use archiver_logging::{archiver_error, archiver_info};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::context::AppContext;

pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(fetch_messages).post(fetch_messages))
        .with_state(ctx)
}

/// Always answers 200. A failed run is logged and answered with `{}`.
async fn fetch_messages(State(ctx): State<Arc<AppContext>>) -> Json<WorkspaceSnapshot> {
    match ctx.archive(true).await {
        Ok(report) => {
            archiver_info!(
                "Archive run finished: {} channel(s), {} message(s)",
                report.channels,
                report.messages
            );
            Json(report.snapshot.unwrap_or_default())
        }
        Err(err) => {
            archiver_error!("Error fetching messages from multiple channels: {:#}", err);
            Json(WorkspaceSnapshot::new())
        }
    }
}

/// Serves until Ctrl-C.
pub async fn serve(ctx: Arc<AppContext>, bind: &str, port: u16) -> Result<()> {
    let addr = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    archiver_info!("Listening on http://{}", addr);
    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("http server exited")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use archiver_engine::{ClientSettings, SlackWebClient};
    use serde_json::{json, Value};
    use wiremock::matchers::path;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn free_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
        listener.local_addr().expect("local_addr").port()
    }

    async fn start(ctx: AppContext) -> String {
        let port = free_port();
        tokio::spawn(serve(Arc::new(ctx), "127.0.0.1", port));
        let url = format!("http://127.0.0.1:{port}/");
        for _ in 0..100 {
            if tokio::net::TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
                return url;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        panic!("server on port {port} did not start");
    }

    fn context_for(slack: &MockServer, output: &std::path::Path) -> AppContext {
        let mut config = AppConfig::default();
        config.file.output_path = output.to_path_buf();
        let api =
            SlackWebClient::new("xoxp-test", slack.uri(), &ClientSettings::default()).unwrap();
        AppContext::from_parts(config, Arc::new(api), None)
    }

    #[tokio::test]
    async fn trigger_returns_fetched_workspace() {
        let slack = MockServer::start().await;
        Mock::given(path("/conversations.list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "channels": [{ "id": "C1", "name": "general" }],
                "response_metadata": { "next_cursor": "" }
            })))
            .mount(&slack)
            .await;
        Mock::given(path("/conversations.history"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "messages": [{ "type": "message", "user": "U1", "text": "hi", "ts": "1.0" }]
            })))
            .mount(&slack)
            .await;

        let temp = tempfile::TempDir::new().unwrap();
        let output = temp.path().join("allMessages.json");
        let url = start(context_for(&slack, &output)).await;

        let response = reqwest::Client::new().post(&url).send().await.unwrap();
        assert_eq!(response.status().as_u16(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(
            body,
            json!({ "general": [{ "type": "message", "user": "U1", "text": "hi", "ts": "1.0" }] })
        );
        assert!(output.exists());
    }

    #[tokio::test]
    async fn failed_run_answers_empty_object_with_ok_status() {
        let slack = MockServer::start().await;
        Mock::given(path("/conversations.list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "channels": [{ "id": "C1", "name": "general" }]
            })))
            .mount(&slack)
            .await;

        let temp = tempfile::TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        // The output's parent is a regular file, so the final write fails.
        let url = start(context_for(&slack, &blocker.join("allMessages.json"))).await;

        let response = reqwest::Client::new().get(&url).send().await.unwrap();
        assert_eq!(response.status().as_u16(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({}));
    }
}
