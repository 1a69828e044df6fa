use archiver_core::Channel;
use archiver_engine::{
    ApiError, ChannelEnumerator, ChatApi, ClientSettings, HistoryFetcher, MessageShape,
    SlackWebClient, PAGE_SIZE,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> SlackWebClient {
    SlackWebClient::new("xoxp-test", server.uri(), &ClientSettings::default()).unwrap()
}

fn channel_page(ids: &[&str], next_cursor: &str) -> Value {
    let channels: Vec<Value> = ids
        .iter()
        .map(|id| json!({ "id": id, "name": format!("name-{id}"), "is_channel": true }))
        .collect();
    json!({
        "ok": true,
        "channels": channels,
        "response_metadata": { "next_cursor": next_cursor }
    })
}

#[tokio::test]
async fn enumerator_follows_cursor_until_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/conversations.list"))
        .and(query_param_is_missing("cursor"))
        .and(query_param("limit", PAGE_SIZE.to_string()))
        .and(header("authorization", "Bearer xoxp-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(channel_page(&["C1", "C2"], "page2")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/conversations.list"))
        .and(query_param("cursor", "page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(channel_page(&["C3", "C4"], "page3")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/conversations.list"))
        .and(query_param("cursor", "page3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "channels": [],
            "response_metadata": {}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let channels = ChannelEnumerator::new(&client).list_channels().await.unwrap();

    assert_eq!(
        channels,
        vec![
            Channel::new("C1", "name-C1"),
            Channel::new("C2", "name-C2"),
            Channel::new("C3", "name-C3"),
            Channel::new("C4", "name-C4"),
        ]
    );
}

#[tokio::test]
async fn duplicate_channels_across_pages_are_kept() {
    let server = MockServer::start().await;
    Mock::given(path("/conversations.list"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(channel_page(&["C1"], "next")))
        .mount(&server)
        .await;
    Mock::given(path("/conversations.list"))
        .and(query_param("cursor", "next"))
        .respond_with(ResponseTemplate::new(200).set_body_json(channel_page(&["C1"], "")))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let channels = ChannelEnumerator::new(&client).list_channels().await.unwrap();
    assert_eq!(channels.len(), 2);
    assert_eq!(channels[0], channels[1]);
}

#[tokio::test]
async fn history_pages_concatenate_in_served_order() {
    let server = MockServer::start().await;
    Mock::given(path("/conversations.history"))
        .and(query_param("channel", "C1"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "messages": [{ "ts": "3", "text": "c" }, { "ts": "1", "text": "a" }],
            "has_more": true,
            "response_metadata": { "next_cursor": "bmV4dA==" }
        })))
        .mount(&server)
        .await;
    Mock::given(path("/conversations.history"))
        .and(query_param("channel", "C1"))
        .and(query_param("cursor", "bmV4dA=="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "messages": [{ "ts": "2", "text": "b" }],
            "has_more": false
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let messages = HistoryFetcher::new(&client, MessageShape::Raw)
        .fetch_history("C1")
        .await
        .unwrap();

    let ts: Vec<_> = messages.iter().map(|m| m["ts"].as_str().unwrap()).collect();
    assert_eq!(ts, vec!["3", "1", "2"]);
}

#[tokio::test]
async fn normalized_shape_fills_missing_user_with_null() {
    let server = MockServer::start().await;
    Mock::given(path("/conversations.history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "messages": [
                { "type": "message", "subtype": "bot_message", "text": "deploy done", "ts": "1.5", "bot_id": "B1" }
            ]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let messages = HistoryFetcher::new(&client, MessageShape::Normalized)
        .fetch_history("C1")
        .await
        .unwrap();

    assert_eq!(
        messages,
        vec![json!({ "user": null, "text": "deploy done", "ts": "1.5", "type": "message" })]
    );
}

#[tokio::test]
async fn failure_on_second_page_discards_partial_history() {
    let server = MockServer::start().await;
    Mock::given(path("/conversations.history"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "messages": [{ "ts": "1" }],
            "response_metadata": { "next_cursor": "p2" }
        })))
        .mount(&server)
        .await;
    Mock::given(path("/conversations.history"))
        .and(query_param("cursor", "p2"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = HistoryFetcher::new(&client, MessageShape::Raw)
        .fetch_history("C1")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ApiError::HttpStatus {
            status: 500,
            body: "boom".to_string()
        }
    );
}

#[tokio::test]
async fn platform_error_and_rate_limit_are_reported() {
    let server = MockServer::start().await;
    Mock::given(path("/conversations.list"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "ok": false, "error": "invalid_auth" })),
        )
        .mount(&server)
        .await;
    Mock::given(path("/conversations.history"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.list_conversations(None, PAGE_SIZE).await.unwrap_err();
    assert_eq!(err, ApiError::Platform("invalid_auth".to_string()));

    let err = client.list_history("C1", None, PAGE_SIZE).await.unwrap_err();
    assert_eq!(
        err,
        ApiError::RateLimited {
            retry_after: Some(30)
        }
    );
}
