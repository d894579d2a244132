use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use planbook::SessionBuilder;
use planbook::http::ApiConfigBuilder;
use planbook::model::Role;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EVENTS: &str = concat!(
    "event: tool_call\ndata: {\"name\":\"add_task\",\"args\":{\"title\":\"Buy milk\"}}\n\n",
    ": keep-alive\n\n",
    "event: tool_result\ndata: {\"name\":\"add_task\",\"result\":{\"id\":12}}\n\n",
    "event: token\ndata: {\"content\":\"Added \"}\n\n",
    "event: token\ndata: {\"content\":\"it.\"}\n\n",
    "event: done\ndata: {\"message_id\":31,\"conversation_name\":\"Groceries\"}\n\n",
);

#[tokio::test]
async fn test_first_message_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/conversations"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 8,
            "name": "New conversation",
            "created_at": "2026-03-01T08:00:00Z",
            "updated_at": "2026-03-01T08:00:00Z",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/conversations/8/messages"))
        .and(header("authorization", "Bearer tok"))
        .and(body_json(json!({ "content": "Remind me to buy milk" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(EVENTS, "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = ApiConfigBuilder::with_base_url(server.uri())
        .with_token("tok")
        .build();
    let updates = Arc::new(AtomicUsize::new(0));
    let mut session = SessionBuilder::with_config(config)
        .on_update({
            let updates = Arc::clone(&updates);
            move |_| {
                updates.fetch_add(1, Ordering::Relaxed);
            }
        })
        .build();

    session.send(None, "Remind me to buy milk").await.unwrap();

    let store = session.store();
    assert_eq!(store.active_id(), Some(8));
    assert_eq!(store.active_conversation().unwrap().name, "Groceries");

    let messages = store.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::Human);
    let reply = &messages[1];
    assert_eq!(reply.content, "Added it.");
    assert_eq!(reply.id, Some(31));
    assert!(!reply.streaming);
    assert_eq!(reply.tool_calls[0].args["title"], "Buy milk");
    assert_eq!(reply.tool_calls[0].result.as_deref(), Some(r#"{"id":12}"#));

    // Create, append, two calls, two tokens and done.
    assert_eq!(updates.load(Ordering::Relaxed), 7);
}

#[tokio::test]
async fn test_refused_exchange_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/conversations/3/messages"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({ "detail": "Not your conversation" })),
        )
        .mount(&server)
        .await;

    let config = ApiConfigBuilder::with_base_url(server.uri()).build();
    let mut session = SessionBuilder::with_config(config).build();

    session.send(Some(3), "Hello").await.unwrap();

    let reply = session.store().messages().last().unwrap();
    assert_eq!(reply.content, "Error: Request failed: Not your conversation");
    assert!(!reply.streaming);
}
