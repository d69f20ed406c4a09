//! API Integration Tests
//!
//! Tests the HTTP API endpoints with a real database.
//!
//! Tests are serialized because they share a global test pool.
//!
//! Note: The `more-di` DI framework doesn't support injecting custom pools.
//! We work around this by using `DatabaseConnection::set_test_pool()` to set
//! a global pool that the DI-created DatabaseConnection will use. The agent
//! runtime is replaced with a canned stub so no network is involved.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use di::{Injectable, ServiceCollection, inject, injectable};
use di_axum::RouterServiceProviderExtensions;
use serde_json::{Value, json};
use serial_test::serial;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicU32, Ordering};
use todo_assistant_api::{
    api,
    config::AppConfig,
    core::assistant::{AgentReply, Assistant, ChatMessage, Tool},
    core::error::ServiceError,
    core::security::JwtAuthenticator,
    core::services::{MyAuthService, MyChatService, MyTodoService},
    core::traits::AgentRuntime,
    infrastructure::database::DatabaseConnection,
    infrastructure::repositories::{DbConversationRepository, DbTodoRepository, DbUserRepository},
};
use tower::ServiceExt;
use uuid::Uuid;

const TEST_SECRET: &str = "integration-tests-secret";
const STUB_REPLY: &str = "All done!";

/// Counter for unique test database URIs
static TEST_DB_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Agent runtime double returning a fixed reply and never calling tools.
pub struct StubAgentRuntime;

#[injectable(AgentRuntime)]
impl StubAgentRuntime {
    #[inject]
    pub fn new() -> StubAgentRuntime {
        StubAgentRuntime
    }
}

#[async_trait]
impl AgentRuntime for StubAgentRuntime {
    async fn chat(
        &self,
        _messages: &[ChatMessage],
        _tools: &[Tool],
    ) -> Result<AgentReply, ServiceError> {
        Ok(AgentReply {
            content: Some(STUB_REPLY.to_owned()),
            tool_calls: Vec::new(),
        })
    }
}

/// Setup test database with migrations and returns pool
async fn setup_test_db() -> SqlitePool {
    unsafe {
        std::env::set_var("JWT_SECRET_KEY", TEST_SECRET);
        std::env::remove_var("JWT_ALGORITHM");
        std::env::remove_var("JWT_EXPIRATION_MINUTES");
    }

    let db_num = TEST_DB_COUNTER.fetch_add(1, Ordering::SeqCst);
    // Use file URI format with shared cache - each test gets a unique DB
    let db_url = format!("sqlite:file:testdb{}?mode=memory&cache=shared", db_num);

    let pool = SqlitePool::connect(&db_url).await.unwrap();
    sqlx::migrate!().run(&pool).await.unwrap();

    DatabaseConnection::set_test_pool(pool.clone());

    pool
}

fn cleanup_test_db() {
    DatabaseConnection::clear_test_pool();
}

/// Create test app - uses the global test pool set by setup_test_db()
fn create_test_app() -> axum::Router {
    let provider = ServiceCollection::new()
        .add(AppConfig::singleton())
        .add(DatabaseConnection::transient())
        .add(DbUserRepository::scoped())
        .add(DbTodoRepository::scoped())
        .add(DbConversationRepository::scoped())
        .add(JwtAuthenticator::singleton())
        .add(MyAuthService::scoped())
        .add(MyTodoService::scoped())
        .add(MyChatService::scoped())
        .add(StubAgentRuntime::singleton())
        .add(Assistant::scoped())
        .build_provider()
        .unwrap();

    axum::Router::new()
        .nest("/auth", api::auth::router())
        .nest("/todos", api::todos::router())
        .nest("/chat", api::chat::router())
        .with_provider(provider)
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let body = match body {
        Some(value) => Body::from(serde_json::to_vec(&value).unwrap()),
        None => Body::empty(),
    };

    builder.body(body).unwrap()
}

async fn send(request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = create_test_app().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    (status, bytes)
}

async fn send_json(request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(request).await;
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Registers a user and returns (token, user_id).
async fn signup(email: &str, password: &str) -> (String, String) {
    let (status, json) = send_json(json_request(
        "POST",
        "/auth/signup",
        None,
        Some(json!({ "email": email, "password": password })),
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    (
        json["access_token"].as_str().unwrap().to_owned(),
        json["user"]["id"].as_str().unwrap().to_owned(),
    )
}

async fn create_todo(token: &str, title: &str, description: Option<&str>) -> Value {
    let (status, json) = send_json(json_request(
        "POST",
        "/todos",
        Some(token),
        Some(json!({ "title": title, "description": description })),
    ))
    .await;

    assert_eq!(status, StatusCode::CREATED);
    json
}

#[tokio::test]
#[serial]
async fn test_signup_token_resolves_to_created_user() {
    let _pool = setup_test_db().await;

    let (token, user_id) = signup("alice@example.com", "password1").await;

    // The token's subject must be the id of the record just created.
    let claims = jsonwebtoken::decode::<Value>(
        &token,
        &jsonwebtoken::DecodingKey::from_secret(TEST_SECRET.as_bytes()),
        &jsonwebtoken::Validation::default(),
    )
    .unwrap()
    .claims;

    assert_eq!(claims["sub"].as_str().unwrap(), user_id);
    assert_eq!(claims["email"].as_str().unwrap(), "alice@example.com");

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_duplicate_email_signup_rejected() {
    let _pool = setup_test_db().await;

    signup("alice@example.com", "password1").await;

    let (status, json) = send_json(json_request(
        "POST",
        "/auth/signup",
        None,
        Some(json!({ "email": "alice@example.com", "password": "different" })),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["detail"], "Email already registered");
    assert_eq!(json["success"], false);

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_signin_failures_are_indistinguishable() {
    let _pool = setup_test_db().await;

    signup("alice@example.com", "password1").await;

    let (wrong_password_status, wrong_password_body) = send(json_request(
        "POST",
        "/auth/signin",
        None,
        Some(json!({ "email": "alice@example.com", "password": "wrong" })),
    ))
    .await;

    let (unknown_email_status, unknown_email_body) = send(json_request(
        "POST",
        "/auth/signin",
        None,
        Some(json!({ "email": "nobody@example.com", "password": "password1" })),
    ))
    .await;

    assert_eq!(wrong_password_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email_status, StatusCode::UNAUTHORIZED);
    // Bit-identical: neither case is distinguishable from the other.
    assert_eq!(wrong_password_body, unknown_email_body);

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_signin_returns_fresh_token() {
    let _pool = setup_test_db().await;

    let (_, user_id) = signup("alice@example.com", "password1").await;

    let (status, json) = send_json(json_request(
        "POST",
        "/auth/signin",
        None,
        Some(json!({ "email": "alice@example.com", "password": "password1" })),
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["token_type"], "bearer");
    assert_eq!(json["user"]["id"].as_str().unwrap(), user_id);

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_cross_user_access_reads_as_not_found() {
    let _pool = setup_test_db().await;

    let (alice_token, _) = signup("alice@example.com", "password1").await;
    let (bob_token, _) = signup("bob@example.com", "password2").await;

    let todo = create_todo(&alice_token, "secret plans", Some("do not leak")).await;
    let todo_id = todo["id"].as_i64().unwrap();

    let (foreign_status, foreign_body) = send(json_request(
        "GET",
        &format!("/todos/{todo_id}"),
        Some(&bob_token),
        None,
    ))
    .await;

    let (missing_status, missing_body) = send(json_request(
        "GET",
        "/todos/999999",
        Some(&bob_token),
        None,
    ))
    .await;

    // 404, never 403, and no body difference that would reveal existence.
    assert_eq!(foreign_status, StatusCode::NOT_FOUND);
    assert_eq!(missing_status, StatusCode::NOT_FOUND);
    assert_eq!(foreign_body, missing_body);

    let json: Value = serde_json::from_slice(&foreign_body).unwrap();
    assert_eq!(json["detail"], "Unauthorized");

    // Same policy for mutations.
    for (method, body) in [
        ("PUT", Some(json!({ "title": "hijacked" }))),
        ("PATCH", Some(json!({ "completed": true }))),
        ("DELETE", None),
    ] {
        let (status, _) = send(json_request(
            method,
            &format!("/todos/{todo_id}"),
            Some(&bob_token),
            body,
        ))
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method} should 404");
    }

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_listing_is_owner_scoped() {
    let _pool = setup_test_db().await;

    let (alice_token, alice_id) = signup("alice@example.com", "password1").await;
    let (bob_token, _) = signup("bob@example.com", "password2").await;

    // Interleaved creates.
    create_todo(&alice_token, "a1", None).await;
    create_todo(&bob_token, "b1", None).await;
    create_todo(&alice_token, "a2", None).await;
    create_todo(&bob_token, "b2", None).await;
    create_todo(&bob_token, "b3", None).await;

    let (status, json) = send_json(json_request("GET", "/todos", Some(&alice_token), None)).await;
    assert_eq!(status, StatusCode::OK);

    let todos = json.as_array().unwrap();
    assert_eq!(todos.len(), 2);
    for todo in todos {
        assert_eq!(todo["user_id"].as_str().unwrap(), alice_id);
    }

    let (status, json) = send_json(json_request(
        "GET",
        "/todos?completed=false",
        Some(&bob_token),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 3);

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_expired_and_forged_tokens_rejected_identically() {
    let _pool = setup_test_db().await;

    let (_, user_id) = signup("alice@example.com", "password1").await;

    let now = chrono::Utc::now().timestamp();
    let expired = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &json!({ "sub": user_id, "iat": now - 7200, "exp": now - 3600 }),
        &jsonwebtoken::EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap();

    let forged = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &json!({ "sub": user_id, "iat": now, "exp": now + 3600 }),
        &jsonwebtoken::EncodingKey::from_secret(b"attacker-secret"),
    )
    .unwrap();

    let (expired_status, expired_body) =
        send(json_request("GET", "/todos", Some(&expired), None)).await;
    let (forged_status, forged_body) =
        send(json_request("GET", "/todos", Some(&forged), None)).await;

    assert_eq!(expired_status, StatusCode::UNAUTHORIZED);
    assert_eq!(forged_status, StatusCode::UNAUTHORIZED);
    assert_eq!(expired_body, forged_body);

    let json: Value = serde_json::from_slice(&expired_body).unwrap();
    assert_eq!(json["detail"], "Unauthorized");

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_patch_changes_only_supplied_fields() {
    let _pool = setup_test_db().await;

    let (token, _) = signup("alice@example.com", "password1").await;
    let todo = create_todo(&token, "write report", Some("quarterly numbers")).await;
    let todo_id = todo["id"].as_i64().unwrap();
    let created_updated_at = todo["updated_at"].as_str().unwrap().to_owned();

    let (status, patched) = send_json(json_request(
        "PATCH",
        &format!("/todos/{todo_id}"),
        Some(&token),
        Some(json!({ "completed": true })),
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["title"], "write report");
    assert_eq!(patched["description"], "quarterly numbers");
    assert_eq!(patched["completed"], true);

    let before = chrono::DateTime::parse_from_rfc3339(&created_updated_at).unwrap();
    let after =
        chrono::DateTime::parse_from_rfc3339(patched["updated_at"].as_str().unwrap()).unwrap();
    assert!(after > before);

    // An explicit null clears the description.
    let (status, cleared) = send_json(json_request(
        "PATCH",
        &format!("/todos/{todo_id}"),
        Some(&token),
        Some(json!({ "description": null })),
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(cleared["description"].is_null());
    assert_eq!(cleared["title"], "write report");

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_put_replaces_all_fields() {
    let _pool = setup_test_db().await;

    let (token, _) = signup("alice@example.com", "password1").await;
    let todo = create_todo(&token, "write report", Some("quarterly numbers")).await;
    let todo_id = todo["id"].as_i64().unwrap();

    // Omitted description is overwritten to null, completed resets to false.
    let (status, replaced) = send_json(json_request(
        "PUT",
        &format!("/todos/{todo_id}"),
        Some(&token),
        Some(json!({ "title": "rewritten" })),
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(replaced["title"], "rewritten");
    assert!(replaced["description"].is_null());
    assert_eq!(replaced["completed"], false);

    // Title is mandatory on PUT.
    let (status, _) = send(json_request(
        "PUT",
        &format!("/todos/{todo_id}"),
        Some(&token),
        Some(json!({ "description": "no title" })),
    ))
    .await;
    assert!(status.is_client_error());

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_create_get_delete_roundtrip() {
    let _pool = setup_test_db().await;

    let (token, user_id) = signup("alice@example.com", "password1").await;
    let todo = create_todo(&token, "buy milk", Some("2 liters")).await;
    let todo_id = todo["id"].as_i64().unwrap();

    let (status, fetched) = send_json(json_request(
        "GET",
        &format!("/todos/{todo_id}"),
        Some(&token),
        None,
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "buy milk");
    assert_eq!(fetched["description"], "2 liters");
    assert_eq!(fetched["completed"], false);
    assert_eq!(fetched["user_id"].as_str().unwrap(), user_id);

    let (status, bytes) = send(json_request(
        "DELETE",
        &format!("/todos/{todo_id}"),
        Some(&token),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(bytes.is_empty());

    let (status, _) = send(json_request(
        "GET",
        &format!("/todos/{todo_id}"),
        Some(&token),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_create_todo_validation_bounds() {
    let _pool = setup_test_db().await;

    let (token, _) = signup("alice@example.com", "password1").await;

    let (status, json) = send_json(json_request(
        "POST",
        "/todos",
        Some(&token),
        Some(json!({ "title": "" })),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["detail"].as_str().unwrap().starts_with("Invalid data"));

    let (status, _) = send(json_request(
        "POST",
        "/todos",
        Some(&token),
        Some(json!({ "title": "x".repeat(256) })),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_todos_require_auth() {
    let _pool = setup_test_db().await;

    let (status, json) = send_json(json_request("GET", "/todos", None, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["detail"], "Unauthorized");

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_chat_creates_conversation_and_attaches_thread() {
    let pool = setup_test_db().await;

    let (token, _) = signup("alice@example.com", "password1").await;

    let (status, reply) = send_json(json_request(
        "POST",
        "/chat/message",
        Some(&token),
        Some(json!({ "message": "add a todo for groceries" })),
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["role"], "assistant");
    assert_eq!(reply["content"], STUB_REPLY);

    let conversation_id = Uuid::parse_str(reply["conversation_id"].as_str().unwrap()).unwrap();

    // The thread reference is persisted after the first successful reply.
    let (thread_id,): (Option<String>,) =
        sqlx::query_as("SELECT thread_id FROM conversations WHERE id = ?")
            .bind(conversation_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    let thread_id = thread_id.unwrap();
    assert!(thread_id.starts_with("thread_"));

    // History replays in order: the user turn then the assistant turn.
    let (status, history) = send_json(json_request(
        "GET",
        &format!("/chat/message/{conversation_id}"),
        Some(&token),
        None,
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    let messages = history.as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "add a todo for groceries");
    assert_eq!(messages[1]["role"], "assistant");

    // A second turn reuses the conversation and keeps the thread reference.
    let (status, second) = send_json(json_request(
        "POST",
        "/chat/message",
        Some(&token),
        Some(json!({ "message": "thanks", "conversation_id": conversation_id })),
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["conversation_id"].as_str().unwrap(), conversation_id.to_string());

    let (same_thread,): (Option<String>,) =
        sqlx::query_as("SELECT thread_id FROM conversations WHERE id = ?")
            .bind(conversation_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(same_thread.unwrap(), thread_id);

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_chat_ownership_uses_403_not_404() {
    let _pool = setup_test_db().await;

    let (alice_token, _) = signup("alice@example.com", "password1").await;
    let (bob_token, _) = signup("bob@example.com", "password2").await;

    let (_, reply) = send_json(json_request(
        "POST",
        "/chat/message",
        Some(&alice_token),
        Some(json!({ "message": "hello" })),
    ))
    .await;
    let conversation_id = reply["conversation_id"].as_str().unwrap().to_owned();

    // Unlike the todo surface, a foreign conversation is a 403.
    let (status, json) = send_json(json_request(
        "POST",
        "/chat/message",
        Some(&bob_token),
        Some(json!({ "message": "hijack", "conversation_id": conversation_id })),
    ))
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        json["detail"],
        "You do not have permission to access this conversation."
    );

    let (status, _) = send_json(json_request(
        "GET",
        &format!("/chat/message/{conversation_id}"),
        Some(&bob_token),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A conversation that does not exist at all is a 404.
    let missing = Uuid::new_v4();
    let (status, json) = send_json(json_request(
        "POST",
        "/chat/message",
        Some(&bob_token),
        Some(json!({ "message": "hello", "conversation_id": missing })),
    ))
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        json["detail"],
        format!("Conversation with ID {missing} not found.")
    );

    cleanup_test_db();
}
