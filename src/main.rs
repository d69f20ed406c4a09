//! Todo API server with JWT auth and a conversational assistant.

use todo_assistant_api::api;
use todo_assistant_api::config::AppConfig;
use todo_assistant_api::core::assistant::Assistant;
use todo_assistant_api::core::security::JwtAuthenticator;
use todo_assistant_api::core::services::{MyAuthService, MyChatService, MyTodoService};
use todo_assistant_api::infrastructure::agent::OpenAiAgentRuntime;
use todo_assistant_api::infrastructure::database::DatabaseConnection;
use todo_assistant_api::infrastructure::repositories::{
    DbConversationRepository, DbTodoRepository, DbUserRepository,
};

use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::{Json, Router};
use di::{Injectable, ServiceCollection};
use di_axum::RouterServiceProviderExtensions;
use log::info;
use serde_json::{Value, json};
use tokio::runtime::{Builder, Runtime};
use tower_http::cors::{Any, CorsLayer};

fn main() -> anyhow::Result<()> {
    // initialize tracing
    tracing_subscriber::fmt::init();

    let runtime: Runtime = Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(web_server_task())
}

async fn web_server_task() -> anyhow::Result<()> {
    let provider = ServiceCollection::new()
        .add(AppConfig::singleton())
        .add(DatabaseConnection::singleton())
        .add(DbUserRepository::scoped())
        .add(DbTodoRepository::scoped())
        .add(DbConversationRepository::scoped())
        .add(JwtAuthenticator::singleton())
        .add(MyAuthService::scoped())
        .add(MyTodoService::scoped())
        .add(MyChatService::scoped())
        .add(OpenAiAgentRuntime::singleton())
        .add(Assistant::scoped())
        .build_provider()
        .expect("failed to build service provider");

    let config = provider.get_required::<AppConfig>();

    let connection = provider.get_required::<DatabaseConnection>();
    sqlx::migrate!().run(&**connection).await?;

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/auth", api::auth::router())
        .nest("/todos", api::todos::router())
        .nest("/chat", api::chat::router())
        .layer(
            CorsLayer::new()
                .allow_headers(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                ])
                .allow_origin([
                    "http://localhost:3000".parse::<HeaderValue>().unwrap(),
                    "http://127.0.0.1:3000".parse::<HeaderValue>().unwrap(),
                ]),
        )
        .with_provider(provider);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    info!("Shutting down...");

    Ok(())
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to the Todo API" }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "version": env!("CARGO_PKG_VERSION") }))
}
