//! Stdio entry point for the todo tool-protocol server.

use todo_assistant_api::config::AppConfig;
use todo_assistant_api::core::services::MyTodoService;
use todo_assistant_api::core::traits::TodoService;
use todo_assistant_api::infrastructure::database::DatabaseConnection;
use todo_assistant_api::infrastructure::repositories::DbTodoRepository;
use todo_assistant_api::mcp::server::{McpServer, SERVER_NAME, serve_stdio};

use di::{Injectable, ServiceCollection};
use log::info;
use tokio::runtime::{Builder, Runtime};

fn main() -> anyhow::Result<()> {
    // stdout carries protocol frames, so all logging goes to stderr
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let runtime: Runtime = Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(run())
}

async fn run() -> anyhow::Result<()> {
    let provider = ServiceCollection::new()
        .add(AppConfig::singleton())
        .add(DatabaseConnection::singleton())
        .add(DbTodoRepository::singleton())
        .add(MyTodoService::singleton())
        .build_provider()
        .expect("failed to build service provider");

    let connection = provider.get_required::<DatabaseConnection>();
    sqlx::migrate!().run(&**connection).await?;

    info!("Starting MCP server '{SERVER_NAME}'");
    info!("Registered tools: add_task, list_tasks, update_task, complete_task, delete_task");

    let todos = provider.get_required::<dyn TodoService>();
    let mut server = McpServer::new(todos);
    serve_stdio(&mut server).await
}
