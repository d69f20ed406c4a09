//! Todo CRUD endpoints

use crate::api::{ApiError, ExtractUser};
use crate::core::error::ServiceError;
use crate::core::traits::TodoService;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use di_axum::Inject;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_todo).get(list_todos))
        .route(
            "/:id",
            get(get_todo)
                .put(replace_todo)
                .patch(update_todo)
                .delete(delete_todo),
        )
}

/// Ownership misses render as 404 "Unauthorized": whether the todo belongs to
/// someone else or does not exist at all must be indistinguishable.
fn todo_error(err: ServiceError, action: &str) -> ApiError {
    match err {
        ServiceError::NotFound | ServiceError::Forbidden => {
            ApiError::new(StatusCode::NOT_FOUND, "Unauthorized")
        }
        ServiceError::Invalid(detail) => {
            ApiError::new(StatusCode::BAD_REQUEST, format!("Invalid data: {detail}"))
        }
        ServiceError::Unauthenticated => ApiError::unauthorized(),
        ServiceError::Server(_) => ApiError::internal(format!("Failed to {action}")),
    }
}

async fn create_todo(
    Inject(todo_service): Inject<dyn TodoService>,
    ExtractUser(current_user): ExtractUser,
    Json(request): Json<schemas::CreateTodo>,
) -> Result<(StatusCode, Json<schemas::TodoResponse>), ApiError> {
    let todo = todo_service
        .create_todo(&current_user.id, request.into())
        .await
        .map_err(|e| todo_error(e, "create todo"))?;

    Ok((StatusCode::CREATED, Json(todo.into())))
}

async fn list_todos(
    Inject(todo_service): Inject<dyn TodoService>,
    ExtractUser(current_user): ExtractUser,
    Query(query): Query<schemas::ListTodosQuery>,
) -> Result<Json<Vec<schemas::TodoResponse>>, ApiError> {
    let todos = todo_service
        .list_todos(&current_user.id, query.completed)
        .await
        .map_err(|e| todo_error(e, "retrieve todos"))?;

    Ok(Json(
        todos.into_iter().map(schemas::TodoResponse::from).collect(),
    ))
}

async fn get_todo(
    Inject(todo_service): Inject<dyn TodoService>,
    ExtractUser(current_user): ExtractUser,
    Path(todo_id): Path<i64>,
) -> Result<Json<schemas::TodoResponse>, ApiError> {
    let todo = todo_service
        .get_todo(todo_id, &current_user.id)
        .await
        .map_err(|e| todo_error(e, "retrieve todo"))?;

    Ok(Json(todo.into()))
}

async fn replace_todo(
    Inject(todo_service): Inject<dyn TodoService>,
    ExtractUser(current_user): ExtractUser,
    Path(todo_id): Path<i64>,
    Json(request): Json<schemas::ReplaceTodo>,
) -> Result<Json<schemas::TodoResponse>, ApiError> {
    let todo = todo_service
        .replace_todo(todo_id, &current_user.id, request.into())
        .await
        .map_err(|e| todo_error(e, "replace todo"))?;

    Ok(Json(todo.into()))
}

async fn update_todo(
    Inject(todo_service): Inject<dyn TodoService>,
    ExtractUser(current_user): ExtractUser,
    Path(todo_id): Path<i64>,
    Json(request): Json<schemas::UpdateTodo>,
) -> Result<Json<schemas::TodoResponse>, ApiError> {
    let todo = todo_service
        .update_todo(todo_id, &current_user.id, request.into())
        .await
        .map_err(|e| todo_error(e, "update todo"))?;

    Ok(Json(todo.into()))
}

async fn delete_todo(
    Inject(todo_service): Inject<dyn TodoService>,
    ExtractUser(current_user): ExtractUser,
    Path(todo_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    todo_service
        .delete_todo(todo_id, &current_user.id)
        .await
        .map_err(|e| todo_error(e, "delete todo"))?;

    Ok(StatusCode::NO_CONTENT)
}

pub mod schemas {
    use crate::core::traits::{NewTodo, TodoPatch, TodoReplacement};
    use crate::infrastructure::entities;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serialize};

    #[derive(Deserialize, Debug)]
    pub struct CreateTodo {
        pub title: String,
        #[serde(default)]
        pub description: Option<String>,
        #[serde(default)]
        pub completed: bool,
    }

    impl From<CreateTodo> for NewTodo {
        fn from(request: CreateTodo) -> Self {
            NewTodo {
                title: request.title,
                description: request.description,
                completed: request.completed,
            }
        }
    }

    /// PUT body: title is mandatory, an omitted description overwrites to null.
    #[derive(Deserialize, Debug)]
    pub struct ReplaceTodo {
        pub title: String,
        #[serde(default)]
        pub description: Option<String>,
        #[serde(default)]
        pub completed: bool,
    }

    impl From<ReplaceTodo> for TodoReplacement {
        fn from(request: ReplaceTodo) -> Self {
            TodoReplacement {
                title: request.title,
                description: request.description,
                completed: request.completed,
            }
        }
    }

    /// PATCH body: absent fields stay untouched; `description: null` clears it.
    #[derive(Deserialize, Debug, Default)]
    pub struct UpdateTodo {
        #[serde(default)]
        pub title: Option<String>,
        #[serde(default, deserialize_with = "double_option")]
        pub description: Option<Option<String>>,
        #[serde(default)]
        pub completed: Option<bool>,
    }

    fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer).map(Some)
    }

    impl From<UpdateTodo> for TodoPatch {
        fn from(request: UpdateTodo) -> Self {
            TodoPatch {
                title: request.title,
                description: request.description,
                completed: request.completed,
            }
        }
    }

    #[derive(Deserialize, Debug)]
    pub struct ListTodosQuery {
        pub completed: Option<bool>,
    }

    #[derive(Serialize, Debug)]
    pub struct TodoResponse {
        pub id: i64,
        pub user_id: String,
        pub title: String,
        pub description: Option<String>,
        pub completed: bool,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    impl From<entities::Todo> for TodoResponse {
        fn from(todo: entities::Todo) -> Self {
            TodoResponse {
                id: todo.id,
                user_id: todo.user_id,
                title: todo.title,
                description: todo.description,
                completed: todo.completed,
                created_at: todo.created_at,
                updated_at: todo.updated_at,
            }
        }
    }
}
