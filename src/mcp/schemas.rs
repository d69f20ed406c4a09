//! Tool input/output schemas and the structured error format.

use crate::core::error::ServiceError;
use crate::infrastructure::entities;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const TITLE_MAX_LEN: usize = 255;
pub const DESCRIPTION_MAX_LEN: usize = 1000;

/// Fixed error categories returned to the tool caller as structured data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Validation,
    Auth,
    PermissionDenied,
    NotFound,
    Server,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Validation => "VALIDATION_ERROR",
            ErrorCode::Auth => "AUTH_ERROR",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Server => "SERVER_ERROR",
        }
    }
}

pub fn error_response(code: ErrorCode, message: impl Into<String>) -> Value {
    json!({ "error": { "code": code.as_str(), "message": message.into() } })
}

pub fn error_response_with_details(
    code: ErrorCode,
    message: impl Into<String>,
    details: Value,
) -> Value {
    json!({
        "error": { "code": code.as_str(), "message": message.into(), "details": details }
    })
}

/// Maps service failures to the protocol's error categories. Unexpected
/// errors stay generic so internals never cross the boundary.
pub fn map_service_error(err: &ServiceError) -> Value {
    match err {
        ServiceError::Invalid(message) => error_response(ErrorCode::Validation, message.clone()),
        ServiceError::Unauthenticated => error_response(ErrorCode::Auth, "Authentication failed"),
        ServiceError::NotFound => error_response(ErrorCode::NotFound, "Task not found"),
        ServiceError::Forbidden => error_response(ErrorCode::PermissionDenied, "Access denied"),
        ServiceError::Server(_) => error_response(ErrorCode::Server, "Internal server error"),
    }
}

/// This boundary trusts the caller-supplied identity; the only check is that
/// it is a non-empty string after trimming.
pub fn validate_user_id(user_id: &str) -> Result<&str, Value> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(error_response(
            ErrorCode::Auth,
            format!("Invalid user ID format: {user_id}"),
        ));
    }
    Ok(trimmed)
}

fn validate_title(title: &str) -> Result<(), Value> {
    if title.is_empty() || title.chars().count() > TITLE_MAX_LEN {
        return Err(error_response(
            ErrorCode::Validation,
            "title must be between 1 and 255 characters",
        ));
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> Result<(), Value> {
    if let Some(description) = description {
        if description.chars().count() > DESCRIPTION_MAX_LEN {
            return Err(error_response(
                ErrorCode::Validation,
                "description must be at most 1000 characters",
            ));
        }
    }
    Ok(())
}

fn validate_task_id(task_id: i64) -> Result<(), Value> {
    if task_id < 1 {
        return Err(error_response(
            ErrorCode::Validation,
            "task_id must be a positive integer",
        ));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddTaskInput {
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl AddTaskInput {
    pub fn validate(&self) -> Result<(), Value> {
        validate_title(&self.title)?;
        validate_description(self.description.as_deref())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListTasksInput {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateTaskInput {
    pub user_id: String,
    pub task_id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
}

impl UpdateTaskInput {
    pub fn validate(&self) -> Result<(), Value> {
        validate_task_id(self.task_id)?;
        if let Some(title) = self.title.as_deref() {
            validate_title(title)?;
        }
        validate_description(self.description.as_deref())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompleteTaskInput {
    pub user_id: String,
    pub task_id: i64,
}

impl CompleteTaskInput {
    pub fn validate(&self) -> Result<(), Value> {
        validate_task_id(self.task_id)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteTaskInput {
    pub user_id: String,
    pub task_id: i64,
}

impl DeleteTaskInput {
    pub fn validate(&self) -> Result<(), Value> {
        validate_task_id(self.task_id)
    }
}

#[derive(Debug, Serialize)]
pub struct TaskOutput {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<entities::Todo> for TaskOutput {
    fn from(todo: entities::Todo) -> Self {
        TaskOutput {
            id: todo.id,
            title: todo.title,
            description: todo.description,
            completed: todo.completed,
            user_id: todo.user_id,
            created_at: todo.created_at,
            updated_at: todo.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskListOutput {
    pub tasks: Vec<TaskOutput>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct DeleteTaskOutput {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_shape() {
        let payload = error_response(ErrorCode::NotFound, "Task not found");
        assert_eq!(payload["error"]["code"], "NOT_FOUND");
        assert_eq!(payload["error"]["message"], "Task not found");
        assert!(payload["error"].get("details").is_none());
    }

    #[test]
    fn test_user_id_must_survive_trimming() {
        assert!(validate_user_id("  alice  ").is_ok());
        let err = validate_user_id("   ").unwrap_err();
        assert_eq!(err["error"]["code"], "AUTH_ERROR");
    }

    #[test]
    fn test_add_task_input_rejects_unknown_fields() {
        let raw = serde_json::json!({
            "user_id": "alice",
            "title": "write report",
            "owner": "bob"
        });
        assert!(serde_json::from_value::<AddTaskInput>(raw).is_err());
    }

    #[test]
    fn test_add_task_input_bounds() {
        let input = AddTaskInput {
            user_id: "alice".to_owned(),
            title: "x".repeat(256),
            description: None,
        };
        let err = input.validate().unwrap_err();
        assert_eq!(err["error"]["code"], "VALIDATION_ERROR");
    }
}
