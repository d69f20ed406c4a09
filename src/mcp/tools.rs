//! Tool definitions and dispatch for the tool-protocol server.

use crate::core::traits::{NewTodo, TodoPatch, TodoService};
use crate::mcp::schemas::{
    AddTaskInput, CompleteTaskInput, DeleteTaskInput, DeleteTaskOutput, ErrorCode, ListTasksInput,
    TaskListOutput, TaskOutput, UpdateTaskInput, error_response, map_service_error,
    validate_user_id,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

/// Advertised tool list for `tools/list`.
pub fn tool_definitions() -> Value {
    json!([
        {
            "name": "add_task",
            "description": "Create a new task for a user. Requires user_id, title, and optional description.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "minLength": 1, "description": "User ID who owns the task"},
                    "title": {"type": "string", "minLength": 1, "maxLength": 255, "description": "Task title"},
                    "description": {"type": "string", "maxLength": 1000, "description": "Optional task description"}
                },
                "required": ["user_id", "title"]
            }
        },
        {
            "name": "list_tasks",
            "description": "Retrieve all tasks for a specific user. Returns array of tasks with metadata.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "minLength": 1, "description": "User ID to filter tasks"}
                },
                "required": ["user_id"]
            }
        },
        {
            "name": "update_task",
            "description": "Update task properties (title, description, completed status). Validates ownership.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "minLength": 1, "description": "User ID making the update"},
                    "task_id": {"type": "integer", "minimum": 1, "description": "Task ID to update"},
                    "title": {"type": "string", "minLength": 1, "maxLength": 255, "description": "New task title"},
                    "description": {"type": "string", "maxLength": 1000, "description": "New task description"},
                    "completed": {"type": "boolean", "description": "New completion status"}
                },
                "required": ["user_id", "task_id"]
            }
        },
        {
            "name": "complete_task",
            "description": "Toggle task completion status. Validates ownership before updating.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "minLength": 1, "description": "User ID making the update"},
                    "task_id": {"type": "integer", "minimum": 1, "description": "Task ID to toggle"}
                },
                "required": ["user_id", "task_id"]
            }
        },
        {
            "name": "delete_task",
            "description": "Permanently delete a task. Validates ownership before deletion.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "minLength": 1, "description": "User ID making the deletion"},
                    "task_id": {"type": "integer", "minimum": 1, "description": "Task ID to delete"}
                },
                "required": ["user_id", "task_id"]
            }
        }
    ])
}

fn parse_input<T: DeserializeOwned>(args: Value) -> Result<T, Value> {
    serde_json::from_value(args)
        .map_err(|e| error_response(ErrorCode::Validation, format!("Invalid tool input: {e}")))
}

/// Routes one tool call. Returns `None` for an unknown tool name; every other
/// outcome (including failures) is a payload for the caller.
pub async fn dispatch_tool(todos: &dyn TodoService, name: &str, args: Value) -> Option<Value> {
    let payload = match name {
        "add_task" => add_task(todos, args).await,
        "list_tasks" => list_tasks(todos, args).await,
        "update_task" => update_task(todos, args).await,
        "complete_task" => complete_task(todos, args).await,
        "delete_task" => delete_task(todos, args).await,
        _ => return None,
    };

    Some(payload.unwrap_or_else(|error| error))
}

async fn add_task(todos: &dyn TodoService, args: Value) -> Result<Value, Value> {
    let input: AddTaskInput = parse_input(args)?;
    let user_id = validate_user_id(&input.user_id)?;
    input.validate()?;

    let todo = todos
        .create_todo(
            user_id,
            NewTodo {
                title: input.title,
                description: input.description,
                completed: false,
            },
        )
        .await
        .map_err(|e| map_service_error(&e))?;

    Ok(serde_json::to_value(TaskOutput::from(todo)).expect("task output serializes"))
}

async fn list_tasks(todos: &dyn TodoService, args: Value) -> Result<Value, Value> {
    let input: ListTasksInput = parse_input(args)?;
    let user_id = validate_user_id(&input.user_id)?;

    let tasks: Vec<TaskOutput> = todos
        .list_todos(user_id, None)
        .await
        .map_err(|e| map_service_error(&e))?
        .into_iter()
        .map(TaskOutput::from)
        .collect();

    let output = TaskListOutput {
        count: tasks.len(),
        tasks,
    };
    Ok(serde_json::to_value(output).expect("task list serializes"))
}

async fn update_task(todos: &dyn TodoService, args: Value) -> Result<Value, Value> {
    let input: UpdateTaskInput = parse_input(args)?;
    let user_id = validate_user_id(&input.user_id)?;
    input.validate()?;

    let patch = TodoPatch {
        title: input.title,
        description: input.description.map(Some),
        completed: input.completed,
    };

    let todo = todos
        .update_todo(input.task_id, user_id, patch)
        .await
        .map_err(|e| map_service_error(&e))?;

    Ok(serde_json::to_value(TaskOutput::from(todo)).expect("task output serializes"))
}

async fn complete_task(todos: &dyn TodoService, args: Value) -> Result<Value, Value> {
    let input: CompleteTaskInput = parse_input(args)?;
    let user_id = validate_user_id(&input.user_id)?;
    input.validate()?;

    // Read first so the status can be toggled rather than set.
    let current = todos
        .get_todo(input.task_id, user_id)
        .await
        .map_err(|e| map_service_error(&e))?;

    let patch = TodoPatch {
        completed: Some(!current.completed),
        ..TodoPatch::default()
    };

    let todo = todos
        .update_todo(input.task_id, user_id, patch)
        .await
        .map_err(|e| map_service_error(&e))?;

    Ok(serde_json::to_value(TaskOutput::from(todo)).expect("task output serializes"))
}

async fn delete_task(todos: &dyn TodoService, args: Value) -> Result<Value, Value> {
    let input: DeleteTaskInput = parse_input(args)?;
    let user_id = validate_user_id(&input.user_id)?;
    input.validate()?;

    todos
        .delete_todo(input.task_id, user_id)
        .await
        .map_err(|e| map_service_error(&e))?;

    let output = DeleteTaskOutput {
        success: true,
        message: format!("Task {} deleted successfully", input.task_id),
    };
    Ok(serde_json::to_value(output).expect("delete output serializes"))
}
