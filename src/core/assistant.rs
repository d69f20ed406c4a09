//! LLM assistant orchestrator.
//!
//! Wraps the external agent runtime and exposes the task operations to it as
//! a static tool registry. Every tool handler is bound to the authenticated
//! caller's id, so the model cannot reach outside the caller's own tasks no
//! matter what it is prompted to do.

use crate::core::traits::{AgentRuntime, NewTodo, TodoPatch, TodoService};
use crate::infrastructure::entities;
use di::{Ref, injectable};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

const SYSTEM_INSTRUCTIONS: &str = "You are a helpful AI assistant for a todo application. \
    Your primary goal is to help users manage their tasks: create, read, update, and delete \
    todo items. Be concise and always ask for clarification if a request is ambiguous. \
    You have access to tools to manage todos.";

const FALLBACK_REPLY: &str = "I apologize, but I couldn't generate a response.";

/// Upper bound on chat-completion/tool-dispatch rounds per turn.
const MAX_TOOL_ROUNDS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// One entry of the transcript handed to the agent runtime.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        ChatMessage {
            role: Role::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool(tool_call_id: String, content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id),
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        ChatMessage {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

impl From<entities::Message> for ChatMessage {
    fn from(m: entities::Message) -> Self {
        let role = match m.role {
            entities::MessageRole::System => Role::System,
            entities::MessageRole::User => Role::User,
            entities::MessageRole::Assistant => Role::Assistant,
            entities::MessageRole::Tool => Role::Tool,
        };
        Self::plain(role, m.content)
    }
}

/// A function invocation requested by the model.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// One completion from the runtime: either text, tool calls, or both.
#[derive(Debug, Clone, Default)]
pub struct AgentReply {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

/// Wire format of a tool definition (OpenAI function-calling shape).
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    #[serde(rename = "type")]
    pub tool_type: &'static str,
    pub function: FunctionTool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionTool {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// Static registry of the capabilities exposed to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    CreateTodo,
    ListTodos,
    GetTodo,
    UpdateTodo,
    DeleteTodo,
}

impl ToolName {
    pub fn from_name(name: &str) -> Option<ToolName> {
        match name {
            "create_todo" => Some(ToolName::CreateTodo),
            "list_todos" => Some(ToolName::ListTodos),
            "get_todo" => Some(ToolName::GetTodo),
            "update_todo" => Some(ToolName::UpdateTodo),
            "delete_todo" => Some(ToolName::DeleteTodo),
            _ => None,
        }
    }

    pub fn definitions() -> Vec<Tool> {
        vec![
            function_tool(
                "create_todo",
                "Creates a new todo item for the current user.",
                json!({
                    "type": "object",
                    "properties": {
                        "title": {"type": "string", "description": "The title of the todo item."},
                        "description": {"type": "string", "description": "An optional description for the todo item."},
                        "completed": {"type": "boolean", "description": "Whether the todo item is completed (defaults to false)."}
                    },
                    "required": ["title"]
                }),
            ),
            function_tool(
                "list_todos",
                "Retrieves todo items for the current user, optionally filtered by completion status.",
                json!({
                    "type": "object",
                    "properties": {
                        "completed": {"type": "boolean", "description": "Filter by completion status; omit for all todos."}
                    }
                }),
            ),
            function_tool(
                "get_todo",
                "Retrieves details of a specific todo item by its ID for the current user.",
                json!({
                    "type": "object",
                    "properties": {
                        "todo_id": {"type": "integer", "description": "The ID of the todo item."}
                    },
                    "required": ["todo_id"]
                }),
            ),
            function_tool(
                "update_todo",
                "Updates an existing todo item for the current user.",
                json!({
                    "type": "object",
                    "properties": {
                        "todo_id": {"type": "integer", "description": "The ID of the todo item to update."},
                        "title": {"type": "string", "description": "New title for the todo item."},
                        "description": {"type": "string", "description": "New description for the todo item."},
                        "completed": {"type": "boolean", "description": "New completion status for the todo item."}
                    },
                    "required": ["todo_id"]
                }),
            ),
            function_tool(
                "delete_todo",
                "Deletes a specific todo item by its ID for the current user.",
                json!({
                    "type": "object",
                    "properties": {
                        "todo_id": {"type": "integer", "description": "The ID of the todo item to delete."}
                    },
                    "required": ["todo_id"]
                }),
            ),
        ]
    }
}

fn function_tool(name: &'static str, description: &'static str, parameters: Value) -> Tool {
    Tool {
        tool_type: "function",
        function: FunctionTool {
            name,
            description,
            parameters,
        },
    }
}

#[derive(Deserialize)]
struct CreateTodoArgs {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    completed: bool,
}

#[derive(Deserialize)]
struct ListTodosArgs {
    #[serde(default)]
    completed: Option<bool>,
}

#[derive(Deserialize)]
struct TodoIdArgs {
    todo_id: i64,
}

#[derive(Deserialize)]
struct UpdateTodoArgs {
    todo_id: i64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    completed: Option<bool>,
}

#[injectable]
pub struct Assistant {
    todos: Ref<dyn TodoService>,
    runtime: Ref<dyn AgentRuntime>,
}

impl Assistant {
    /// Runs one conversation turn for `user_id` against the agent runtime.
    ///
    /// `history` is the stored transcript including the just-persisted user
    /// message. Returns the assistant reply plus the thread reference, which
    /// is minted here on the first turn of a conversation. Failures degrade
    /// to an error-text reply so a broken runtime never aborts the turn.
    pub async fn process_message(
        &self,
        user_id: &str,
        history: Vec<ChatMessage>,
        thread_id: Option<String>,
    ) -> (String, String) {
        let thread_id = thread_id
            .unwrap_or_else(|| format!("thread_{}", &Uuid::new_v4().simple().to_string()[..16]));

        let tools = ToolName::definitions();
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(SYSTEM_INSTRUCTIONS));
        messages.extend(history);

        for _ in 0..MAX_TOOL_ROUNDS {
            let reply = match self.runtime.chat(&messages, &tools).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!("agent runtime call failed: {e}");
                    return (format!("Error processing message: {e}"), thread_id);
                }
            };

            if reply.tool_calls.is_empty() {
                let content = reply
                    .content
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| FALLBACK_REPLY.to_owned());
                return (content, thread_id);
            }

            messages.push(ChatMessage::assistant(
                reply.content.clone(),
                reply.tool_calls.clone(),
            ));

            for call in &reply.tool_calls {
                debug!("dispatching tool '{}' for user {user_id}", call.name);
                let result = self.dispatch_tool(user_id, call).await;
                messages.push(ChatMessage::tool(call.id.clone(), result));
            }
        }

        (FALLBACK_REPLY.to_owned(), thread_id)
    }

    /// Executes one model-requested tool call, bound to the caller's id.
    ///
    /// Failures are rendered as strings for the model instead of propagating,
    /// so a single bad call does not abort the conversation turn.
    async fn dispatch_tool(&self, user_id: &str, call: &ToolCall) -> String {
        let Some(tool) = ToolName::from_name(&call.name) else {
            return format!("Error: unknown tool '{}'", call.name);
        };

        let raw_args = if call.arguments.trim().is_empty() {
            "{}"
        } else {
            call.arguments.as_str()
        };

        match tool {
            ToolName::CreateTodo => match serde_json::from_str::<CreateTodoArgs>(raw_args) {
                Ok(args) => {
                    let new_todo = NewTodo {
                        title: args.title,
                        description: args.description,
                        completed: args.completed,
                    };
                    match self.todos.create_todo(user_id, new_todo).await {
                        Ok(todo) => format!("Created todo: {}", todo_json(&todo)),
                        Err(e) => format!("Error creating todo: {e}"),
                    }
                }
                Err(e) => format!("Error creating todo: {e}"),
            },
            ToolName::ListTodos => match serde_json::from_str::<ListTodosArgs>(raw_args) {
                Ok(args) => match self.todos.list_todos(user_id, args.completed).await {
                    Ok(todos) if todos.is_empty() => "No todos found.".to_owned(),
                    Ok(todos) => {
                        let items: Vec<Value> = todos.iter().map(todo_value).collect();
                        format!("Found {} todos: {}", items.len(), Value::Array(items))
                    }
                    Err(e) => format!("Error retrieving todos: {e}"),
                },
                Err(e) => format!("Error retrieving todos: {e}"),
            },
            ToolName::GetTodo => match serde_json::from_str::<TodoIdArgs>(raw_args) {
                Ok(args) => match self.todos.get_todo(args.todo_id, user_id).await {
                    Ok(todo) => format!("Todo details: {}", todo_json(&todo)),
                    Err(e) => format!("Error retrieving todo: {e}"),
                },
                Err(e) => format!("Error retrieving todo: {e}"),
            },
            ToolName::UpdateTodo => match serde_json::from_str::<UpdateTodoArgs>(raw_args) {
                Ok(args) => {
                    let patch = TodoPatch {
                        title: args.title,
                        description: args.description.map(Some),
                        completed: args.completed,
                    };
                    match self.todos.update_todo(args.todo_id, user_id, patch).await {
                        Ok(todo) => format!("Updated todo: {}", todo_json(&todo)),
                        Err(e) => format!("Error updating todo: {e}"),
                    }
                }
                Err(e) => format!("Error updating todo: {e}"),
            },
            ToolName::DeleteTodo => match serde_json::from_str::<TodoIdArgs>(raw_args) {
                Ok(args) => match self.todos.delete_todo(args.todo_id, user_id).await {
                    Ok(()) => format!("Successfully deleted todo with ID {}", args.todo_id),
                    Err(e) => format!("Error deleting todo: {e}"),
                },
                Err(e) => format!("Error deleting todo: {e}"),
            },
        }
    }
}

fn todo_value(todo: &entities::Todo) -> Value {
    json!({
        "id": todo.id,
        "title": todo.title,
        "description": todo.description,
        "completed": todo.completed,
        "user_id": todo.user_id,
        "created_at": todo.created_at,
        "updated_at": todo.updated_at,
    })
}

fn todo_json(todo: &entities::Todo) -> String {
    todo_value(todo).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_chat_message_from_user_entity() {
        let user_message = entities::Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            role: entities::MessageRole::User,
            content: "Hello".to_string(),
            timestamp: Utc::now(),
        };

        let chat_message: ChatMessage = user_message.into();
        assert!(matches!(chat_message.role, Role::User));
        assert_eq!(chat_message.content.as_deref(), Some("Hello"));
    }

    #[test]
    fn test_chat_message_from_assistant_entity() {
        let assistant_message = entities::Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            role: entities::MessageRole::Assistant,
            content: "Hi there!".to_string(),
            timestamp: Utc::now(),
        };

        let chat_message: ChatMessage = assistant_message.into();
        assert!(matches!(chat_message.role, Role::Assistant));
        assert_eq!(chat_message.content.as_deref(), Some("Hi there!"));
    }

    #[test]
    fn test_tool_registry_covers_all_five_operations() {
        let definitions = ToolName::definitions();
        assert_eq!(definitions.len(), 5);

        for tool in &definitions {
            assert!(ToolName::from_name(tool.function.name).is_some());
        }

        assert!(ToolName::from_name("drop_table").is_none());
    }

    #[test]
    fn test_tool_definitions_serialize_with_function_shape() {
        let serialized = serde_json::to_value(ToolName::definitions()).unwrap();
        let first = &serialized.as_array().unwrap()[0];

        assert_eq!(first["type"], "function");
        assert_eq!(first["function"]["name"], "create_todo");
        assert_eq!(first["function"]["parameters"]["type"], "object");
    }
}
