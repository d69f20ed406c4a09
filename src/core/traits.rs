//! DI "Interfaces"

use crate::core::assistant::{AgentReply, ChatMessage, Tool};
use crate::core::error::ServiceError;
use crate::core::security::{AuthSession, CurrentUser};
use crate::infrastructure::entities;
use crate::infrastructure::entities::MessageRole;
use async_trait::async_trait;
use uuid::Uuid;

/// Issues and verifies bearer credentials.
pub trait TokenAuthenticator: Send + Sync {
    /// Signs a token carrying the user id as subject plus the configured TTL.
    fn issue(&self, user_id: &str, email: &str) -> Result<String, ServiceError>;

    /// Resolves a bearer token to a caller identity.
    ///
    /// Every failure mode (bad signature, expired, malformed claims) collapses
    /// to `ServiceError::Unauthenticated`.
    fn authenticate(&self, token: &str) -> Result<CurrentUser, ServiceError>;
}

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Registers a new account. Fails with `Invalid` when the email is taken.
    async fn signup(&self, email: &str, password: &str) -> Result<AuthSession, ServiceError>;

    /// Verifies credentials. Unknown email and wrong password both fail with
    /// `Unauthenticated` so accounts cannot be enumerated.
    async fn signin(&self, email: &str, password: &str) -> Result<AuthSession, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct NewTodo {
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
}

/// Partial update: `None` means "leave unchanged". The nested option on
/// `description` distinguishes an omitted field from an explicit null.
#[derive(Debug, Clone, Default)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct TodoReplacement {
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
}

/// Ownership-enforced task store.
///
/// Every operation except `create_todo` resolves its target through a
/// combined `(id, owner)` filter; a miss is `NotFound` whether the task is
/// absent or owned by someone else.
#[async_trait]
pub trait TodoService: Send + Sync {
    async fn create_todo(&self, user_id: &str, todo: NewTodo)
    -> Result<entities::Todo, ServiceError>;

    async fn get_todo(&self, todo_id: i64, user_id: &str) -> Result<entities::Todo, ServiceError>;

    async fn list_todos(
        &self,
        user_id: &str,
        completed: Option<bool>,
    ) -> Result<Vec<entities::Todo>, ServiceError>;

    /// PATCH semantics: only supplied fields change, `updated_at` refreshes.
    async fn update_todo(
        &self,
        todo_id: i64,
        user_id: &str,
        patch: TodoPatch,
    ) -> Result<entities::Todo, ServiceError>;

    /// PUT semantics: all mutable fields are overwritten unconditionally.
    async fn replace_todo(
        &self,
        todo_id: i64,
        user_id: &str,
        replacement: TodoReplacement,
    ) -> Result<entities::Todo, ServiceError>;

    async fn delete_todo(&self, todo_id: i64, user_id: &str) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait ChatService: Send + Sync {
    async fn create_conversation(
        &self,
        user_id: &str,
    ) -> Result<entities::Conversation, ServiceError>;

    /// Resolves a conversation for its owner.
    ///
    /// Unlike the task store this surface distinguishes `NotFound` from
    /// `Forbidden`; the HTTP layer maps them to 404 and 403 respectively.
    async fn find_owned_conversation(
        &self,
        user_id: &str,
        conversation_id: Uuid,
    ) -> Result<entities::Conversation, ServiceError>;

    async fn create_message(
        &self,
        conversation_id: Uuid,
        role: MessageRole,
        content: String,
    ) -> Result<entities::Message, ServiceError>;

    async fn list_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<entities::Message>, ServiceError>;

    async fn attach_thread(
        &self,
        conversation_id: Uuid,
        thread_id: &str,
    ) -> Result<(), ServiceError>;
}

/// The external LLM runtime, reduced to the one call the orchestrator needs.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[Tool],
    ) -> Result<AgentReply, ServiceError>;
}
