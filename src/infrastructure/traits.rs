//! Infrastructure traits, used for DI on higher levels

use crate::infrastructure::entities;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<entities::User>, sqlx::Error>;

    async fn create_user(&self, user: entities::User) -> Result<entities::User, sqlx::Error>;
}

/// Every lookup and mutation filters on `(id AND user_id)` in one query.
/// Fetching by id alone and checking ownership afterwards is exactly the
/// ordering this interface exists to rule out.
#[async_trait]
pub trait TodoRepository: Send + Sync {
    async fn create_todo(&self, todo: entities::Todo) -> Result<entities::Todo, sqlx::Error>;

    async fn find_todo(
        &self,
        todo_id: i64,
        user_id: &str,
    ) -> Result<Option<entities::Todo>, sqlx::Error>;

    async fn list_todos(
        &self,
        user_id: &str,
        completed: Option<bool>,
    ) -> Result<Vec<entities::Todo>, sqlx::Error>;

    async fn update_todo(&self, todo: entities::Todo)
    -> Result<Option<entities::Todo>, sqlx::Error>;

    /// Returns `true` when a row was deleted.
    async fn delete_todo(&self, todo_id: i64, user_id: &str) -> Result<bool, sqlx::Error>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn create_conversation(
        &self,
        conversation: entities::Conversation,
    ) -> Result<entities::Conversation, sqlx::Error>;

    async fn find_conversation(
        &self,
        conversation_id: Uuid,
    ) -> Result<Option<entities::Conversation>, sqlx::Error>;

    async fn set_thread_id(
        &self,
        conversation_id: Uuid,
        thread_id: &str,
    ) -> Result<(), sqlx::Error>;

    async fn create_message(
        &self,
        message: entities::Message,
    ) -> Result<entities::Message, sqlx::Error>;

    async fn list_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<entities::Message>, sqlx::Error>;
}
