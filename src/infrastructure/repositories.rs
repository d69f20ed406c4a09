//! DB Repository abstractions

use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::entities::{Conversation, Message, Todo, User};
use crate::infrastructure::traits::{ConversationRepository, TodoRepository, UserRepository};
use async_trait::async_trait;
use di::{Ref, injectable};
use uuid::Uuid;

#[injectable(UserRepository)]
pub struct DbUserRepository {
    connection: Ref<DatabaseConnection>,
}

#[async_trait]
impl UserRepository for DbUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&**self.connection)
            .await
    }

    async fn create_user(&self, user: User) -> Result<User, sqlx::Error> {
        sqlx::query_as(
            "INSERT INTO users (id, email, password_hash, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(user.id)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&**self.connection)
        .await
    }
}

#[injectable(TodoRepository)]
pub struct DbTodoRepository {
    connection: Ref<DatabaseConnection>,
}

#[async_trait]
impl TodoRepository for DbTodoRepository {
    async fn create_todo(&self, todo: Todo) -> Result<Todo, sqlx::Error> {
        sqlx::query_as(
            "INSERT INTO todos (user_id, title, description, completed, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(todo.user_id)
        .bind(todo.title)
        .bind(todo.description)
        .bind(todo.completed)
        .bind(todo.created_at)
        .bind(todo.updated_at)
        .fetch_one(&**self.connection)
        .await
    }

    async fn find_todo(&self, todo_id: i64, user_id: &str) -> Result<Option<Todo>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM todos WHERE id = ? AND user_id = ?")
            .bind(todo_id)
            .bind(user_id)
            .fetch_optional(&**self.connection)
            .await
    }

    async fn list_todos(
        &self,
        user_id: &str,
        completed: Option<bool>,
    ) -> Result<Vec<Todo>, sqlx::Error> {
        match completed {
            Some(completed) => {
                sqlx::query_as(
                    "SELECT * FROM todos WHERE user_id = ? AND completed = ? ORDER BY id ASC",
                )
                .bind(user_id)
                .bind(completed)
                .fetch_all(&**self.connection)
                .await
            }
            None => {
                sqlx::query_as("SELECT * FROM todos WHERE user_id = ? ORDER BY id ASC")
                    .bind(user_id)
                    .fetch_all(&**self.connection)
                    .await
            }
        }
    }

    async fn update_todo(&self, todo: Todo) -> Result<Option<Todo>, sqlx::Error> {
        sqlx::query_as(
            "UPDATE todos SET title = ?, description = ?, completed = ?, updated_at = ? \
             WHERE id = ? AND user_id = ? RETURNING *",
        )
        .bind(todo.title)
        .bind(todo.description)
        .bind(todo.completed)
        .bind(todo.updated_at)
        .bind(todo.id)
        .bind(todo.user_id)
        .fetch_optional(&**self.connection)
        .await
    }

    async fn delete_todo(&self, todo_id: i64, user_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ? AND user_id = ?")
            .bind(todo_id)
            .bind(user_id)
            .execute(&**self.connection)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[injectable(ConversationRepository)]
pub struct DbConversationRepository {
    connection: Ref<DatabaseConnection>,
}

#[async_trait]
impl ConversationRepository for DbConversationRepository {
    async fn create_conversation(
        &self,
        conversation: Conversation,
    ) -> Result<Conversation, sqlx::Error> {
        sqlx::query_as(
            "INSERT INTO conversations (id, user_id, thread_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(conversation.id)
        .bind(conversation.user_id)
        .bind(conversation.thread_id)
        .bind(conversation.created_at)
        .bind(conversation.updated_at)
        .fetch_one(&**self.connection)
        .await
    }

    async fn find_conversation(
        &self,
        conversation_id: Uuid,
    ) -> Result<Option<Conversation>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM conversations WHERE id = ?")
            .bind(conversation_id)
            .fetch_optional(&**self.connection)
            .await
    }

    async fn set_thread_id(
        &self,
        conversation_id: Uuid,
        thread_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE conversations SET thread_id = ?, updated_at = ? WHERE id = ?")
            .bind(thread_id)
            .bind(chrono::Utc::now())
            .bind(conversation_id)
            .execute(&**self.connection)
            .await?;

        Ok(())
    }

    async fn create_message(&self, message: Message) -> Result<Message, sqlx::Error> {
        sqlx::query_as(
            "INSERT INTO messages (id, conversation_id, role, content, timestamp) \
             VALUES (?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.role)
        .bind(message.content)
        .bind(message.timestamp)
        .fetch_one(&**self.connection)
        .await
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM messages WHERE conversation_id = ? ORDER BY datetime(timestamp) ASC",
        )
        .bind(conversation_id)
        .fetch_all(&**self.connection)
        .await
    }
}
