//! Implementations for the services the app needs.

use crate::core::error::ServiceError;
use crate::core::security::{self, AuthSession, CurrentUser};
use crate::core::traits::{
    AuthService, ChatService, NewTodo, TodoPatch, TodoReplacement, TodoService, TokenAuthenticator,
};
use crate::infrastructure::entities::{Conversation, Message, MessageRole, Todo, User};
use crate::infrastructure::traits::{ConversationRepository, TodoRepository, UserRepository};
use async_trait::async_trait;
use chrono::Utc;
use di::{Ref, injectable};
use log::{debug, info};
use uuid::Uuid;

const TITLE_MAX_LEN: usize = 255;
const DESCRIPTION_MAX_LEN: usize = 1000;

#[injectable(AuthService)]
pub struct MyAuthService {
    users: Ref<dyn UserRepository>,
    tokens: Ref<dyn TokenAuthenticator>,
}

#[async_trait]
impl AuthService for MyAuthService {
    async fn signup(&self, email: &str, password: &str) -> Result<AuthSession, ServiceError> {
        if email.is_empty() || !email.contains('@') {
            return Err(ServiceError::Invalid("Invalid email address".to_owned()));
        }
        if password.is_empty() {
            return Err(ServiceError::Invalid("Password must not be empty".to_owned()));
        }

        if self.users.find_by_email(email).await?.is_some() {
            return Err(ServiceError::Invalid("Email already registered".to_owned()));
        }

        let now = Utc::now();
        let user = self
            .users
            .create_user(User {
                id: Uuid::new_v4(),
                email: email.to_owned(),
                password_hash: security::hash_password(password)?,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!("registered user {}", user.id);
        self.session_for(&user)
    }

    async fn signin(&self, email: &str, password: &str) -> Result<AuthSession, ServiceError> {
        // Unknown email and wrong password must be indistinguishable.
        let Some(user) = self.users.find_by_email(email).await? else {
            return Err(ServiceError::Unauthenticated);
        };

        if !security::verify_password(password, &user.password_hash) {
            return Err(ServiceError::Unauthenticated);
        }

        self.session_for(&user)
    }
}

impl MyAuthService {
    fn session_for(&self, user: &User) -> Result<AuthSession, ServiceError> {
        let user_id = user.id.to_string();
        let access_token = self.tokens.issue(&user_id, &user.email)?;

        Ok(AuthSession {
            access_token,
            user: CurrentUser {
                id: user_id,
                email: Some(user.email.clone()),
            },
        })
    }
}

#[injectable(TodoService)]
pub struct MyTodoService {
    todos: Ref<dyn TodoRepository>,
}

fn validate_user_id(user_id: &str) -> Result<&str, ServiceError> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Invalid(
            "Invalid user ID format: empty string".to_owned(),
        ));
    }
    Ok(trimmed)
}

fn validate_title(title: &str) -> Result<(), ServiceError> {
    if title.is_empty() || title.chars().count() > TITLE_MAX_LEN {
        return Err(ServiceError::Invalid(
            "Title must be between 1 and 255 characters".to_owned(),
        ));
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> Result<(), ServiceError> {
    if let Some(description) = description {
        if description.chars().count() > DESCRIPTION_MAX_LEN {
            return Err(ServiceError::Invalid(
                "Description must be at most 1000 characters".to_owned(),
            ));
        }
    }
    Ok(())
}

#[async_trait]
impl TodoService for MyTodoService {
    async fn create_todo(&self, user_id: &str, todo: NewTodo) -> Result<Todo, ServiceError> {
        let user_id = validate_user_id(user_id)?;
        validate_title(&todo.title)?;
        validate_description(todo.description.as_deref())?;

        let now = Utc::now();
        let created = self
            .todos
            .create_todo(Todo {
                id: 0, // assigned by the store
                user_id: user_id.to_owned(),
                title: todo.title,
                description: todo.description,
                completed: todo.completed,
                created_at: now,
                updated_at: now,
            })
            .await?;

        debug!("created todo {} for user {user_id}", created.id);
        Ok(created)
    }

    async fn get_todo(&self, todo_id: i64, user_id: &str) -> Result<Todo, ServiceError> {
        let user_id = validate_user_id(user_id)?;

        self.todos
            .find_todo(todo_id, user_id)
            .await?
            .ok_or(ServiceError::NotFound)
    }

    async fn list_todos(
        &self,
        user_id: &str,
        completed: Option<bool>,
    ) -> Result<Vec<Todo>, ServiceError> {
        let user_id = validate_user_id(user_id)?;

        Ok(self.todos.list_todos(user_id, completed).await?)
    }

    async fn update_todo(
        &self,
        todo_id: i64,
        user_id: &str,
        patch: TodoPatch,
    ) -> Result<Todo, ServiceError> {
        let user_id = validate_user_id(user_id)?;

        if let Some(title) = patch.title.as_deref() {
            validate_title(title)?;
        }
        if let Some(description) = &patch.description {
            validate_description(description.as_deref())?;
        }

        let mut todo = self
            .todos
            .find_todo(todo_id, user_id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        if let Some(title) = patch.title {
            todo.title = title;
        }
        if let Some(description) = patch.description {
            todo.description = description;
        }
        if let Some(completed) = patch.completed {
            todo.completed = completed;
        }
        todo.updated_at = Utc::now();

        self.todos
            .update_todo(todo)
            .await?
            .ok_or(ServiceError::NotFound)
    }

    async fn replace_todo(
        &self,
        todo_id: i64,
        user_id: &str,
        replacement: TodoReplacement,
    ) -> Result<Todo, ServiceError> {
        let user_id = validate_user_id(user_id)?;
        validate_title(&replacement.title)?;
        validate_description(replacement.description.as_deref())?;

        let mut todo = self
            .todos
            .find_todo(todo_id, user_id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        todo.title = replacement.title;
        todo.description = replacement.description;
        todo.completed = replacement.completed;
        todo.updated_at = Utc::now();

        self.todos
            .update_todo(todo)
            .await?
            .ok_or(ServiceError::NotFound)
    }

    async fn delete_todo(&self, todo_id: i64, user_id: &str) -> Result<(), ServiceError> {
        let user_id = validate_user_id(user_id)?;

        if self.todos.delete_todo(todo_id, user_id).await? {
            Ok(())
        } else {
            Err(ServiceError::NotFound)
        }
    }
}

#[injectable(ChatService)]
pub struct MyChatService {
    conversations: Ref<dyn ConversationRepository>,
}

#[async_trait]
impl ChatService for MyChatService {
    async fn create_conversation(&self, user_id: &str) -> Result<Conversation, ServiceError> {
        let user_id = validate_user_id(user_id)?;

        let now = Utc::now();
        let conversation = self
            .conversations
            .create_conversation(Conversation {
                id: Uuid::new_v4(),
                user_id: user_id.to_owned(),
                thread_id: None,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(
            "created conversation {} for user {user_id}",
            conversation.id
        );
        Ok(conversation)
    }

    async fn find_owned_conversation(
        &self,
        user_id: &str,
        conversation_id: Uuid,
    ) -> Result<Conversation, ServiceError> {
        let conversation = self
            .conversations
            .find_conversation(conversation_id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        if conversation.user_id != user_id {
            return Err(ServiceError::Forbidden);
        }

        Ok(conversation)
    }

    async fn create_message(
        &self,
        conversation_id: Uuid,
        role: MessageRole,
        content: String,
    ) -> Result<Message, ServiceError> {
        let message = self
            .conversations
            .create_message(Message {
                id: Uuid::new_v4(),
                conversation_id,
                role,
                content,
                timestamp: Utc::now(),
            })
            .await?;

        Ok(message)
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, ServiceError> {
        Ok(self.conversations.list_messages(conversation_id).await?)
    }

    async fn attach_thread(
        &self,
        conversation_id: Uuid,
        thread_id: &str,
    ) -> Result<(), ServiceError> {
        Ok(self
            .conversations
            .set_thread_id(conversation_id, thread_id)
            .await?)
    }
}
