//! Chat endpoints: one conversational turn and history replay.

use crate::api::{ApiError, ExtractUser};
use crate::core::assistant::{Assistant, ChatMessage};
use crate::core::error::ServiceError;
use crate::core::traits::ChatService;
use crate::infrastructure::entities::MessageRole;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use di_axum::Inject;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/message", post(chat_message))
        .route("/message/:conversation_id", get(conversation_history))
}

/// Unlike the todo surface, conversations report ownership mismatches as 403.
fn chat_error(err: ServiceError, conversation_id: Uuid) -> ApiError {
    match err {
        ServiceError::NotFound => ApiError::new(
            StatusCode::NOT_FOUND,
            format!("Conversation with ID {conversation_id} not found."),
        ),
        ServiceError::Forbidden => ApiError::new(
            StatusCode::FORBIDDEN,
            "You do not have permission to access this conversation.",
        ),
        ServiceError::Invalid(detail) => ApiError::new(StatusCode::BAD_REQUEST, detail),
        ServiceError::Unauthenticated => ApiError::unauthorized(),
        ServiceError::Server(_) => ApiError::internal("Internal server error"),
    }
}

async fn chat_message(
    Inject(chat_service): Inject<dyn ChatService>,
    Inject(assistant): Inject<Assistant>,
    ExtractUser(current_user): ExtractUser,
    Json(request): Json<schemas::ChatMessageRequest>,
) -> Result<Json<schemas::ChatMessageResponse>, ApiError> {
    // Resolve or lazily create the conversation.
    let conversation = match request.conversation_id {
        Some(conversation_id) => chat_service
            .find_owned_conversation(&current_user.id, conversation_id)
            .await
            .map_err(|e| chat_error(e, conversation_id))?,
        None => chat_service
            .create_conversation(&current_user.id)
            .await
            .map_err(|e| chat_error(e, Uuid::nil()))?,
    };

    chat_service
        .create_message(conversation.id, MessageRole::User, request.message)
        .await
        .map_err(|e| chat_error(e, conversation.id))?;

    // Replay the stored transcript (including the message just persisted)
    // so the runtime sees the full conversation context.
    let history: Vec<ChatMessage> = chat_service
        .list_messages(conversation.id)
        .await
        .map_err(|e| chat_error(e, conversation.id))?
        .into_iter()
        .map(ChatMessage::from)
        .collect();

    let had_thread = conversation.thread_id.is_some();
    let (reply, thread_id) = assistant
        .process_message(&current_user.id, history, conversation.thread_id)
        .await;

    if !had_thread {
        chat_service
            .attach_thread(conversation.id, &thread_id)
            .await
            .map_err(|e| chat_error(e, conversation.id))?;
    }

    let assistant_message = chat_service
        .create_message(conversation.id, MessageRole::Assistant, reply)
        .await
        .map_err(|e| chat_error(e, conversation.id))?;

    Ok(Json(schemas::ChatMessageResponse::from(assistant_message)))
}

async fn conversation_history(
    Inject(chat_service): Inject<dyn ChatService>,
    ExtractUser(current_user): ExtractUser,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<Vec<schemas::ChatMessageResponse>>, ApiError> {
    chat_service
        .find_owned_conversation(&current_user.id, conversation_id)
        .await
        .map_err(|e| chat_error(e, conversation_id))?;

    let messages = chat_service
        .list_messages(conversation_id)
        .await
        .map_err(|e| chat_error(e, conversation_id))?;

    Ok(Json(
        messages
            .into_iter()
            .map(schemas::ChatMessageResponse::from)
            .collect(),
    ))
}

pub mod schemas {
    use crate::infrastructure::entities;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Deserialize, Debug)]
    pub struct ChatMessageRequest {
        pub message: String,
        #[serde(default)]
        pub conversation_id: Option<Uuid>,
    }

    #[derive(Serialize, Debug)]
    pub struct ChatMessageResponse {
        pub conversation_id: String,
        pub message_id: String,
        pub role: String,
        pub content: String,
        pub timestamp: DateTime<Utc>,
    }

    impl From<entities::Message> for ChatMessageResponse {
        fn from(message: entities::Message) -> Self {
            ChatMessageResponse {
                conversation_id: message.conversation_id.to_string(),
                message_id: message.id.to_string(),
                role: message.role.as_str().to_owned(),
                content: message.content,
                timestamp: message.timestamp,
            }
        }
    }
}
