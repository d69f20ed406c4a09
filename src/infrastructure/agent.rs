//! HTTP client for an OpenAI-compatible chat-completions endpoint.

use crate::config::AppConfig;
use crate::core::assistant::{AgentReply, ChatMessage, Tool, ToolCall};
use crate::core::error::ServiceError;
use crate::core::traits::AgentRuntime;
use anyhow::anyhow;
use async_trait::async_trait;
use di::{Ref, inject, injectable};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct ApiChatRequest<'a> {
    model: &'a str,
    messages: Vec<ApiChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [Tool]>,
}

#[derive(Serialize)]
struct ApiChatMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: ApiFunctionCall,
}

#[derive(Serialize, Deserialize)]
struct ApiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Deserialize)]
struct ApiChatResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ApiToolCall>>,
}

pub struct OpenAiAgentRuntime {
    config: Ref<AppConfig>,
    client: reqwest::Client,
}

#[injectable(AgentRuntime)]
impl OpenAiAgentRuntime {
    #[inject]
    pub fn new(config: Ref<AppConfig>) -> OpenAiAgentRuntime {
        OpenAiAgentRuntime {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AgentRuntime for OpenAiAgentRuntime {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[Tool],
    ) -> Result<AgentReply, ServiceError> {
        let api_key = self
            .config
            .agent_api_key
            .as_deref()
            .ok_or_else(|| ServiceError::Server(anyhow!("AGENT_API_KEY is not configured")))?;

        let body = ApiChatRequest {
            model: &self.config.agent_model,
            messages: messages.iter().map(to_api_message).collect(),
            tools: if tools.is_empty() { None } else { Some(tools) },
        };

        let url = format!(
            "{}/chat/completions",
            self.config.agent_base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::Server(anyhow!("agent request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ServiceError::Server(anyhow!(
                "agent endpoint returned {status}: {detail}"
            )));
        }

        let parsed: ApiChatResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Server(anyhow!("failed to decode agent response: {e}")))?;

        let Some(choice) = parsed.choices.into_iter().next() else {
            return Err(ServiceError::Server(anyhow!(
                "agent response contained no choices"
            )));
        };

        Ok(AgentReply {
            content: choice.message.content,
            tool_calls: choice
                .message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|call| ToolCall {
                    id: call.id,
                    name: call.function.name,
                    arguments: call.function.arguments,
                })
                .collect(),
        })
    }
}

fn to_api_message(message: &ChatMessage) -> ApiChatMessage {
    ApiChatMessage {
        role: message.role.as_str(),
        content: message.content.clone(),
        tool_calls: if message.tool_calls.is_empty() {
            None
        } else {
            Some(
                message
                    .tool_calls
                    .iter()
                    .map(|call| ApiToolCall {
                        id: call.id.clone(),
                        call_type: "function".to_owned(),
                        function: ApiFunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
                        },
                    })
                    .collect(),
            )
        },
        tool_call_id: message.tool_call_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::assistant::Role;

    #[test]
    fn test_tool_message_carries_call_id() {
        let message = ChatMessage::tool("call_1".to_owned(), "Created todo: {}");
        let api = to_api_message(&message);

        assert_eq!(api.role, "tool");
        assert_eq!(api.tool_call_id.as_deref(), Some("call_1"));
        assert!(api.tool_calls.is_none());
    }

    #[test]
    fn test_assistant_message_serializes_tool_calls() {
        let message = ChatMessage::assistant(
            None,
            vec![ToolCall {
                id: "call_1".to_owned(),
                name: "list_todos".to_owned(),
                arguments: "{}".to_owned(),
            }],
        );
        let api = to_api_message(&message);
        let value = serde_json::to_value(&api).unwrap();

        assert_eq!(value["role"], "assistant");
        assert_eq!(value["tool_calls"][0]["function"]["name"], "list_todos");
        assert!(matches!(message.role, Role::Assistant));
    }
}
