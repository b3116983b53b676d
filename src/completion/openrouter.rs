//! Wire format of the OpenRouter `/chat/completions` endpoint

use serde::{Deserialize, Serialize};

use crate::chat::{self, Turn};

pub(crate) const DEFAULT_API_BASE: &str = "https://openrouter.ai";

pub(super) const CHAT_COMPLETIONS_PATH: &str = "/api/v1/chat/completions";

/// Upper bound on the length of a generated reply
pub(crate) const MAX_TOKENS: u32 = 1000;

pub(crate) const TEMPERATURE: f64 = 0.7;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Role {
    User,
    Assistant,
}

impl From<chat::Role> for Role {
    fn from(value: chat::Role) -> Self {
        match value {
            chat::Role::User => Role::User,
            chat::Role::Assistant => Role::Assistant,
        }
    }
}

#[derive(Serialize, Debug)]
pub(crate) struct ChatMessage<'t> {
    pub role: Role,
    pub content: &'t str,
}

/* Structures to serialize /chat/completions */

#[derive(Serialize, Debug)]
pub(crate) struct ChatCompletionRequest<'r> {
    pub model: &'r str,
    pub messages: Vec<ChatMessage<'r>>,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl<'r> ChatCompletionRequest<'r> {
    /// Builds the payload for `turns`, preserving their order.
    pub(crate) fn new(model: &'r str, turns: &'r [Turn]) -> ChatCompletionRequest<'r> {
        let messages = turns
            .iter()
            .map(|t| ChatMessage {
                role: t.role().into(),
                content: t.content(),
            })
            .collect();

        ChatCompletionRequest {
            model,
            messages,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        }
    }
}

/* Structures to deserialize /chat/completions */

#[derive(Deserialize, Debug)]
struct ReplyMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: Option<ReplyMessage>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorPayload {
    message: String,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    choices: Option<Vec<Choice>>,
    error: Option<ApiErrorPayload>,
}

/// The ways a successful response can fail to carry a reply
#[derive(thiserror::Error, Debug)]
pub(crate) enum MalformedReply {
    #[error("the response body is not a chat completion object")]
    Undecodable(#[source] serde_json::Error),

    /// OpenRouter occasionally reports upstream failures inside a 200 response
    #[error("the response carried an error instead of a reply: {0}")]
    ErrorPayload(String),

    #[error("the response has no \"choices\"")]
    MissingChoices,

    #[error("the response contains an empty \"choices\" list")]
    EmptyChoices,

    #[error("the first choice has no message")]
    MissingMessage,

    #[error("the first choice has no message content")]
    MissingContent,

    #[error("the model returned an empty reply")]
    EmptyContent,
}

/// Extracts `choices[0].message.content` from a response body.
pub(crate) fn extract_reply(body: &str) -> Result<String, MalformedReply> {
    let response: ChatCompletionResponse =
        serde_json::from_str(body).map_err(MalformedReply::Undecodable)?;

    let choices = match (response.choices, response.error) {
        (Some(choices), _) => choices,
        (None, Some(error)) => return Err(MalformedReply::ErrorPayload(error.message)),
        (None, None) => return Err(MalformedReply::MissingChoices),
    };

    let choice = choices
        .into_iter()
        .next()
        .ok_or(MalformedReply::EmptyChoices)?;

    let content = choice
        .message
        .ok_or(MalformedReply::MissingMessage)?
        .content
        .ok_or(MalformedReply::MissingContent)?;

    if content.is_empty() {
        return Err(MalformedReply::EmptyContent);
    }

    Ok(content)
}
