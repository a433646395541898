use reqwest::Client;
use serde::{Deserialize, Serialize};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("Assistant is not configured")]
    NotConfigured,
    #[error("Assistant request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Assistant API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Assistant returned no text")]
    EmptyResponse,
}

#[derive(Debug, Clone)]
pub struct AssistantService {
    client: Client,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

impl AssistantService {
    pub fn new(api_key: Option<String>, model: String, max_tokens: u32) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model,
            max_tokens,
        }
    }

    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    /// Sends a single-turn question with the event context as system prompt
    /// and returns the concatenated text blocks of the answer.
    pub async fn ask(&self, system: &str, question: &str) -> Result<String, AssistantError> {
        let api_key = self.api_key.as_ref().ok_or(AssistantError::NotConfigured)?;

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages: vec![Message {
                role: "user",
                content: question,
            }],
        };

        let response = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Api { status, body });
        }

        let parsed: MessagesResponse = response.json().await?;
        let text: String = parsed
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            return Err(AssistantError::EmptyResponse);
        }
        Ok(text)
    }
}

/// System prompt wrapping the serialized event context.
pub fn system_prompt(context: &str) -> String {
    format!(
        "You are an assistant for an event photography and video production team. \
         Answer questions using only the event data below. If the data does not \
         contain the answer, say so briefly.\n\n{context}"
    )
}
