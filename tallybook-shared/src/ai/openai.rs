/// OpenAI chat completions client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{into_generation, AiError, Generation, TextGenerator, REQUEST_TIMEOUT};

const BASE_URL: &str = "https://api.openai.com/v1";

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: Option<i32>,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key: api_key.into(),
            model: model.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

fn build_messages<'a>(system: Option<&'a str>, prompt: &'a str) -> Vec<Message<'a>> {
    let mut messages = Vec::with_capacity(2);
    if let Some(content) = system {
        messages.push(Message { role: "system", content });
    }
    messages.push(Message { role: "user", content: prompt });
    messages
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate(&self, system: Option<&str>, prompt: &str) -> Result<Generation, AiError> {
        if self.api_key.is_empty() {
            return Err(AiError::NotConfigured);
        }

        let request = ChatRequest {
            model: &self.model,
            messages: build_messages(system, prompt),
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "Calling OpenAI");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(status, "OpenAI request failed");
            return Err(AiError::from_status(status, body));
        }

        let body: ChatResponse = response.json().await?;
        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content);

        into_generation(text, body.usage.and_then(|u| u.total_tokens))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
