/// OpenAI-compatible chat-completions client for the Moonshot API.
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AnnotationRequest, Annotator};
use crate::config::{Credentials, ServiceConfig};
use crate::error::{Error, Result};

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: String,
}

pub struct MoonshotAnnotator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl MoonshotAnnotator {
    pub fn new(service: &ServiceConfig, credentials: &Credentials) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(service.timeout_secs))
            .user_agent(concat!("gocmt/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::AnnotationService(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", service.base_url.trim_end_matches('/')),
            api_key: credentials.api_key.clone(),
            model: service.model.clone(),
            temperature: service.temperature,
            max_tokens: service.max_tokens,
        })
    }
}

#[async_trait]
impl Annotator for MoonshotAnnotator {
    async fn annotate(&self, request: &AnnotationRequest) -> Result<String> {
        let prompt = request.prompt();
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::AnnotationService(format!("ChatCompletion request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(Error::AnnotationService(format!(
                "ChatCompletion returned status {status}: {}",
                detail.trim()
            )));
        }

        let completion: ChatResponse = resp.json().await.map_err(|e| {
            Error::AnnotationService(format!("failed to decode ChatCompletion response: {e}"))
        })?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::AnnotationService("ChatCompletion returned no choices".into()))?;

        debug!("ChatCompletion result:\n{content}");
        Ok(content)
    }
}
