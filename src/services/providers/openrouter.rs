use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::{AppError, AppResult},
    services::providers::TextGenerator,
};

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_DELAY: Duration = Duration::from_secs(1);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Text generation client for an OpenAI-compatible chat-completions
/// endpoint (OpenRouter by default).
///
/// The model is fixed at construction from configuration and never
/// changed at runtime. Transient failures are retried with exponential
/// backoff; exhaustion surfaces as a `Generation` error.
pub struct OpenRouterGenerator {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

impl OpenRouterGenerator {
    pub fn new(api_key: String, api_url: String, model: String) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            model,
        })
    }
}

#[async_trait::async_trait]
impl TextGenerator for OpenRouterGenerator {
    async fn generate<'a>(
        &'a self,
        prompt: &'a str,
        system_prompt: Option<&'a str>,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> AppResult<String> {
        let mut messages = Vec::new();
        if let Some(system) = system_prompt {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": prompt}));

        let mut payload = json!({
            "model": self.model,
            "messages": messages,
            "temperature": temperature,
        });
        if let Some(max_tokens) = max_tokens {
            payload["max_tokens"] = json!(max_tokens);
        }

        let url = format!("{}/chat/completions", self.api_url);
        let mut delay = INITIAL_DELAY;

        for attempt in 1..=MAX_ATTEMPTS {
            let result = self
                .http_client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&payload)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        match response.json::<ChatResponse>().await {
                            Ok(chat) => {
                                if let Some(choice) = chat.choices.into_iter().next() {
                                    return Ok(choice.message.content.trim().to_string());
                                }
                                // Missing choices is a known transient
                                // model failure; retry like any other
                                tracing::warn!(attempt, "LLM response missing choices");
                            }
                            Err(e) => {
                                tracing::warn!(attempt, error = %e, "Failed to parse LLM response");
                            }
                        }
                    } else {
                        let body = response.text().await.unwrap_or_default();
                        tracing::warn!(
                            attempt,
                            status = %status,
                            body = %body,
                            "LLM API request failed"
                        );
                        if status.is_client_error() && status.as_u16() != 429 {
                            return Err(AppError::Generation(format!(
                                "LLM API returned status {}: {}",
                                status, body
                            )));
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "LLM request error");
                }
            }

            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }

        Err(AppError::Generation(format!(
            "Text generation failed after {} attempts",
            MAX_ATTEMPTS
        )))
    }
}
