//! OpenAI chat-completions backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::TranslationBackend;
use crate::error::TranslateError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

pub struct OpenAiBackend {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiBackend {
    /// # Errors
    ///
    /// Returns [`TranslateError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> Result<Self, TranslateError> {
        Self::with_base_url(api_key, model, timeout, DEFAULT_BASE_URL)
    }

    /// Points the backend at another API origin (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`TranslateError::Http`] if the HTTP client cannot be built.
    pub fn with_base_url(
        api_key: &str,
        model: &str,
        timeout: Duration,
        base_url: &str,
    ) -> Result<Self, TranslateError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            model: model.to_owned(),
            endpoint: format!("{}/v1/chat/completions", base_url.trim_end_matches('/')),
        })
    }
}

fn system_prompt(source_lang: &str, target_lang: &str) -> String {
    format!(
        "You translate Japanese fashion retail product copy from {source_lang} to {target_lang}. \
         Reply with the translation only. Keep brand names, model numbers, sizes and HTML tags \
         unchanged. Never output Japanese kana."
    )
}

/// Drops a surrounding Markdown code fence if the model added one.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[async_trait]
impl TranslationBackend for OpenAiBackend {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslateError> {
        let system = system_prompt(source_lang, target_lang);
        let request = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TranslateError::Unavailable {
                reason: format!("OpenAI returned status {status}"),
            });
        }

        let body = response.text().await?;
        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|source| TranslateError::Deserialize {
                context: "chat completion".to_owned(),
                source,
            })?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| TranslateError::Unavailable {
                reason: "OpenAI returned no choices".to_owned(),
            })?;
        Ok(strip_code_fence(&content).to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_fence_is_removed() {
        assert_eq!(strip_code_fence("```\n鯊魚連帽衫\n```"), "鯊魚連帽衫");
        assert_eq!(strip_code_fence("```text\n外套```"), "外套");
        assert_eq!(strip_code_fence("  外套 "), "外套");
    }

    #[test]
    fn prompt_names_both_languages() {
        let prompt = system_prompt("ja", "zh-TW");
        assert!(prompt.contains("from ja to zh-TW"));
    }
}
