//! AI-assisted summaries and translations backed by a hosted LLM.

use std::time::Duration;

use async_trait::async_trait;
use axum::{extract::State, Json};
use axum_extra::extract::WithRejection;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AssistantConfig;
use crate::content::Lang;
use crate::validation::ValidationErrors;
use crate::{html_to_text, ApiError, AppState};

const MESSAGES_API_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

pub const MAX_INPUT_CHARS: usize = 20_000;

#[derive(Debug, Clone, Error)]
pub enum AssistantError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rate limited")]
    RateLimited,
    #[error("invalid api key")]
    InvalidApiKey,
    #[error("unexpected response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub summary: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub translation: String,
}

#[async_trait]
pub trait ContentAssistant: Send + Sync {
    async fn summarize(&self, text: &str, lang: Lang) -> Result<Summary, AssistantError>;
    async fn translate(&self, html: &str, to: Lang) -> Result<Translation, AssistantError>;
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
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

/// Client for the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct AnthropicAssistant {
    http: Client,
    api_key: String,
    model: String,
}

impl AnthropicAssistant {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

    pub fn new(config: &AssistantConfig) -> Result<Self, AssistantError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("folio/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AssistantError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String, AssistantError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let res = self
            .http
            .post(MESSAGES_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match res.status() {
            s if s.is_success() => {
                let body: MessagesResponse = res
                    .json()
                    .await
                    .map_err(|e| AssistantError::Malformed(e.to_string()))?;
                body.content
                    .into_iter()
                    .find_map(|block| match block {
                        ContentBlock::Text { text } => Some(text),
                        ContentBlock::Other => None,
                    })
                    .ok_or_else(|| AssistantError::Malformed("no text content".to_string()))
            }
            StatusCode::UNAUTHORIZED => Err(AssistantError::InvalidApiKey),
            StatusCode::TOO_MANY_REQUESTS => Err(AssistantError::RateLimited),
            s => Err(AssistantError::Http {
                status: s.as_u16(),
                body: res.text().await.unwrap_or_default(),
            }),
        }
    }

    async fn ask_json<T: for<'de> Deserialize<'de>>(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<T, AssistantError> {
        let response = self.complete(system, prompt).await?;
        parse_json_reply(&response)
    }
}

#[async_trait]
impl ContentAssistant for AnthropicAssistant {
    async fn summarize(&self, text: &str, lang: Lang) -> Result<Summary, AssistantError> {
        let system = format!(
            "You summarize blog posts. Reply with JSON only, exactly of the form \
             {{\"summary\": string, \"keywords\": [string]}}. Write the summary in {} \
             in at most three sentences and give at most five keywords.",
            language_name(lang)
        );
        self.ask_json(&system, text).await
    }

    async fn translate(&self, html: &str, to: Lang) -> Result<Translation, AssistantError> {
        let system = format!(
            "You translate blog content into {}. Keep every HTML tag and attribute \
             unchanged and translate only the text. Reply with JSON only, exactly of \
             the form {{\"translation\": string}}.",
            language_name(to)
        );
        self.ask_json(&system, html).await
    }
}

fn language_name(lang: Lang) -> &'static str {
    match lang {
        Lang::Ko => "Korean",
        Lang::En => "English",
    }
}

fn map_reqwest_error(e: reqwest::Error) -> AssistantError {
    if e.is_timeout() {
        AssistantError::Timeout
    } else {
        AssistantError::Transport(e.to_string())
    }
}

fn parse_json_reply<T: for<'de> Deserialize<'de>>(response: &str) -> Result<T, AssistantError> {
    let json_str = extract_json(response);
    if json_str.is_empty() {
        return Err(AssistantError::Malformed("empty reply".to_string()));
    }
    serde_json::from_str(json_str).map_err(|e| {
        tracing::error!(
            json_error = %e,
            preview = %json_str.chars().take(200).collect::<String>(),
            "failed to parse assistant reply"
        );
        AssistantError::Malformed(e.to_string())
    })
}

/// Strips a surrounding markdown code fence, if any.
fn extract_json(text: &str) -> &str {
    let text = text.trim();

    if let Some(start) = text.find("```json") {
        let content_start = start + 7;
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    if let Some(start) = text.find("```") {
        let content_start = start + 3;
        let content_start = text[content_start..]
            .find('\n')
            .map(|i| content_start + i + 1)
            .unwrap_or(content_start);
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    text
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub lang: Lang,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_target")]
    pub to: Lang,
}

fn default_target() -> Lang {
    Lang::En
}

fn check_input(raw: &str) -> Result<(), ApiError> {
    let mut errors = ValidationErrors::default();
    let len = raw.trim().chars().count();
    if len == 0 {
        errors.add("content", "content is required");
    } else if len > MAX_INPUT_CHARS {
        errors.add(
            "content",
            format!("content must be at most {} characters", MAX_INPUT_CHARS),
        );
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.into())
    }
}

fn assistant(state: &AppState) -> Result<&dyn ContentAssistant, ApiError> {
    state
        .assistant
        .as_deref()
        .ok_or(ApiError::Unavailable("AI assistant"))
}

/// POST /api/ai/summarize
pub async fn summarize(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<SummarizeRequest>, ApiError>,
) -> Result<Json<Summary>, ApiError> {
    tracing::info!("summarize started");
    let assistant = assistant(&state)?;
    let text = html_to_text(&request.content);
    check_input(&text)?;

    let summary = assistant.summarize(&text, request.lang).await?;
    Ok(Json(summary))
}

/// POST /api/ai/translate
pub async fn translate(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<TranslateRequest>, ApiError>,
) -> Result<Json<Translation>, ApiError> {
    tracing::info!("translate started");
    let assistant = assistant(&state)?;
    check_input(&request.content)?;

    let translation = assistant.translate(&request.content, request.to).await?;
    Ok(Json(translation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_plain() {
        let input = r#"{"summary": "s"}"#;
        assert_eq!(extract_json(input), input);
    }

    #[test]
    fn extract_json_from_fenced_block() {
        let input = "Here you go:\n```json\n{\"translation\": \"hi\"}\n```";
        assert_eq!(extract_json(input), r#"{"translation": "hi"}"#);
        let generic = "```\n{\"translation\": \"hi\"}\n```";
        assert_eq!(extract_json(generic), r#"{"translation": "hi"}"#);
    }

    #[test]
    fn parse_reply_into_fixed_schema() {
        let summary: Summary =
            parse_json_reply("```json\n{\"summary\": \"짧은 요약\", \"keywords\": [\"rust\"]}\n```").unwrap();
        assert_eq!(summary.summary, "짧은 요약");
        assert_eq!(summary.keywords, vec!["rust"]);

        let without_keywords: Summary = parse_json_reply(r#"{"summary": "s"}"#).unwrap();
        assert!(without_keywords.keywords.is_empty());

        let err = parse_json_reply::<Translation>("sorry, I can't").unwrap_err();
        assert!(matches!(err, AssistantError::Malformed(_)));
    }

    #[test]
    fn input_limits() {
        assert!(check_input("   ").is_err());
        assert!(check_input(&"a".repeat(MAX_INPUT_CHARS + 1)).is_err());
        assert!(check_input("hello").is_ok());
    }
}
