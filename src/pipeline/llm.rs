//! Generation client: send the composed prompt to a chat-completion model.
//!
//! The model is reached through the [`CompletionProvider`] trait so the
//! orchestrator and the HTTP layer can be exercised with an in-process fake.
//! [`OpenAiProvider`] is the production implementation: one `POST
//! {base_url}/chat/completions` per call, JSON mode on, no retry. All prompt
//! wording lives in [`crate::prompts`]; all shape checking of the reply lives
//! in [`crate::pipeline::normalize`].

use crate::config::{CardCount, FlashcardPreferences, PipelineConfig};
use crate::error::Pdf2CardsError;
use crate::output::{GenerationOutput, TokenUsage};
use crate::pipeline::normalize::normalize_response;
use crate::prompts::{compose_user_prompt, DEFAULT_SYSTEM_PROMPT};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// One chat-completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: Option<usize>,
    /// Ask the model for a JSON object.
    pub json_mode: bool,
}

/// Raw model output.
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    pub content: String,
    pub usage: TokenUsage,
}

/// A hosted completion model.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name for logs and errors.
    fn name(&self) -> &str;

    /// Model identifier sent with each request.
    fn model(&self) -> &str;

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, Pdf2CardsError>;
}

/// Build the request for `text`, call `provider` once, and normalise the reply.
pub async fn generate_cards(
    provider: &dyn CompletionProvider,
    text: &str,
    count: CardCount,
    prefs: &FlashcardPreferences,
    config: &PipelineConfig,
) -> Result<GenerationOutput, Pdf2CardsError> {
    let request = build_request(text, count, prefs, config);
    let start = Instant::now();

    debug!(
        "Requesting {} cards from {}/{} ({} chars of text)",
        count,
        provider.name(),
        provider.model(),
        text.len()
    );
    let response = provider.complete(&request).await?;

    let (flashcards, warnings) = normalize_response(&response.content, count)?;
    info!(
        "Generated {} cards in {:?} ({} prompt / {} completion tokens)",
        flashcards.len(),
        start.elapsed(),
        response.usage.prompt_tokens,
        response.usage.completion_tokens
    );

    Ok(GenerationOutput {
        flashcards,
        warnings,
        usage: response.usage,
    })
}

/// Assemble the [`CompletionRequest`] for one generation call.
pub fn build_request(
    text: &str,
    count: CardCount,
    prefs: &FlashcardPreferences,
    config: &PipelineConfig,
) -> CompletionRequest {
    CompletionRequest {
        system: config
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        user: compose_user_prompt(text, count, prefs, &config.auto_count_range),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        json_mode: true,
    }
}

// ── OpenAI-compatible HTTP provider ──────────────────────────────────────

/// Chat-completion client for OpenAI and compatible endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    api_key: String,
    http_client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

impl OpenAiProvider {
    pub const NAME: &'static str = "openai";

    /// Create a client using the model, endpoint and timeout from `config`.
    pub fn new(api_key: impl Into<String>, config: &PipelineConfig) -> Result<Self, Pdf2CardsError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| Pdf2CardsError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            api_key: api_key.into(),
            http_client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
        })
    }

    fn request_error(&self, detail: impl Into<String>) -> Pdf2CardsError {
        Pdf2CardsError::ProviderRequest {
            provider: Self::NAME.to_string(),
            detail: detail.into(),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, Pdf2CardsError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: &request.system,
                },
                Message {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_mode.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        };

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_error(e.to_string()))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| self.request_error(format!("reading response body: {e}")))?;

        if !status.is_success() {
            return Err(Pdf2CardsError::ProviderApi {
                provider: Self::NAME.to_string(),
                status: status.as_u16(),
                body: response_text,
            });
        }

        let chat: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| self.request_error(format!("malformed completion envelope: {e}")))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| Pdf2CardsError::EmptyProviderResponse {
                provider: Self::NAME.to_string(),
            })?;

        let usage = chat
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse { content, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CardType;
    use std::sync::Mutex;

    struct ScriptedProvider {
        reply: String,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "test-model"
        }

        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<CompletionResponse, Pdf2CardsError> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(CompletionResponse {
                content: self.reply.clone(),
                usage: TokenUsage {
                    prompt_tokens: 11,
                    completion_tokens: 22,
                },
            })
        }
    }

    fn scripted(reply: &str) -> ScriptedProvider {
        ScriptedProvider {
            reply: reply.to_string(),
            seen: Mutex::new(Vec::new()),
        }
    }

    #[test]
    fn build_request_uses_config() {
        let config = PipelineConfig::builder()
            .temperature(0.3)
            .max_tokens(900)
            .build()
            .unwrap();
        let req = build_request("body", CardCount::Exact(4), &Default::default(), &config);
        assert_eq!(req.system, DEFAULT_SYSTEM_PROMPT);
        assert!(req.user.starts_with("Generate 4 flashcards"));
        assert_eq!(req.temperature, 0.3);
        assert_eq!(req.max_tokens, Some(900));
        assert!(req.json_mode);
    }

    #[test]
    fn build_request_honours_system_prompt_override() {
        let config = PipelineConfig::builder()
            .system_prompt("Be terse.")
            .build()
            .unwrap();
        let req = build_request("x", CardCount::Auto, &Default::default(), &config);
        assert_eq!(req.system, "Be terse.");
    }

    #[tokio::test]
    async fn generate_cards_truncates_and_reports_usage() {
        let provider = scripted(
            r#"{"flashcards":[{"question":"a","answer":"1"},{"question":"b","answer":"2"},{"question":"c","answer":"3"}]}"#,
        );
        let prefs = FlashcardPreferences {
            card_type: Some(CardType::Cloze),
            ..Default::default()
        };
        let out = generate_cards(
            &provider,
            "text",
            CardCount::Exact(2),
            &prefs,
            &PipelineConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(out.flashcards.len(), 2);
        assert_eq!(out.usage.completion_tokens, 22);
        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].user.contains("cloze"));
    }

    #[tokio::test]
    async fn generate_cards_propagates_shape_errors() {
        let provider = scripted(r#"{"items":[]}"#);
        let err = generate_cards(
            &provider,
            "text",
            CardCount::Auto,
            &Default::default(),
            &PipelineConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Pdf2CardsError::InvalidResponseShape { .. }));
    }

    #[test]
    fn chat_request_serialises_json_mode() {
        let body = ChatRequest {
            model: "gpt-4o",
            messages: vec![Message {
                role: "user",
                content: "hi",
            }],
            temperature: 0.7,
            max_tokens: None,
            response_format: Some(ResponseFormat {
                format_type: "json_object",
            }),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
        assert!(json.get("max_tokens").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }
}
