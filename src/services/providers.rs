// AI Provider Service
// Collaborator traits plus Gemini, OpenAI-compatible and Hugging Face clients

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

use crate::services::text_processor::truncate_words;

pub const GEMINI_DEFAULT_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const OPENAI_DEFAULT_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEEPSEEK_DEFAULT_URL: &str = "https://api.deepseek.com/chat/completions";
pub const HUGGINGFACE_DEFAULT_URL: &str = "https://router.huggingface.co/hf-inference/models";

pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEEPSEEK_DEFAULT_MODEL: &str = "deepseek-chat";
pub const EMOTION_DEFAULT_MODEL: &str = "j-hartmann/emotion-english-distilroberta-base";

/// Roughly 512 model tokens of English prose.
pub const EMOTION_MAX_WORDS: usize = 380;

const DEFAULT_MAX_OUTPUT_TOKENS: i32 = 1024;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("JSON parse error: {0}")]
    JsonError(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Request timed out after {0}s")]
    Timeout(u64),
}

// ============ Collaborator traits ============

/// Free-text generation seeded with a system instruction.
///
/// An empty string is a successful (if unhelpful) answer; transport or API problems are errors.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, text: &str, system_instruction: &str) -> Result<String, ProviderError>;

    fn name(&self) -> &str;
}

/// Binary text classification seeded with a system instruction.
#[async_trait]
pub trait TextClassifier: Send + Sync {
    async fn classify(&self, text: &str, system_instruction: &str) -> Result<bool, ProviderError>;
}

/// Raw `(label, probability)` pairs from an emotion model.
#[async_trait]
pub trait EmotionClassifier: Send + Sync {
    async fn classify_emotions(&self, text: &str) -> Result<Vec<(String, f64)>, ProviderError>;
}

/// Await an upstream call, converting an elapsed deadline into `ProviderError::Timeout`.
pub async fn call_with_timeout<T, F>(timeout_secs: u64, fut: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(Duration::from_secs(timeout_secs), fut).await {
        Ok(res) => res,
        Err(_) => Err(ProviderError::Timeout(timeout_secs)),
    }
}

// ============ Provider specs ============

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderSpec {
    pub name: String,
    pub model: String,
}

pub fn parse_provider(spec: &str) -> ProviderSpec {
    let parts: Vec<&str> = spec.trim().splitn(2, ':').collect();
    let name = parts[0].trim().to_lowercase();
    let model = parts.get(1).map(|m| m.trim().to_string()).unwrap_or_default();
    let model = if model.is_empty() {
        default_model(&name).to_string()
    } else {
        model
    };
    ProviderSpec { name, model }
}

pub fn default_model(provider: &str) -> &'static str {
    match provider {
        "gemini" => GEMINI_DEFAULT_MODEL,
        "openai" => OPENAI_DEFAULT_MODEL,
        "deepseek" => DEEPSEEK_DEFAULT_MODEL,
        "huggingface" | "hf" => EMOTION_DEFAULT_MODEL,
        _ => "",
    }
}

/// Environment variables consulted for a provider's key, in priority order.
pub fn api_key_env_vars(provider: &str) -> &'static [&'static str] {
    match provider {
        "gemini" => &["GEMINI_API_KEY", "BIASLENS_GEMINI_API_KEY"],
        "openai" => &["OPENAI_API_KEY", "BIASLENS_OPENAI_API_KEY"],
        "deepseek" => &["DEEPSEEK_API_KEY", "BIASLENS_DEEPSEEK_API_KEY"],
        "huggingface" | "hf" => &["HF_API_TOKEN", "HUGGINGFACE_API_TOKEN", "BIASLENS_HF_API_TOKEN"],
        _ => &[],
    }
}

pub fn build_http_client(timeout_secs: u64) -> Result<Client, ProviderError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::ApiError {
        status: status.as_u16(),
        message: body,
    })
}

// ============ Gemini ============

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f64,
    max_output_tokens: i32,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

pub struct GeminiGenerator {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    max_output_tokens: i32,
}

impl GeminiGenerator {
    pub fn new(client: Client, model: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: GEMINI_DEFAULT_URL.to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, text: &str, system_instruction: &str) -> Result<String, ProviderError> {
        let request = GeminiRequest {
            system_instruction: if system_instruction.is_empty() {
                None
            } else {
                Some(GeminiContent {
                    role: None,
                    parts: vec![GeminiPart {
                        text: Some(system_instruction.to_string()),
                    }],
                })
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: Some(text.to_string()),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: 0.0,
                max_output_tokens: self.max_output_tokens,
            },
        };

        let start = Instant::now();
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let data: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::JsonError(e.to_string()))?;

        // Blocked or empty candidates come back as an empty answer, not an error.
        let content = data
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        debug!(
            model = %self.model,
            latency_ms = start.elapsed().as_millis() as i64,
            chars = content.len(),
            "gemini.generate"
        );
        Ok(content)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

// ============ OpenAI-compatible chat ============

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: i32,
    temperature: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessageResponse>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

/// Any `/chat/completions` endpoint (OpenAI, DeepSeek, local gateways).
pub struct ChatCompletionsGenerator {
    client: Client,
    provider: String,
    url: String,
    model: String,
    api_key: String,
    max_tokens: i32,
}

impl ChatCompletionsGenerator {
    pub fn new(client: Client, provider: &str, url: &str, model: &str, api_key: &str) -> Self {
        Self {
            client,
            provider: provider.to_string(),
            url: url.to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            max_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionsGenerator {
    async fn generate(&self, text: &str, system_instruction: &str) -> Result<String, ProviderError> {
        let mut messages = Vec::with_capacity(2);
        if !system_instruction.is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system_instruction.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: text.to_string(),
        });

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
            temperature: 0.0,
        };

        let start = Instant::now();
        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let data: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::JsonError(e.to_string()))?;

        let content = data
            .choices
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.clone())
            .unwrap_or_default();

        debug!(
            provider = %self.provider,
            model = %self.model,
            latency_ms = start.elapsed().as_millis() as i64,
            "chat.generate"
        );
        Ok(content)
    }

    fn name(&self) -> &str {
        &self.provider
    }
}

// ============ Classification over generation ============

/// Binary classifier that asks a generator for a bare `true` / `false` answer.
pub struct GenerativeClassifier {
    generator: Arc<dyn TextGenerator>,
}

impl GenerativeClassifier {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl TextClassifier for GenerativeClassifier {
    async fn classify(&self, text: &str, system_instruction: &str) -> Result<bool, ProviderError> {
        let answer = self.generator.generate(text, system_instruction).await?;
        parse_verdict(&answer)
    }
}

/// Strict verdict parsing: anything other than true/false is a malformed answer.
pub fn parse_verdict(answer: &str) -> Result<bool, ProviderError> {
    let normalized = answer
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`')
        .trim_end_matches('.')
        .trim()
        .to_lowercase();
    match normalized.as_str() {
        "true" | "yes" => Ok(true),
        "false" | "no" => Ok(false),
        _ => {
            let preview: String = answer.chars().take(80).collect();
            Err(ProviderError::MalformedResponse(format!(
                "expected true/false verdict, got {:?}",
                preview
            )))
        }
    }
}

// ============ Hugging Face emotion model ============

#[derive(Debug, Clone, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum EmotionResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

impl EmotionResponse {
    fn into_scores(self) -> Vec<(String, f64)> {
        let items = match self {
            Self::Nested(outer) => outer.into_iter().next().unwrap_or_default(),
            Self::Flat(items) => items,
        };
        items.into_iter().map(|ls| (ls.label, ls.score)).collect()
    }
}

pub struct HuggingFaceEmotionClassifier {
    client: Client,
    base_url: String,
    model: String,
    api_token: String,
    max_words: usize,
}

impl HuggingFaceEmotionClassifier {
    pub fn new(client: Client, model: &str, api_token: &str) -> Self {
        Self {
            client,
            base_url: HUGGINGFACE_DEFAULT_URL.to_string(),
            model: model.to_string(),
            api_token: api_token.to_string(),
            max_words: EMOTION_MAX_WORDS,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl EmotionClassifier for HuggingFaceEmotionClassifier {
    async fn classify_emotions(&self, text: &str) -> Result<Vec<(String, f64)>, ProviderError> {
        // The model only sees its first 512 tokens; truncate instead of chunking.
        let input = truncate_words(text, self.max_words);
        let request = serde_json::json!({
            "inputs": input,
            "parameters": { "top_k": 7 },
        });

        let start = Instant::now();
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, self.model))
            .header("Authorization", format!("Bearer {}", self.api_token))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let data: EmotionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::JsonError(e.to_string()))?;
        let scores = data.into_scores();
        if scores.is_empty() {
            warn!(model = %self.model, "emotion model returned no labels");
            return Err(ProviderError::MalformedResponse(
                "emotion model returned no labels".to_string(),
            ));
        }

        debug!(
            model = %self.model,
            latency_ms = start.elapsed().as_millis() as i64,
            labels = scores.len(),
            "huggingface.classify_emotions"
        );
        Ok(scores)
    }
}
