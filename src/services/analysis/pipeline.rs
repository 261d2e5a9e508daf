// Article Analyzer
// Runs paragraph bias analysis, the article score and drama scoring concurrently, then the
// summaries, and assembles the boundary payload. Failures in one analysis never block another.

use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{ArticleAnalysis, BiasStatus, Paragraph};
use crate::services::config_store::{AppConfig, ConfigError, Credentials, GenerationConfig};
use crate::services::providers::{
    build_http_client, parse_provider, ChatCompletionsGenerator, GeminiGenerator,
    GenerativeClassifier, HuggingFaceEmotionClassifier, TextGenerator, DEEPSEEK_DEFAULT_URL,
    OPENAI_DEFAULT_URL,
};
use crate::services::text_processor::segment_paragraphs;

use super::aggregator::ParagraphAggregator;
use super::bias_classifier::BiasClassifier;
use super::bias_corrector::BiasCorrector;
use super::bias_score::ArticleBiasScorer;
use super::drama::DramaScorer;
use super::summary::SummaryGenerator;
use super::AnalysisError;

#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub title: String,
    /// Text handed to the summary prompts instead of the full article.
    pub summary_text: Option<String>,
    pub include_drama: bool,
    pub include_summaries: bool,
    pub include_score: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            title: String::new(),
            summary_text: None,
            include_drama: true,
            include_summaries: true,
            include_score: true,
        }
    }
}

pub struct ArticleAnalyzer {
    aggregator: ParagraphAggregator,
    drama: DramaScorer,
    scorer: ArticleBiasScorer,
    summaries: SummaryGenerator,
}

impl ArticleAnalyzer {
    pub fn new(
        aggregator: ParagraphAggregator,
        drama: DramaScorer,
        scorer: ArticleBiasScorer,
        summaries: SummaryGenerator,
    ) -> Self {
        Self {
            aggregator,
            drama,
            scorer,
            summaries,
        }
    }

    /// Wire the HTTP providers described by `config`.
    pub fn from_config(config: &AppConfig, credentials: &Credentials) -> Result<Self, ConfigError> {
        config
            .drama
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("drama: {}", e)))?;

        let timeout = config.pipeline.request_timeout_secs;
        let client =
            build_http_client(timeout).map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        let generator = build_generator(client.clone(), &config.generation, &credentials.generation_key)?;

        let mut emotions =
            HuggingFaceEmotionClassifier::new(client, &config.emotion.model, &credentials.emotion_token);
        if let Some(url) = config.emotion.base_url.as_deref() {
            emotions = emotions.with_base_url(url);
        }

        let classifier = Arc::new(GenerativeClassifier::new(generator.clone()));
        let aggregator = ParagraphAggregator::new(
            BiasClassifier::new(classifier, timeout),
            BiasCorrector::new(generator.clone(), timeout),
        )
        .with_max_concurrency(config.pipeline.max_concurrency)
        .with_failure_policy(config.pipeline.failure_policy);

        info!(
            "[ANALYZER] Configured: generation={}, emotion_model={}, timeout={}s",
            generator.name(),
            config.emotion.model,
            timeout
        );

        Ok(Self::new(
            aggregator,
            DramaScorer::new(Arc::new(emotions), config.drama.clone(), timeout),
            ArticleBiasScorer::new(generator.clone(), timeout, config.summary.max_reasons),
            SummaryGenerator::new(generator, config.summary.clone(), timeout),
        ))
    }

    pub async fn analyze(&self, text: &str, options: &AnalyzeOptions) -> ArticleAnalysis {
        let started = Instant::now();
        let request_id = Uuid::new_v4().to_string();
        let paragraphs = segment_paragraphs(text);
        info!(
            "[ANALYZER] Request {}: {} chars, {} paragraphs",
            request_id,
            text.len(),
            paragraphs.len()
        );

        if paragraphs.is_empty() {
            return ArticleAnalysis {
                request_id,
                paragraphs: Vec::new(),
                bias_status: BiasStatus::Empty,
                biased_count: 0,
                bias_score: None,
                drama: None,
                drama_error: None,
                bias_summary: None,
                drama_summary: None,
                latency_ms: started.elapsed().as_millis() as i64,
            };
        }

        let score_future = async {
            if !options.include_score {
                return None;
            }
            match self.scorer.score(text).await {
                Ok(score) => Some(score),
                Err(e) => {
                    warn!("[ANALYZER] Article score failed: {}", e);
                    None
                }
            }
        };

        let drama_future = async {
            if !options.include_drama {
                return (None, None);
            }
            match self.drama.score(text).await {
                Ok(score) => (Some(score), None),
                Err(AnalysisError::EmptyInput) => (None, None),
                Err(e) => {
                    warn!("[ANALYZER] Drama analysis failed: {}", e);
                    (None, Some(e.to_string()))
                }
            }
        };

        let (paragraphs, bias_score, (drama, drama_error)) = tokio::join!(
            self.aggregator.process_paragraphs(paragraphs),
            score_future,
            drama_future
        );

        let bias_status = BiasStatus::from_paragraphs(&paragraphs);
        let biased_count = paragraphs.iter().filter(|p| p.is_biased()).count();

        let (bias_summary, drama_summary) = if options.include_summaries {
            let reasons = match bias_score.as_ref() {
                Some(score) if !score.reasons.is_empty() => score.reasons.clone(),
                _ => paragraph_reasons(&paragraphs),
            };
            let summary_text = options.summary_text.as_deref().unwrap_or(text);
            let score = bias_score.as_ref().map(|s| s.score);

            if options.include_drama {
                let (bias, drama_text) = self
                    .summaries
                    .summarize_overall(
                        &options.title,
                        summary_text,
                        score,
                        drama.as_ref().map(|d| d.drama_index),
                        &reasons,
                    )
                    .await;
                (Some(bias), Some(drama_text))
            } else {
                let bias = self
                    .summaries
                    .summarize_bias(&options.title, summary_text, score, &reasons)
                    .await;
                (Some(bias), None)
            }
        } else {
            (None, None)
        };

        let latency_ms = started.elapsed().as_millis() as i64;
        info!(
            "[ANALYZER] Request {} done: status={:?}, biased={}/{}, drama={:?}, latency_ms={}",
            request_id,
            bias_status,
            biased_count,
            paragraphs.len(),
            drama.as_ref().map(|d| d.drama_index),
            latency_ms
        );

        ArticleAnalysis {
            request_id,
            paragraphs: paragraphs.iter().map(Paragraph::to_record).collect(),
            bias_status,
            biased_count,
            bias_score,
            drama,
            drama_error,
            bias_summary,
            drama_summary,
            latency_ms,
        }
    }
}

/// Generation backend for a `name[:model]` provider spec.
pub fn build_generator(
    client: reqwest::Client,
    config: &GenerationConfig,
    api_key: &str,
) -> Result<Arc<dyn TextGenerator>, ConfigError> {
    let spec = parse_provider(&config.provider);
    match spec.name.as_str() {
        "gemini" => {
            let mut generator = GeminiGenerator::new(client, &spec.model, api_key);
            if let Some(url) = config.base_url.as_deref() {
                generator = generator.with_base_url(url);
            }
            Ok(Arc::new(generator))
        }
        "openai" | "deepseek" => {
            let default_url = if spec.name == "openai" {
                OPENAI_DEFAULT_URL
            } else {
                DEEPSEEK_DEFAULT_URL
            };
            let url = config.base_url.as_deref().unwrap_or(default_url);
            Ok(Arc::new(ChatCompletionsGenerator::new(
                client,
                &spec.name,
                url,
                &spec.model,
                api_key,
            )))
        }
        other => Err(ConfigError::UnknownProvider(other.to_string())),
    }
}

fn paragraph_reasons(paragraphs: &[Paragraph]) -> Vec<String> {
    paragraphs
        .iter()
        .filter(|p| p.is_biased())
        .map(|p| p.reason_biased().trim().to_string())
        .filter(|r| !r.is_empty())
        .collect()
}
