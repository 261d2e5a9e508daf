// Article Bias Scorer
// Article-level 0-100 bias score with a few short reasons, used to seed summaries

use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::ArticleBiasScore;
use crate::services::providers::{call_with_timeout, ProviderError, TextGenerator};
use crate::services::text_processor::truncate_chars;

pub const BIAS_SCORE_SYSTEM_PROMPT: &str = r#"You are a media-bias analyst. Rate how biased the following news article is on a scale from 0 (completely neutral, factual reporting) to 100 (extremely one-sided, propagandistic).

Consider loaded or emotionally charged wording, one-sided sourcing, unsupported generalizations, and persuasive rather than informative framing.

Respond with ONLY a JSON object, no markdown:
{"score": <integer 0-100>, "reasons": ["<short reason>", "<short reason>"]}
Give at most 3 reasons, each under 20 words. Use an empty list when the article is neutral."#;

/// Upper bound on article text sent for scoring.
const MAX_SCORE_INPUT_CHARS: usize = 12_000;

#[derive(Debug, Deserialize)]
struct ScorePayload {
    score: f64,
    #[serde(default)]
    reasons: Vec<String>,
}

pub struct ArticleBiasScorer {
    generator: Arc<dyn TextGenerator>,
    timeout_secs: u64,
    max_reasons: usize,
}

impl ArticleBiasScorer {
    pub fn new(generator: Arc<dyn TextGenerator>, timeout_secs: u64, max_reasons: usize) -> Self {
        Self {
            generator,
            timeout_secs,
            max_reasons,
        }
    }

    pub async fn score(&self, text: &str) -> Result<ArticleBiasScore, ProviderError> {
        let input = truncate_chars(text.trim(), MAX_SCORE_INPUT_CHARS);
        let response = call_with_timeout(
            self.timeout_secs,
            self.generator.generate(input, BIAS_SCORE_SYSTEM_PROMPT),
        )
        .await?;

        match parse_bias_score(&response, self.max_reasons) {
            Ok(score) => {
                info!(
                    score = score.score,
                    reasons = score.reasons.len(),
                    "[BIAS_SCORE] article scored"
                );
                Ok(score)
            }
            Err(e) => {
                warn!("[BIAS_SCORE] unparseable score response: {}", e);
                Err(e)
            }
        }
    }
}

/// First balanced `{...}` object in a model response. Braces inside JSON strings do not count.
fn extract_json(content: &str) -> Result<&str, String> {
    let start = content.find('{').ok_or_else(|| "No JSON in response".to_string())?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in content[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&content[start..=start + i]);
                }
            }
            _ => {}
        }
    }
    Err("Invalid JSON response".to_string())
}

/// Parse `{"score": n, "reasons": [...]}` out of a model response.
///
/// The score is rounded and clamped into [0, 100]; blank reasons are dropped and at most
/// `max_reasons` are kept.
pub fn parse_bias_score(content: &str, max_reasons: usize) -> Result<ArticleBiasScore, ProviderError> {
    let json_str = extract_json(content.trim()).map_err(ProviderError::MalformedResponse)?;
    let payload: ScorePayload = serde_json::from_str(json_str)
        .map_err(|e| ProviderError::MalformedResponse(format!("JSON parse error: {}", e)))?;

    if !payload.score.is_finite() {
        return Err(ProviderError::MalformedResponse(format!(
            "score is not a number: {}",
            payload.score
        )));
    }
    let score = payload.score.round().clamp(0.0, 100.0) as u8;
    let reasons = payload
        .reasons
        .into_iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .take(max_reasons)
        .collect();

    Ok(ArticleBiasScore { score, reasons })
}
