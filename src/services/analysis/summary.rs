// Summary Generator
// One- or two-sentence bias and drama summaries with deterministic fallbacks

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::services::providers::{call_with_timeout, TextGenerator};
use crate::services::text_processor::truncate_chars;

pub const SUMMARY_SYSTEM_PROMPT: &str = r#"You write very short reader-facing notes about a news article.
The user message starts with a line saying which aspect to cover (bias, or drama/emotional intensity), followed by labeled lines such as Title, Summary, BiasScore, DramaIndex and Reason1..Reason3.

Write one or two plain sentences (under 40 words total) about ONLY the requested aspect. Scores are on a 0-100 scale; mention the level in words, not as a number. Do not use markdown, quotes or labels."#;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct SummaryConfig {
    pub max_summary_chars: usize,
    pub max_reasons: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            max_summary_chars: 800,
            max_reasons: 3,
        }
    }
}

pub struct SummaryGenerator {
    generator: Arc<dyn TextGenerator>,
    config: SummaryConfig,
    timeout_secs: u64,
}

impl SummaryGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>, config: SummaryConfig, timeout_secs: u64) -> Self {
        Self {
            generator,
            config,
            timeout_secs,
        }
    }

    /// Summarize the bias aspect of an article. Never fails.
    pub async fn summarize_bias(
        &self,
        title: &str,
        summary_text: &str,
        bias_score: Option<u8>,
        reasons: &[String],
    ) -> String {
        let mut lines = vec!["Summarize ONLY the bias aspect:".to_string()];
        if !title.trim().is_empty() {
            lines.push(format!("Title: {}", title.trim()));
        }
        if !summary_text.trim().is_empty() {
            lines.push(format!(
                "Summary: {}",
                truncate_chars(summary_text.trim(), self.config.max_summary_chars)
            ));
        }
        if let Some(score) = bias_score {
            lines.push(format!("BiasScore: {}", score));
        }
        for (i, reason) in reasons.iter().take(self.config.max_reasons).enumerate() {
            lines.push(format!("Reason{}: {}", i + 1, reason));
        }

        match self.ask(&lines.join("\n"), "bias").await {
            Some(summary) => summary,
            None => fallback_bias_summary(bias_score, reasons),
        }
    }

    /// Summarize the drama aspect of an article. Never fails.
    pub async fn summarize_drama(&self, summary_text: &str, drama_index: Option<u8>) -> String {
        let mut lines = vec!["Summarize ONLY the drama/emotional intensity aspect:".to_string()];
        if !summary_text.trim().is_empty() {
            lines.push(format!(
                "Summary: {}",
                truncate_chars(summary_text.trim(), self.config.max_summary_chars)
            ));
        }
        if let Some(index) = drama_index {
            lines.push(format!("DramaIndex: {}", index));
        }

        match self.ask(&lines.join("\n"), "drama").await {
            Some(summary) => summary,
            None => fallback_drama_summary(drama_index),
        }
    }

    /// Both summaries, generated concurrently. Returns `(bias_summary, drama_summary)`.
    pub async fn summarize_overall(
        &self,
        title: &str,
        summary_text: &str,
        bias_score: Option<u8>,
        drama_index: Option<u8>,
        reasons: &[String],
    ) -> (String, String) {
        tokio::join!(
            self.summarize_bias(title, summary_text, bias_score, reasons),
            self.summarize_drama(summary_text, drama_index)
        )
    }

    /// Trimmed, non-empty generator output, or `None` on failure.
    async fn ask(&self, input: &str, aspect: &str) -> Option<String> {
        match call_with_timeout(
            self.timeout_secs,
            self.generator.generate(input, SUMMARY_SYSTEM_PROMPT),
        )
        .await
        {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    debug!(aspect = aspect, "[SUMMARY] empty output, using fallback");
                    None
                } else {
                    Some(text.to_string())
                }
            }
            Err(e) => {
                warn!(aspect = aspect, "[SUMMARY] generation failed, using fallback: {}", e);
                None
            }
        }
    }
}

pub fn fallback_bias_summary(bias_score: Option<u8>, reasons: &[String]) -> String {
    if let Some(reason) = reasons.first().filter(|r| !r.trim().is_empty()) {
        return format!("Article contains biased language: {}", reason);
    }
    match bias_score {
        Some(score) => format!("Bias detected at level {}/100.", score),
        None => "Bias analysis in progress.".to_string(),
    }
}

pub fn fallback_drama_summary(drama_index: Option<u8>) -> String {
    let text = match drama_index {
        None => "Drama analysis in progress.",
        Some(i) if i <= 20 => "Article is calm and measured in tone.",
        Some(i) if i <= 40 => "Article uses mild emotional language.",
        Some(i) if i <= 60 => "Article is emotionally charged in presentation.",
        Some(i) if i <= 80 => "Article uses highly dramatic language and framing.",
        Some(_) => "Article employs sensationalist tactics.",
    };
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::analysis::test_support::FakeGenerator;
    use std::time::Duration;

    fn generator(fake: Arc<FakeGenerator>) -> SummaryGenerator {
        SummaryGenerator::new(fake, SummaryConfig::default(), 5)
    }

    #[tokio::test]
    async fn test_bias_fallback_uses_first_reason() {
        let summary = generator(Arc::new(FakeGenerator::failing()))
            .summarize_bias("", "", None, &["uses loaded language".to_string()])
            .await;
        assert_eq!(summary, "Article contains biased language: uses loaded language");
    }

    #[test]
    fn test_bias_fallback_keeps_reason_verbatim() {
        assert_eq!(
            fallback_bias_summary(Some(40), &[" padded reason ".to_string(), "second".to_string()]),
            "Article contains biased language:  padded reason "
        );
        assert_eq!(
            fallback_bias_summary(Some(40), &["   ".to_string(), "second".to_string()]),
            "Bias detected at level 40/100."
        );
    }

    #[tokio::test]
    async fn test_empty_output_falls_back() {
        let gen = generator(Arc::new(FakeGenerator::replying("   \n")));
        assert_eq!(
            gen.summarize_bias("T", "", Some(64), &[]).await,
            "Bias detected at level 64/100."
        );
        assert_eq!(gen.summarize_bias("", "", None, &[]).await, "Bias analysis in progress.");
        assert_eq!(
            gen.summarize_drama("", Some(90)).await,
            "Article employs sensationalist tactics."
        );
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let fake = FakeGenerator::replying("never seen").delayed(Duration::from_millis(1500));
        let gen = SummaryGenerator::new(Arc::new(fake), SummaryConfig::default(), 1);
        assert_eq!(gen.summarize_drama("", None).await, "Drama analysis in progress.");
    }

    #[tokio::test]
    async fn test_prompt_is_labeled_and_bounded() {
        let fake = Arc::new(FakeGenerator::replying("  Mostly neutral coverage.  "));
        let gen = SummaryGenerator::new(
            fake.clone(),
            SummaryConfig {
                max_summary_chars: 10,
                max_reasons: 2,
            },
            5,
        );
        let reasons: Vec<String> = ["r1", "r2", "r3"].iter().map(|r| r.to_string()).collect();
        let out = gen
            .summarize_bias("Headline", "0123456789abcdef", Some(12), &reasons)
            .await;
        assert_eq!(out, "Mostly neutral coverage.");

        let prompt = &fake.prompts()[0];
        assert_eq!(
            prompt,
            "Summarize ONLY the bias aspect:\nTitle: Headline\nSummary: 0123456789\nBiasScore: 12\nReason1: r1\nReason2: r2"
        );
    }

    #[tokio::test]
    async fn test_overall_runs_both() {
        let fake = Arc::new(FakeGenerator::with(|input, _| {
            if input.contains("drama") {
                Ok("Calm.".to_string())
            } else {
                Ok("Balanced.".to_string())
            }
        }));
        let (bias, drama) = generator(fake.clone())
            .summarize_overall("", "text", Some(10), Some(5), &[])
            .await;
        assert_eq!(bias, "Balanced.");
        assert_eq!(drama, "Calm.");
        assert_eq!(fake.calls(), 2);
    }

    #[test]
    fn test_drama_fallback_bands() {
        assert_eq!(fallback_drama_summary(Some(1)), "Article is calm and measured in tone.");
        assert_eq!(fallback_drama_summary(Some(20)), "Article is calm and measured in tone.");
        assert_eq!(fallback_drama_summary(Some(21)), "Article uses mild emotional language.");
        assert_eq!(
            fallback_drama_summary(Some(60)),
            "Article is emotionally charged in presentation."
        );
        assert_eq!(
            fallback_drama_summary(Some(80)),
            "Article uses highly dramatic language and framing."
        );
        assert_eq!(fallback_drama_summary(Some(81)), "Article employs sensationalist tactics.");
    }
}
