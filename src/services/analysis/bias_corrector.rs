// Bias Corrector
// Rewrites a biased paragraph into neutral language and explains why

use std::sync::Arc;
use tracing::debug;

use crate::models::CorrectionResult;
use crate::services::providers::{call_with_timeout, ProviderError, TextGenerator};

/// System instruction for neutral rewriting
pub const BIAS_CORRECTION_SYSTEM_PROMPT: &str = r#"You rewrite biased news paragraphs into neutral, factual language.
You will receive ONE paragraph that was judged to be biased.

Respond with exactly two parts:
Line 1: the rewritten paragraph on a single line. Keep every verifiable fact, name, number and quote; remove loaded wording, insults, unsupported generalizations and persuasive framing. Do not add new information.
Line 2 onward: one or two sentences explaining what made the original biased.

Do not add labels such as "Rewrite:" or "Reason:", and do not wrap the answer in quotes or code fences."#;

pub struct BiasCorrector {
    generator: Arc<dyn TextGenerator>,
    timeout_secs: u64,
}

impl BiasCorrector {
    pub fn new(generator: Arc<dyn TextGenerator>, timeout_secs: u64) -> Self {
        Self {
            generator,
            timeout_secs,
        }
    }

    pub async fn correct(&self, text: &str) -> Result<CorrectionResult, ProviderError> {
        let response = call_with_timeout(
            self.timeout_secs,
            self.generator.generate(text, BIAS_CORRECTION_SYSTEM_PROMPT),
        )
        .await?;
        let correction = parse_correction(&response);
        debug!(
            replacement_chars = correction.replacement.len(),
            has_reason = !correction.reason.is_empty(),
            "[BIAS_CORRECTOR] parsed correction"
        );
        Ok(correction)
    }
}

/// Split a rewrite response on its first line break.
///
/// First line is the replacement, the remainder is the reason. A response without a line break
/// has an empty reason; an empty response yields two empty strings.
pub fn parse_correction(response: &str) -> CorrectionResult {
    let trimmed = response.trim();
    let (replacement, reason) = match trimmed.split_once('\n') {
        Some((first, rest)) => (first.trim(), rest.trim()),
        None => (trimmed, ""),
    };
    CorrectionResult {
        replacement: replacement.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::analysis::test_support::FakeGenerator;

    #[test]
    fn test_parse_correction_two_parts() {
        let c = parse_correction(
            "Politicians are implementing controversial policies.\nUses emotionally charged language: 'destroying', 'corrupt'.\nAlso generalizes.",
        );
        assert_eq!(c.replacement, "Politicians are implementing controversial policies.");
        assert_eq!(
            c.reason,
            "Uses emotionally charged language: 'destroying', 'corrupt'.\nAlso generalizes."
        );
    }

    #[test]
    fn test_parse_correction_without_line_break() {
        let c = parse_correction("  Just a rewrite.  ");
        assert_eq!(c.replacement, "Just a rewrite.");
        assert_eq!(c.reason, "");
    }

    #[test]
    fn test_parse_correction_empty_and_crlf() {
        assert_eq!(parse_correction(""), CorrectionResult::default());
        assert_eq!(parse_correction("   \n  "), CorrectionResult::default());

        let c = parse_correction("Neutral text.\r\nLoaded wording.\r\n");
        assert_eq!(c.replacement, "Neutral text.");
        assert_eq!(c.reason, "Loaded wording.");
    }

    #[tokio::test]
    async fn test_correct_uses_generator() {
        let fake = std::sync::Arc::new(FakeGenerator::with(|text, instruction| {
            assert!(instruction.contains("neutral"));
            Ok(format!("{} (neutral)\nreason", text))
        }));
        let corrector = BiasCorrector::new(fake.clone(), 5);
        let c = corrector.correct("Radical mob wrecks city").await.unwrap();
        assert_eq!(c.replacement, "Radical mob wrecks city (neutral)");
        assert_eq!(c.reason, "reason");
        assert_eq!(fake.calls(), 1);
    }

    #[tokio::test]
    async fn test_correct_propagates_failure() {
        let corrector = BiasCorrector::new(std::sync::Arc::new(FakeGenerator::failing()), 5);
        assert!(corrector.correct("text").await.is_err());
    }
}
