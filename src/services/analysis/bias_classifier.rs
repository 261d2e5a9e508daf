// Bias Classifier
// Per-paragraph gate deciding whether a paragraph is biased enough to rewrite

use std::sync::Arc;
use tracing::debug;

use crate::services::providers::{call_with_timeout, ProviderError, TextClassifier};

/// System instruction for the paragraph-level bias gate
pub const BIAS_DETECTION_SYSTEM_PROMPT: &str = r#"You are a media-bias reviewer for news articles and transcripts.
You will receive ONE paragraph. Decide whether it is biased enough that it should be rewritten in neutral language.

Treat a paragraph as biased enough when it contains at least one of:
1. Loaded or emotionally charged wording used to sway the reader (e.g. "destroying", "radical", "disaster")
2. Opinion presented as fact, or unsupported generalizations ("everyone knows", "always", "nothing")
3. Name-calling, insults, or mocking framing of people or groups
4. One-sided framing that omits obvious context in order to persuade

Do NOT flag paragraphs that merely report facts, quote someone with attribution, or use strong but accurate terms.

Answer with exactly one word: true or false. No punctuation, no explanation."#;

pub struct BiasClassifier {
    classifier: Arc<dyn TextClassifier>,
    timeout_secs: u64,
}

impl BiasClassifier {
    pub fn new(classifier: Arc<dyn TextClassifier>, timeout_secs: u64) -> Self {
        Self {
            classifier,
            timeout_secs,
        }
    }

    /// Ask the classification service whether `text` warrants correction.
    ///
    /// Service failures are returned as errors; they never turn into a `false` verdict.
    pub async fn is_biased_enough(&self, text: &str) -> Result<bool, ProviderError> {
        let verdict = call_with_timeout(
            self.timeout_secs,
            self.classifier.classify(text, BIAS_DETECTION_SYSTEM_PROMPT),
        )
        .await?;
        debug!(biased = verdict, chars = text.len(), "[BIAS_CLASSIFIER] verdict");
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::analysis::test_support::{upstream_error, FakeClassifier};
    use std::time::Duration;

    #[tokio::test]
    async fn test_verdict_passthrough() {
        let fake = Arc::new(FakeClassifier::with(|text| Ok(text.contains("disaster"))));
        let classifier = BiasClassifier::new(fake.clone(), 5);

        assert!(classifier.is_biased_enough("A total disaster of a policy.").await.unwrap());
        assert!(!classifier.is_biased_enough("The policy passed 52-48.").await.unwrap());
        assert_eq!(fake.calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_is_not_false() {
        let fake = Arc::new(FakeClassifier::with(|_| Err(upstream_error())));
        let classifier = BiasClassifier::new(fake, 5);
        let res = classifier.is_biased_enough("anything").await;
        assert!(matches!(res, Err(ProviderError::ApiError { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_generative_classifier_timeout() {
        use crate::services::analysis::test_support::FakeGenerator;
        use crate::services::providers::GenerativeClassifier;

        let slow = Arc::new(FakeGenerator::replying("true").delayed(Duration::from_secs(3)));
        let classifier = BiasClassifier::new(Arc::new(GenerativeClassifier::new(slow)), 1);
        let res = classifier.is_biased_enough("text").await;
        assert!(matches!(res, Err(ProviderError::Timeout(1))));
    }

    #[tokio::test]
    async fn test_generative_classifier_malformed_verdict() {
        use crate::services::analysis::test_support::FakeGenerator;
        use crate::services::providers::GenerativeClassifier;

        let chatty = Arc::new(FakeGenerator::replying("Probably, given the tone."));
        let classifier = BiasClassifier::new(Arc::new(GenerativeClassifier::new(chatty)), 5);
        let res = classifier.is_biased_enough("text").await;
        assert!(matches!(res, Err(ProviderError::MalformedResponse(_))));
    }
}
