// Analysis Module
// Bias and drama scoring core organized into specialized submodules:
// - bias_classifier: per-paragraph "biased enough to correct" gate
// - bias_corrector: neutral rewrite plus reason
// - diff_renderer: word-level insert/delete markup between original and rewrite
// - drama: emotion-weighted drama index with lexical boost
// - bias_score: article-level bias score and reasons
// - summary: short bias/drama summaries with deterministic fallbacks
// - aggregator: per-paragraph orchestration with failure isolation
// - pipeline: article-level analysis combining all of the above

pub mod aggregator;
pub mod bias_classifier;
pub mod bias_corrector;
pub mod bias_score;
pub mod diff_renderer;
pub mod drama;
pub mod pipeline;
pub mod summary;

#[cfg(test)]
pub(crate) mod test_support;

use thiserror::Error;

use crate::services::providers::ProviderError;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Upstream(#[from] ProviderError),
    #[error("Input text is empty")]
    EmptyInput,
    #[error("Malformed emotion profile: {0}")]
    MalformedProfile(String),
}

pub use aggregator::{FailurePolicy, ParagraphAggregator};
pub use bias_classifier::BiasClassifier;
pub use bias_corrector::{parse_correction, BiasCorrector};
pub use bias_score::{parse_bias_score, ArticleBiasScorer};
pub use diff_renderer::{html_diff, opcodes, OpTag, Opcode};
pub use drama::{compose_drama_index, narrative_intensity, weighted_intensity, DramaConfig, DramaScorer, EmotionWeights};
pub use pipeline::{AnalyzeOptions, ArticleAnalyzer};
pub use summary::{fallback_bias_summary, fallback_drama_summary, SummaryConfig, SummaryGenerator};
