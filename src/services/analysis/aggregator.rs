// Paragraph Aggregator
// Segment -> classify -> correct -> diff for every paragraph of an article
// Paragraphs run concurrently under a semaphore; results are collected by index so output order
// always matches input order, and one failing paragraph never aborts the rest.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::models::{Paragraph, PipelineStage};
use crate::services::providers::ProviderError;
use crate::services::text_processor::segment_paragraphs;

use super::bias_classifier::BiasClassifier;
use super::bias_corrector::BiasCorrector;
use super::diff_renderer::html_diff;

pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// What a paragraph looks like after its classifier or corrector call failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Status `failed` with the stage and error message.
    #[default]
    MarkFailed,
    /// Reported as analyzed and not biased; the failure is only logged.
    TreatAsUnbiased,
}

pub struct ParagraphAggregator {
    classifier: Arc<BiasClassifier>,
    corrector: Arc<BiasCorrector>,
    max_concurrency: usize,
    policy: FailurePolicy,
}

impl ParagraphAggregator {
    pub fn new(classifier: BiasClassifier, corrector: BiasCorrector) -> Self {
        Self {
            classifier: Arc::new(classifier),
            corrector: Arc::new(corrector),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Segment `text` and analyze every paragraph.
    pub async fn process(&self, text: &str) -> Vec<Paragraph> {
        self.process_paragraphs(segment_paragraphs(text)).await
    }

    pub async fn process_paragraphs(&self, paragraphs: Vec<Paragraph>) -> Vec<Paragraph> {
        let total = paragraphs.len();
        if total == 0 {
            return paragraphs;
        }

        let started = Instant::now();
        info!(
            "[AGGREGATOR] Analyzing {} paragraphs (max_concurrency={}, policy={:?})",
            total, self.max_concurrency, self.policy
        );

        // Kept so a paragraph whose task panicked can still be reported in place.
        let originals: Vec<String> = paragraphs.iter().map(|p| p.text().to_string()).collect();

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut join_set: JoinSet<(usize, Paragraph)> = JoinSet::new();

        for (idx, paragraph) in paragraphs.into_iter().enumerate() {
            let classifier = self.classifier.clone();
            let corrector = self.corrector.clone();
            let semaphore = semaphore.clone();
            let policy = self.policy;

            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let analyzed =
                    analyze_paragraph(&classifier, &corrector, policy, idx, paragraph).await;
                (idx, analyzed)
            });
        }

        let mut slots: Vec<Option<Paragraph>> = vec![None; total];
        while let Some(res) = join_set.join_next().await {
            match res {
                Ok((idx, paragraph)) => slots[idx] = Some(paragraph),
                Err(e) => warn!("[AGGREGATOR] Paragraph task failed: {}", e),
            }
        }

        let results: Vec<Paragraph> = slots
            .into_iter()
            .zip(originals)
            .filter_map(|(slot, text)| {
                slot.or_else(|| {
                    Paragraph::new(&text).map(|mut p| {
                        p.mark_failed(PipelineStage::Analysis, "analysis task aborted");
                        p
                    })
                })
            })
            .collect();

        let biased = results.iter().filter(|p| p.is_biased()).count();
        let failed = results.iter().filter(|p| p.is_failed()).count();
        info!(
            "[AGGREGATOR] Done: paragraphs={}, biased={}, failed={}, elapsed_ms={}",
            results.len(),
            biased,
            failed,
            started.elapsed().as_millis()
        );
        results
    }
}

async fn analyze_paragraph(
    classifier: &BiasClassifier,
    corrector: &BiasCorrector,
    policy: FailurePolicy,
    idx: usize,
    mut paragraph: Paragraph,
) -> Paragraph {
    let biased = match classifier.is_biased_enough(paragraph.text()).await {
        Ok(biased) => biased,
        Err(e) => {
            apply_failure(&mut paragraph, policy, idx, PipelineStage::Classification, &e);
            return paragraph;
        }
    };

    if !biased {
        paragraph.mark_unbiased();
        return paragraph;
    }

    match corrector.correct(paragraph.text()).await {
        Ok(correction) => {
            let diff = html_diff(paragraph.text(), &correction.replacement);
            paragraph.mark_biased(correction, diff);
        }
        Err(e) => apply_failure(&mut paragraph, policy, idx, PipelineStage::Correction, &e),
    }
    paragraph
}

fn apply_failure(
    paragraph: &mut Paragraph,
    policy: FailurePolicy,
    idx: usize,
    stage: PipelineStage,
    error: &ProviderError,
) {
    warn!(
        "[AGGREGATOR] Paragraph {} {} failed: {}",
        idx,
        stage.as_str(),
        error
    );
    match policy {
        FailurePolicy::MarkFailed => paragraph.mark_failed(stage, error.to_string()),
        FailurePolicy::TreatAsUnbiased => paragraph.mark_unbiased(),
    }
}
