// BiasLens Data Models
// Request-scoped values produced by the analysis pipeline

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============ Paragraph ============

/// Stage of the per-paragraph pipeline that failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Classification,
    Correction,
    /// The paragraph's task stopped before reporting which call failed.
    Analysis,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ParagraphStatus {
    #[default]
    Pending,
    Analyzed,
    Failed {
        stage: PipelineStage,
        message: String,
    },
}

/// Neutral rewrite of a biased paragraph and the reason it was flagged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CorrectionResult {
    pub replacement: String,
    pub reason: String,
}

/// One non-empty line of an article or transcript.
///
/// The replacement and reason travel together as a `CorrectionResult`, and the diff is only
/// stored alongside a correction, so a paragraph can never carry half a correction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    text: String,
    correction: Option<CorrectionResult>,
    html_diff: Option<String>,
    status: ParagraphStatus,
}

impl Paragraph {
    /// Build a paragraph from a raw line. Returns `None` for blank input.
    pub fn new(raw: &str) -> Option<Self> {
        let text = raw.trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            text: text.to_string(),
            correction: None,
            html_diff: None,
            status: ParagraphStatus::Pending,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_biased(&self) -> bool {
        self.correction.is_some()
    }

    pub fn unbiased_replacement(&self) -> &str {
        self.correction.as_ref().map(|c| c.replacement.as_str()).unwrap_or("")
    }

    pub fn reason_biased(&self) -> &str {
        self.correction.as_ref().map(|c| c.reason.as_str()).unwrap_or("")
    }

    pub fn html_diff(&self) -> &str {
        self.html_diff.as_deref().unwrap_or("")
    }

    pub fn status(&self) -> &ParagraphStatus {
        &self.status
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, ParagraphStatus::Failed { .. })
    }

    /// Classifier said the paragraph is fine as written.
    pub fn mark_unbiased(&mut self) {
        self.correction = None;
        self.html_diff = None;
        self.status = ParagraphStatus::Analyzed;
    }

    pub fn mark_biased(&mut self, correction: CorrectionResult, html_diff: String) {
        self.correction = Some(correction);
        self.html_diff = Some(html_diff);
        self.status = ParagraphStatus::Analyzed;
    }

    pub fn mark_failed(&mut self, stage: PipelineStage, message: impl Into<String>) {
        self.correction = None;
        self.html_diff = None;
        self.status = ParagraphStatus::Failed {
            stage,
            message: message.into(),
        };
    }

    /// Flatten into the record handed to the boundary layer.
    pub fn to_record(&self) -> ParagraphRecord {
        let (status, error) = match &self.status {
            ParagraphStatus::Failed { stage, message } => (
                "failed".to_string(),
                Some(format!("{}: {}", stage.as_str(), message)),
            ),
            ParagraphStatus::Analyzed => ("analyzed".to_string(), None),
            ParagraphStatus::Pending => ("pending".to_string(), None),
        };
        ParagraphRecord {
            text: self.text.clone(),
            is_biased: self.is_biased(),
            unbiased_replacement: self.unbiased_replacement().to_string(),
            reason_biased: self.reason_biased().to_string(),
            html_diff: self.html_diff().to_string(),
            status,
            error,
        }
    }
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classification => "classification",
            Self::Correction => "correction",
            Self::Analysis => "analysis",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParagraphRecord {
    pub text: String,
    pub is_biased: bool,
    pub unbiased_replacement: String,
    pub reason_biased: String,
    pub html_diff: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============ Emotions ============

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    Anger,
    Disgust,
    Fear,
    Joy,
    Neutral,
    Sadness,
    Surprise,
}

impl EmotionLabel {
    pub const ALL: [EmotionLabel; 7] = [
        Self::Anger,
        Self::Disgust,
        Self::Fear,
        Self::Joy,
        Self::Neutral,
        Self::Sadness,
        Self::Surprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anger => "anger",
            Self::Disgust => "disgust",
            Self::Fear => "fear",
            Self::Joy => "joy",
            Self::Neutral => "neutral",
            Self::Sadness => "sadness",
            Self::Surprise => "surprise",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "anger" => Some(Self::Anger),
            "disgust" => Some(Self::Disgust),
            "fear" => Some(Self::Fear),
            "joy" => Some(Self::Joy),
            "neutral" => Some(Self::Neutral),
            "sadness" => Some(Self::Sadness),
            "surprise" => Some(Self::Surprise),
            _ => None,
        }
    }
}

/// Categorical distribution over the seven emotion labels.
/// Deserializing goes through the same validation as `from_scores`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "BTreeMap<String, f64>")]
pub struct EmotionProfile(BTreeMap<EmotionLabel, f64>);

impl TryFrom<BTreeMap<String, f64>> for EmotionProfile {
    type Error = String;

    fn try_from(raw: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        Self::from_scores(raw)
    }
}

impl EmotionProfile {
    /// Validate raw `(label, score)` pairs from the emotion service.
    ///
    /// Unknown labels are skipped, missing labels count as zero and the result is renormalized
    /// so the probabilities sum to 1.0.
    pub fn from_scores<I, S>(scores: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut probs: BTreeMap<EmotionLabel, f64> =
            EmotionLabel::ALL.iter().map(|l| (*l, 0.0)).collect();

        for (label, score) in scores {
            let Some(label) = EmotionLabel::parse(label.as_ref()) else {
                continue;
            };
            if !score.is_finite() || score < 0.0 {
                return Err(format!("invalid probability {} for {}", score, label.as_str()));
            }
            probs.insert(label, score);
        }

        let total: f64 = probs.values().sum();
        if total <= 0.0 {
            return Err("emotion distribution is empty".to_string());
        }
        for p in probs.values_mut() {
            *p /= total;
        }
        Ok(Self(probs))
    }

    pub fn probability(&self, label: EmotionLabel) -> f64 {
        self.0.get(&label).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EmotionLabel, f64)> + '_ {
        self.0.iter().map(|(l, p)| (*l, *p))
    }

    /// Label with the highest probability.
    pub fn dominant(&self) -> EmotionLabel {
        self.iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(l, _)| l)
            .unwrap_or(EmotionLabel::Neutral)
    }
}

// ============ Scores ============

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DramaScore {
    /// Composite index in [1, 100].
    pub drama_index: u8,
    pub emotion_profile: EmotionProfile,
    pub emotional_intensity: f64,
    pub narrative_intensity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArticleBiasScore {
    pub score: u8,
    #[serde(default)]
    pub reasons: Vec<String>,
}

// ============ Article Analysis ============

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BiasStatus {
    /// Every paragraph was analyzed.
    Complete,
    /// Some paragraphs failed; the rest carry results.
    Partial,
    /// Every paragraph failed.
    Failed,
    /// Input had no paragraphs.
    Empty,
}

impl BiasStatus {
    pub fn from_paragraphs(paragraphs: &[Paragraph]) -> Self {
        if paragraphs.is_empty() {
            return Self::Empty;
        }
        let failed = paragraphs.iter().filter(|p| p.is_failed()).count();
        if failed == 0 {
            Self::Complete
        } else if failed == paragraphs.len() {
            Self::Failed
        } else {
            Self::Partial
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleAnalysis {
    pub request_id: String,
    pub paragraphs: Vec<ParagraphRecord>,
    pub bias_status: BiasStatus,
    pub biased_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bias_score: Option<ArticleBiasScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drama: Option<DramaScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drama_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bias_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drama_summary: Option<String>,
    pub latency_ms: i64,
}
