// Drama Scorer
// Composite 1-100 drama index: emotion-model intensity boosted by sensational wording
// - weighted emotional intensity from the emotion classifier, compressed by a concave curve
// - narrative intensity from power-word and absolutist-word density
// - multiplicative blend, capped, mapped onto [1, 100]

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::{DramaScore, EmotionLabel, EmotionProfile};
use crate::services::providers::{call_with_timeout, EmotionClassifier};
use crate::services::text_processor::lexical_words;

use super::AnalysisError;

/// Sensational vocabulary, including common inflections.
const POWER_WORDS: &[&str] = &[
    "crisis", "crises", "collapse", "collapses", "collapsed", "collapsing",
    "destroy", "destroys", "destroyed", "destroying", "destruction",
    "disaster", "disasters", "disastrous", "radical", "radicals", "chaos", "chaotic",
    "catastrophe", "catastrophic", "devastate", "devastated", "devastating",
    "outrage", "outraged", "outrageous", "shocking", "shock", "terrifying", "horrific",
    "explosive", "slam", "slams", "slammed", "threat", "threatens", "attack", "attacks",
    "emergency", "scandal", "unprecedented", "panic", "nightmare", "apocalyptic",
    "corrupt", "corruption", "betrayal", "war", "invasion", "ruin", "ruined", "ruining",
];

/// Absolutist vocabulary.
const ABSOLUTIST_WORDS: &[&str] = &[
    "everything", "nothing", "always", "never", "all", "none", "everyone", "nobody",
    "everybody", "every", "entirely", "totally", "completely", "absolutely", "forever",
    "anyone", "noone", "no-one", "whole",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmotionWeights {
    pub anger: f64,
    pub disgust: f64,
    pub fear: f64,
    pub joy: f64,
    pub neutral: f64,
    pub sadness: f64,
    pub surprise: f64,
}

impl Default for EmotionWeights {
    fn default() -> Self {
        Self {
            anger: 1.2,
            disgust: 1.0,
            fear: 1.4,
            joy: 0.4,
            neutral: 0.0,
            sadness: 1.1,
            surprise: 1.0,
        }
    }
}

impl EmotionWeights {
    pub fn weight(&self, label: EmotionLabel) -> f64 {
        match label {
            EmotionLabel::Anger => self.anger,
            EmotionLabel::Disgust => self.disgust,
            EmotionLabel::Fear => self.fear,
            EmotionLabel::Joy => self.joy,
            EmotionLabel::Neutral => self.neutral,
            EmotionLabel::Sadness => self.sadness,
            EmotionLabel::Surprise => self.surprise,
        }
    }

    pub fn total(&self) -> f64 {
        EmotionLabel::ALL.iter().map(|l| self.weight(*l)).sum()
    }
}

/// Tunable drama-index calibration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DramaConfig {
    pub weights: EmotionWeights,
    /// Concave exponent applied to the weighted intensity (< 1 spreads the low end).
    pub intensity_exponent: f64,
    /// Sub-range the transformed intensity is scaled to before the lexical boost.
    pub emotion_scale: f64,
    /// Ceiling of the blended value; reaching it maps to 100.
    pub blend_ceiling: f64,
    /// Multiplier on the per-word hit density before capping at 1.0.
    pub narrative_scale: f64,
    pub power_word_weight: f64,
    pub absolutist_word_weight: f64,
    pub extra_power_words: Vec<String>,
    pub extra_absolutist_words: Vec<String>,
}

impl Default for DramaConfig {
    fn default() -> Self {
        Self {
            weights: EmotionWeights::default(),
            intensity_exponent: 0.6,
            emotion_scale: 70.0,
            blend_ceiling: 50.0,
            narrative_scale: 4.0,
            power_word_weight: 1.0,
            absolutist_word_weight: 1.0,
            extra_power_words: Vec::new(),
            extra_absolutist_words: Vec::new(),
        }
    }
}

impl DramaConfig {
    /// Reject calibrations that would break the [1, 100] mapping or its monotonicity.
    pub fn validate(&self) -> Result<(), String> {
        let exponent = self.intensity_exponent;
        if !(exponent.is_finite() && exponent > 0.0 && exponent <= 1.0) {
            return Err(format!("intensityExponent must be in (0, 1], got {}", exponent));
        }
        for (name, value) in [
            ("emotionScale", self.emotion_scale),
            ("blendCeiling", self.blend_ceiling),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(format!("{} must be > 0, got {}", name, value));
            }
        }
        for (name, value) in [
            ("narrativeScale", self.narrative_scale),
            ("powerWordWeight", self.power_word_weight),
            ("absolutistWordWeight", self.absolutist_word_weight),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(format!("{} must be >= 0, got {}", name, value));
            }
        }
        for label in EmotionLabel::ALL {
            let w = self.weights.weight(label);
            if !(w.is_finite() && w >= 0.0) {
                return Err(format!("weights.{} must be >= 0, got {}", label.as_str(), w));
            }
        }
        if self.weights.total() <= 0.0 {
            return Err("emotion weights must not all be zero".to_string());
        }
        Ok(())
    }
}

/// Sum of `p[label] * w[label]` divided by the sum of weights, in [0, 1].
pub fn weighted_intensity(profile: &EmotionProfile, weights: &EmotionWeights) -> f64 {
    let total = weights.total();
    if total <= 0.0 {
        return 0.0;
    }
    let drama: f64 = profile
        .iter()
        .map(|(label, p)| p * weights.weight(label))
        .sum();
    (drama / total).clamp(0.0, 1.0)
}

struct Lexicon {
    power: HashSet<String>,
    absolutist: HashSet<String>,
}

impl Lexicon {
    fn from_config(config: &DramaConfig) -> Self {
        let power = POWER_WORDS
            .iter()
            .map(|w| w.to_string())
            .chain(config.extra_power_words.iter().map(|w| w.trim().to_lowercase()))
            .collect();
        let absolutist = ABSOLUTIST_WORDS
            .iter()
            .map(|w| w.to_string())
            .chain(config.extra_absolutist_words.iter().map(|w| w.trim().to_lowercase()))
            .collect();
        Self { power, absolutist }
    }
}

/// Lexical intensity in [0, 1] from power/absolutist word density.
pub fn narrative_intensity(text: &str, config: &DramaConfig) -> f64 {
    let words = lexical_words(text);
    if words.is_empty() {
        return 0.0;
    }
    let lexicon = Lexicon::from_config(config);
    let power_hits = words.iter().filter(|w| lexicon.power.contains(*w)).count();
    let absolutist_hits = words.iter().filter(|w| lexicon.absolutist.contains(*w)).count();

    let weighted_hits = power_hits as f64 * config.power_word_weight
        + absolutist_hits as f64 * config.absolutist_word_weight;
    let density = weighted_hits / words.len() as f64;
    (density * config.narrative_scale).clamp(0.0, 1.0)
}

/// Blend emotional and narrative intensity into the final index.
///
/// Non-decreasing in both inputs; always within [1, 100].
pub fn compose_drama_index(emotional: f64, narrative: f64, config: &DramaConfig) -> u8 {
    let emotional = if emotional.is_finite() { emotional.clamp(0.0, 1.0) } else { 0.0 };
    let narrative = if narrative.is_finite() { narrative.clamp(0.0, 1.0) } else { 0.0 };
    let ceiling = config.blend_ceiling.max(f64::EPSILON);

    let transformed = emotional.powf(config.intensity_exponent);
    let boosted = transformed * config.emotion_scale * (1.0 + narrative);
    let capped = boosted.min(ceiling);

    let index = (capped / ceiling * 100.0).round();
    if !index.is_finite() {
        return 1;
    }
    index.clamp(1.0, 100.0) as u8
}

pub struct DramaScorer {
    emotions: Arc<dyn EmotionClassifier>,
    config: DramaConfig,
    timeout_secs: u64,
}

impl DramaScorer {
    pub fn new(emotions: Arc<dyn EmotionClassifier>, config: DramaConfig, timeout_secs: u64) -> Self {
        Self {
            emotions,
            config,
            timeout_secs,
        }
    }

    pub async fn score(&self, text: &str) -> Result<DramaScore, AnalysisError> {
        if text.trim().is_empty() {
            return Err(AnalysisError::EmptyInput);
        }

        let raw = call_with_timeout(self.timeout_secs, self.emotions.classify_emotions(text)).await?;
        let profile = EmotionProfile::from_scores(raw).map_err(AnalysisError::MalformedProfile)?;

        let emotional = weighted_intensity(&profile, &self.config.weights);
        let narrative = narrative_intensity(text, &self.config);
        let drama_index = compose_drama_index(emotional, narrative, &self.config);

        debug!(
            dominant = profile.dominant().as_str(),
            emotional = emotional,
            narrative = narrative,
            "[DRAMA] signals"
        );
        info!(drama_index = drama_index, "[DRAMA] scored text");

        Ok(DramaScore {
            drama_index,
            emotion_profile: profile,
            emotional_intensity: emotional,
            narrative_intensity: narrative,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::analysis::test_support::FakeEmotions;

    const NEUTRAL_TEXT: &str = "The inflation rate increased by 0.3% in the last quarter.";
    const DRAMATIC_TEXT: &str =
        "The economy is collapsing and families are in crisis as radical policies destroy everything.";

    fn scorer(fake: Arc<FakeEmotions>) -> DramaScorer {
        DramaScorer::new(fake, DramaConfig::default(), 5)
    }

    #[tokio::test]
    async fn test_neutral_text_scores_low() {
        let fake = Arc::new(FakeEmotions::new(&[
            ("neutral", 0.92),
            ("surprise", 0.03),
            ("joy", 0.05),
        ]));
        let score = scorer(fake).score(NEUTRAL_TEXT).await.unwrap();
        assert_eq!(score.narrative_intensity, 0.0);
        assert!(
            (1..=20).contains(&score.drama_index),
            "drama index {}",
            score.drama_index
        );
    }

    #[tokio::test]
    async fn test_angry_sensational_text_scores_high() {
        let fake = Arc::new(FakeEmotions::new(&[
            ("anger", 0.55),
            ("fear", 0.35),
            ("neutral", 0.10),
        ]));
        let score = scorer(fake).score(DRAMATIC_TEXT).await.unwrap();
        assert!(score.narrative_intensity > 0.9);
        assert!(score.drama_index > 70, "drama index {}", score.drama_index);
    }

    #[tokio::test]
    async fn test_lexical_boost_raises_index_for_same_profile() {
        let emotions = [("anger", 0.3), ("neutral", 0.7)];
        let calm = scorer(Arc::new(FakeEmotions::new(&emotions)))
            .score(NEUTRAL_TEXT)
            .await
            .unwrap();
        let loud = scorer(Arc::new(FakeEmotions::new(&emotions)))
            .score(DRAMATIC_TEXT)
            .await
            .unwrap();
        assert_eq!(calm.emotional_intensity, loud.emotional_intensity);
        assert!(loud.drama_index > calm.drama_index);
    }

    #[tokio::test]
    async fn test_empty_input_skips_service() {
        let fake = Arc::new(FakeEmotions::new(&[("neutral", 1.0)]));
        let res = scorer(fake.clone()).score("   \n ").await;
        assert!(matches!(res, Err(AnalysisError::EmptyInput)));
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test]
    async fn test_service_failure_and_malformed_profile() {
        let res = scorer(Arc::new(FakeEmotions::failing())).score("text").await;
        assert!(matches!(res, Err(AnalysisError::Upstream(_))));

        let zeros = Arc::new(FakeEmotions::new(&[("anger", 0.0), ("joy", 0.0)]));
        let res = scorer(zeros).score("text").await;
        assert!(matches!(res, Err(AnalysisError::MalformedProfile(_))));
    }

    #[test]
    fn test_index_always_in_range() {
        let config = DramaConfig::default();
        let mut profiles: Vec<EmotionProfile> = EmotionLabel::ALL
            .iter()
            .map(|l| EmotionProfile::from_scores(vec![(l.as_str(), 1.0)]).unwrap())
            .collect();
        profiles.push(
            EmotionProfile::from_scores(EmotionLabel::ALL.iter().map(|l| (l.as_str(), 1.0 / 7.0)))
                .unwrap(),
        );
        for profile in &profiles {
            let emotional = weighted_intensity(profile, &config.weights);
            assert!((0.0..=1.0).contains(&emotional));
            for narrative in [0.0, 0.25, 0.5, 1.0] {
                let index = compose_drama_index(emotional, narrative, &config);
                assert!((1..=100).contains(&index));
            }
        }
        assert_eq!(compose_drama_index(f64::NAN, 0.0, &config), 1);
        assert_eq!(compose_drama_index(5.0, 5.0, &config), 100);
    }

    #[test]
    fn test_index_monotonic_in_emotional_intensity() {
        let config = DramaConfig::default();
        let mut prev = 0u8;
        for step in 0..=1000 {
            let index = compose_drama_index(step as f64 / 1000.0, 0.0, &config);
            assert!(index >= prev, "index dropped at step {}", step);
            prev = index;
        }
    }

    #[test]
    fn test_narrative_intensity_counts_both_lexicons() {
        let config = DramaConfig::default();
        assert_eq!(narrative_intensity(NEUTRAL_TEXT, &config), 0.0);
        assert_eq!(narrative_intensity("", &config), 0.0);

        // 2 hits in 20 words -> density 0.1 -> 0.4 after scaling
        let text = "chaos ".to_string() + &"word ".repeat(18) + "never";
        assert!((narrative_intensity(&text, &config) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_config_overrides_from_json() {
        let config: DramaConfig = serde_json::from_str(
            r#"{"intensityExponent": 1.0, "weights": {"joy": 0.0}, "extraPowerWords": ["Meltdown"]}"#,
        )
        .unwrap();
        assert_eq!(config.intensity_exponent, 1.0);
        assert_eq!(config.weights.joy, 0.0);
        assert_eq!(config.weights.fear, 1.4);
        assert_eq!(config.blend_ceiling, 50.0);
        assert!(narrative_intensity("total meltdown", &config) > 0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_broken_calibration() {
        assert!(DramaConfig::default().validate().is_ok());

        let bad = [
            r#"{"intensityExponent": -0.5}"#,
            r#"{"intensityExponent": 0.0}"#,
            r#"{"intensityExponent": 1.5}"#,
            r#"{"blendCeiling": 0.0}"#,
            r#"{"emotionScale": -70.0}"#,
            r#"{"narrativeScale": -1.0}"#,
            r#"{"powerWordWeight": -2.0}"#,
            r#"{"weights": {"anger": -1.2}}"#,
            r#"{"weights": {"anger": 0, "disgust": 0, "fear": 0, "joy": 0, "neutral": 0, "sadness": 0, "surprise": 0}}"#,
        ];
        for json in bad {
            let config: DramaConfig = serde_json::from_str(json).unwrap();
            assert!(config.validate().is_err(), "accepted {}", json);
        }

        let linear: DramaConfig = serde_json::from_str(r#"{"intensityExponent": 1.0}"#).unwrap();
        assert!(linear.validate().is_ok());
    }
}
