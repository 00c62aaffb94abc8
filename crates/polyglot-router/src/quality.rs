//! Quality scoring for a translate-then-sanitize pipeline.
//!
//! [`QualityValidator::validate`] takes the original input, the translation
//! (intermediate), and the sanitized output (final), scores three dimensions
//! on a 0-100 scale, and combines them with configurable weights. It never
//! fails: a dimension that cannot be scored gets 0 and an issue entry.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Sub-score given to a dimension that cannot be computed.
pub const UNSCORABLE: f64 = 0.0;

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "nothing", "none", "nobody", "nor", "neither", "cannot", "without",
];

/// A scored aspect of the pipeline output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityDimension {
    /// Translation vs original.
    TranslationAccuracy,
    /// Residual blocked content in the final text.
    SanitizationEffectiveness,
    /// Meaning carried from translation to final text.
    IntentPreservation,
}

impl fmt::Display for QualityDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TranslationAccuracy => "translation_accuracy",
            Self::SanitizationEffectiveness => "sanitization_effectiveness",
            Self::IntentPreservation => "intent_preservation",
        };
        f.write_str(s)
    }
}

/// Relative weight of each dimension. Normalised by their sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityWeights {
    /// Weight for translation accuracy.
    #[serde(default = "default_translation_weight")]
    pub translation_accuracy: f64,
    /// Weight for sanitization effectiveness.
    #[serde(default = "default_sanitization_weight")]
    pub sanitization_effectiveness: f64,
    /// Weight for intent preservation.
    #[serde(default = "default_intent_weight")]
    pub intent_preservation: f64,
}

fn default_translation_weight() -> f64 {
    0.4
}

fn default_sanitization_weight() -> f64 {
    0.3
}

fn default_intent_weight() -> f64 {
    0.3
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            translation_accuracy: default_translation_weight(),
            sanitization_effectiveness: default_sanitization_weight(),
            intent_preservation: default_intent_weight(),
        }
    }
}

impl QualityWeights {
    fn values(&self) -> [f64; 3] {
        [self.translation_accuracy, self.sanitization_effectiveness, self.intent_preservation]
    }

    fn sum(&self) -> f64 {
        self.values().iter().sum()
    }

    /// Validate the weights.
    ///
    /// # Errors
    /// Returns `ConfigError::Validation` for negative or non-finite weights
    /// or a zero sum.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.values().iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::Validation(
                "quality weights must be finite and non-negative".into(),
            ));
        }
        if self.sum() <= 0.0 {
            return Err(ConfigError::Validation("quality weights must not sum to zero".into()));
        }
        Ok(())
    }
}

fn default_pass_threshold() -> f64 {
    70.0
}

fn default_min_length_ratio() -> f64 {
    0.3
}

fn default_max_length_ratio() -> f64 {
    3.0
}

/// Quality validator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Dimension weights.
    #[serde(default)]
    pub weights: QualityWeights,
    /// Overall score needed to pass.
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: f64,
    /// Terms that must not survive sanitization (case-insensitive).
    #[serde(default)]
    pub blocked_terms: Vec<String>,
    /// Smallest plausible translation/original length ratio.
    #[serde(default = "default_min_length_ratio")]
    pub min_length_ratio: f64,
    /// Largest plausible translation/original length ratio.
    #[serde(default = "default_max_length_ratio")]
    pub max_length_ratio: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            weights: QualityWeights::default(),
            pass_threshold: default_pass_threshold(),
            blocked_terms: Vec::new(),
            min_length_ratio: default_min_length_ratio(),
            max_length_ratio: default_max_length_ratio(),
        }
    }
}

impl QualityConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns `ConfigError::Validation` if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        if !(0.0..=100.0).contains(&self.pass_threshold) {
            return Err(ConfigError::Validation(format!(
                "quality.pass_threshold must be within [0, 100], got {}",
                self.pass_threshold
            )));
        }
        if !(self.min_length_ratio > 0.0 && self.min_length_ratio < self.max_length_ratio) {
            return Err(ConfigError::Validation(
                "quality length ratios must satisfy 0 < min_length_ratio < max_length_ratio".into(),
            ));
        }
        Ok(())
    }
}

/// Per-dimension scores in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScores {
    /// Translation vs original.
    pub translation_accuracy: f64,
    /// Residual blocked content.
    pub sanitization_effectiveness: f64,
    /// Meaning carried into the final text.
    pub intent_preservation: f64,
}

/// A problem found while scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityIssue {
    /// Affected dimension.
    pub dimension: QualityDimension,
    /// What was found.
    pub message: String,
}

/// Result of a validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Per-dimension scores.
    pub scores: QualityScores,
    /// Weighted overall score in `[0, 100]`.
    pub overall: f64,
    /// Problems found, in dimension order.
    pub issues: Vec<QualityIssue>,
    /// `overall >= pass_threshold`.
    pub passed: bool,
}

/// Scores pipeline output.
#[derive(Debug, Clone, Default)]
pub struct QualityValidator {
    config: QualityConfig,
    blocked: Vec<String>,
}

struct Scored {
    score: f64,
    issues: Vec<QualityIssue>,
}

struct ScoreBuilder {
    dimension: QualityDimension,
    score: f64,
    issues: Vec<QualityIssue>,
}

impl ScoreBuilder {
    fn new(dimension: QualityDimension) -> Self {
        Self { dimension, score: 100.0, issues: Vec::new() }
    }

    fn penalize(&mut self, amount: f64, message: impl Into<String>) {
        self.score -= amount;
        self.issues.push(QualityIssue { dimension: self.dimension, message: message.into() });
    }

    fn unscorable(dimension: QualityDimension, message: impl Into<String>) -> Scored {
        Scored {
            score: UNSCORABLE,
            issues: vec![QualityIssue { dimension, message: message.into() }],
        }
    }

    fn finish(self) -> Scored {
        Scored { score: self.score.clamp(0.0, 100.0), issues: self.issues }
    }
}

impl QualityValidator {
    /// Creates a validator.
    pub fn new(config: QualityConfig) -> Self {
        let blocked = config
            .blocked_terms
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { config, blocked }
    }

    /// The active configuration.
    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Scores one pipeline run.
    pub fn validate(&self, original: &str, intermediate: &str, final_text: &str) -> QualityReport {
        let accuracy = self.translation_accuracy(original, intermediate);
        let sanitization = self.sanitization_effectiveness(final_text);
        let intent = Self::intent_preservation(intermediate, final_text);

        let scores = QualityScores {
            translation_accuracy: accuracy.score,
            sanitization_effectiveness: sanitization.score,
            intent_preservation: intent.score,
        };

        let weights = if self.config.weights.validate().is_ok() {
            self.config.weights.clone()
        } else {
            QualityWeights::default()
        };
        let overall = ((weights.translation_accuracy * scores.translation_accuracy
            + weights.sanitization_effectiveness * scores.sanitization_effectiveness
            + weights.intent_preservation * scores.intent_preservation)
            / weights.sum())
        .clamp(0.0, 100.0);

        let mut issues = accuracy.issues;
        issues.extend(sanitization.issues);
        issues.extend(intent.issues);

        QualityReport { scores, overall, issues, passed: overall >= self.config.pass_threshold }
    }

    fn translation_accuracy(&self, original: &str, intermediate: &str) -> Scored {
        let dim = QualityDimension::TranslationAccuracy;
        let original = original.trim();
        let intermediate = intermediate.trim();

        if original.is_empty() {
            return ScoreBuilder::unscorable(dim, "original text is empty");
        }
        if intermediate.is_empty() {
            return ScoreBuilder::unscorable(dim, "translation is empty");
        }

        let mut s = ScoreBuilder::new(dim);
        let has_letters = original.chars().any(char::is_alphabetic);
        if has_letters && original.to_lowercase() == intermediate.to_lowercase() {
            s.penalize(60.0, "translation is identical to the original (untranslated?)");
        }

        let ratio = intermediate.chars().count() as f64 / original.chars().count() as f64;
        if ratio < self.config.min_length_ratio || ratio > self.config.max_length_ratio {
            s.penalize(30.0, format!("implausible length ratio {ratio:.2}"));
        }

        if intermediate.contains('\u{FFFD}') {
            s.penalize(20.0, "translation contains replacement characters");
        }
        s.finish()
    }

    fn sanitization_effectiveness(&self, final_text: &str) -> Scored {
        let dim = QualityDimension::SanitizationEffectiveness;
        if final_text.trim().is_empty() {
            return ScoreBuilder::unscorable(dim, "final text is empty");
        }

        let mut s = ScoreBuilder::new(dim);
        let words = word_set(final_text);
        let lower = final_text.to_lowercase();
        for term in &self.blocked {
            let found =
                if term.contains(' ') { lower.contains(term.as_str()) } else { words.contains(term) };
            if found {
                s.penalize(25.0, format!("blocked term '{term}' survived sanitization"));
            }
        }
        s.finish()
    }

    fn intent_preservation(intermediate: &str, final_text: &str) -> Scored {
        let dim = QualityDimension::IntentPreservation;
        if intermediate.trim().is_empty() || final_text.trim().is_empty() {
            return ScoreBuilder::unscorable(dim, "nothing to compare");
        }

        let source = content_words(intermediate);
        let target = content_words(final_text);
        let (source, target) = if source.is_empty() {
            (word_set(intermediate), word_set(final_text))
        } else {
            (source, target)
        };
        if source.is_empty() {
            return ScoreBuilder::unscorable(dim, "translation has no words to compare");
        }

        let kept = source.intersection(&target).count();
        let overlap = kept as f64 / source.len() as f64;

        let mut s = ScoreBuilder::new(dim);
        if overlap < 1.0 {
            s.penalize(
                (1.0 - overlap) * 100.0,
                format!("only {:.0}% of content words preserved", overlap * 100.0),
            );
        }
        if intermediate.contains('?') && !final_text.contains('?') {
            s.penalize(20.0, "question was turned into a statement");
        }
        if has_negation(intermediate) && !has_negation(final_text) {
            s.penalize(25.0, "negation was lost");
        }
        s.finish()
    }
}

fn word_set(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .map(|w| w.trim_matches('\'').to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

fn content_words(text: &str) -> HashSet<String> {
    word_set(text).into_iter().filter(|w| w.chars().count() >= 3).collect()
}

fn has_negation(text: &str) -> bool {
    word_set(text).iter().any(|w| NEGATIONS.contains(&w.as_str()) || w.ends_with("n't"))
}
