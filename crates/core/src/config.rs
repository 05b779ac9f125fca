//! Tunable constants for extraction, scoring and recomposition.
//!
//! The defaults reproduce the empirically chosen values the matching rules
//! were calibrated with. Any subset can be overridden from JSON.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Glyphs that mark a line as a bullet when they start it.
pub const DEFAULT_BULLET_GLYPHS: &str = "•·-–*◦▪▫—";

/// Settings for page signature extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Fraction of page height treated as the title zone on slides.
    pub slide_title_zone: f64,
    /// Fraction of page height treated as the title zone on PDF pages.
    pub pdf_title_zone: f64,
    /// Centroids left of this fraction of page width count as a left column.
    pub left_column_split: f64,
    /// Centroids right of this fraction of page width count as a right column.
    pub right_column_split: f64,
    pub bullet_glyphs: String,
    /// Size assumed for title placeholders whose runs inherit their size.
    pub default_title_font_size: f64,
    /// Horizontal offset, in points, after which a PDF line counts as indented.
    pub pdf_indent_threshold: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            slide_title_zone: 0.20,
            pdf_title_zone: 0.25,
            left_column_split: 0.45,
            right_column_split: 0.55,
            bullet_glyphs: DEFAULT_BULLET_GLYPHS.to_string(),
            default_title_font_size: 44.0,
            pdf_indent_threshold: 12.0,
        }
    }
}

impl ExtractionConfig {
    pub fn is_bullet_glyph(&self, c: char) -> bool {
        self.bullet_glyphs.contains(c)
    }
}

/// Most decimal places a recorded score can keep; an `f64` holds no more.
pub const MAX_SCORE_DECIMALS: u32 = 15;

/// Weights and thresholds of the layout scoring function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub title_weight: f64,
    pub title_missing_penalty: f64,
    pub title_unused_bonus: f64,
    pub bullet_weight: f64,
    /// Bullet count at which the bullet term saturates.
    pub bullet_saturation: u32,
    pub bullet_no_body_penalty: f64,
    pub body_available_bonus: f64,
    pub column_weight: f64,
    pub column_mismatch_penalty: f64,
    pub image_weight: f64,
    pub image_no_slot_penalty: f64,
    pub unused_picture_penalty: f64,
    pub table_weight: f64,
    pub overflow_bullet_threshold: u32,
    pub overflow_bullet_penalty: f64,
    pub overflow_coverage_threshold: f64,
    pub overflow_coverage_penalty: f64,
    /// Scores below this floor are flagged `low_fit`.
    pub low_fit_threshold: f64,
    /// Case-insensitive name fragment that marks a fallback layout.
    pub fallback_name_hint: String,
    /// Decimal places kept when a score is recorded.
    pub score_decimals: u32,
    /// Score recorded for a manually swapped layout.
    pub manual_override_score: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            title_weight: 0.35,
            title_missing_penalty: 0.10,
            title_unused_bonus: 0.10,
            bullet_weight: 0.25,
            bullet_saturation: 8,
            bullet_no_body_penalty: 0.10,
            body_available_bonus: 0.15,
            column_weight: 0.20,
            column_mismatch_penalty: 0.05,
            image_weight: 0.15,
            image_no_slot_penalty: 0.05,
            unused_picture_penalty: 0.02,
            table_weight: 0.05,
            overflow_bullet_threshold: 12,
            overflow_bullet_penalty: 0.10,
            overflow_coverage_threshold: 0.7,
            overflow_coverage_penalty: 0.05,
            low_fit_threshold: 0.55,
            fallback_name_hint: "content".to_string(),
            score_decimals: 2,
            manual_override_score: 0.75,
        }
    }
}

impl ScoringConfig {
    /// Round a score to the configured precision.
    pub fn round_score(&self, score: f64) -> f64 {
        let factor = 10f64.powi(self.score_decimals as i32);
        (score * factor).round() / factor
    }
}

/// Settings for content recomposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Characters of body text kept on a page before the rest overflows.
    pub body_char_budget: usize,
    /// Fraction of page height in which the first text block is the title.
    pub title_zone: f64,
    pub continuation_marker: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            body_char_budget: 500,
            title_zone: 0.30,
            continuation_marker: "(continued)".to_string(),
        }
    }
}

/// All tunables of a conversion.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub extraction: ExtractionConfig,
    pub scoring: ScoringConfig,
    pub executor: ExecutorConfig,
}

impl Config {
    /// Parse overrides from JSON; absent fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load overrides from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        let fractions = [
            ("extraction.slide_title_zone", self.extraction.slide_title_zone),
            ("extraction.pdf_title_zone", self.extraction.pdf_title_zone),
            ("extraction.left_column_split", self.extraction.left_column_split),
            ("extraction.right_column_split", self.extraction.right_column_split),
            ("executor.title_zone", self.executor.title_zone),
            ("scoring.low_fit_threshold", self.scoring.low_fit_threshold),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!("{} must be within [0, 1], got {}", name, value)));
            }
        }
        if self.extraction.left_column_split > self.extraction.right_column_split {
            return Err(Error::Config(
                "left_column_split must not exceed right_column_split".to_string(),
            ));
        }
        if self.scoring.bullet_saturation == 0 {
            return Err(Error::Config("bullet_saturation must be positive".to_string()));
        }
        if self.scoring.score_decimals > MAX_SCORE_DECIMALS {
            return Err(Error::Config(format!(
                "score_decimals must be at most {}, got {}",
                MAX_SCORE_DECIMALS, self.scoring.score_decimals
            )));
        }
        if self.executor.body_char_budget == 0 {
            return Err(Error::Config("body_char_budget must be positive".to_string()));
        }
        Ok(())
    }
}
