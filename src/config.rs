//! Engine configuration loaded from `score-atlas.toml`.
//!
//! Every field has a default, so an empty or missing file yields the
//! stock thresholds: excellent at 80% of the total maximum, good at 70%,
//! qualified at 60%, with 50-point histogram bins.

use std::path::Path;

use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};

use crate::models::{Subject, TOTAL_MAX};

pub const CONFIG_FILE_NAME: &str = "score-atlas.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsConfig {
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub histogram: HistogramConfig,
    #[serde(default)]
    pub scatter: ScatterConfig,
}

/// Score tiers expressed as fractions of [`TOTAL_MAX`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_excellent_ratio")]
    pub excellent_ratio: f64,
    #[serde(default = "default_good_ratio")]
    pub good_ratio: f64,
    #[serde(default = "default_qualified_ratio")]
    pub qualified_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramConfig {
    #[serde(default = "default_bin_width")]
    pub bin_width: f64,
    /// Pins the first bin at or below this score, e.g. 300.
    #[serde(default)]
    pub floor: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterConfig {
    /// Subjects projected next to each point's total.
    #[serde(default = "default_scatter_subjects")]
    pub subjects: Vec<Subject>,
}

fn default_excellent_ratio() -> f64 {
    0.8
}

fn default_good_ratio() -> f64 {
    0.7
}

fn default_qualified_ratio() -> f64 {
    0.6
}

fn default_bin_width() -> f64 {
    50.0
}

fn default_scatter_subjects() -> Vec<Subject> {
    vec![Subject::Math, Subject::English]
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            excellent_ratio: default_excellent_ratio(),
            good_ratio: default_good_ratio(),
            qualified_ratio: default_qualified_ratio(),
        }
    }
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            bin_width: default_bin_width(),
            floor: None,
        }
    }
}

impl Default for ScatterConfig {
    fn default() -> Self {
        Self {
            subjects: default_scatter_subjects(),
        }
    }
}

impl Thresholds {
    pub fn excellent(&self) -> f64 {
        self.excellent_ratio * TOTAL_MAX
    }

    pub fn good(&self) -> f64 {
        self.good_ratio * TOTAL_MAX
    }

    pub fn qualified(&self) -> f64 {
        self.qualified_ratio * TOTAL_MAX
    }
}

impl StatsConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Looks for `score-atlas.toml` from the current directory upwards.
    pub fn discover() -> anyhow::Result<Option<Self>> {
        let mut dir = std::env::current_dir()?;
        loop {
            let candidate = dir.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Self::load(&candidate).map(Some);
            }
            if !dir.pop() {
                return Ok(None);
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let t = &self.thresholds;
        ensure!(
            0.0 < t.qualified_ratio
                && t.qualified_ratio <= t.good_ratio
                && t.good_ratio <= t.excellent_ratio
                && t.excellent_ratio <= 1.0,
            "thresholds must satisfy 0 < qualified <= good <= excellent <= 1"
        );
        ensure!(
            self.histogram.bin_width.is_finite() && self.histogram.bin_width >= 1.0,
            "histogram bin_width must be at least 1"
        );
        if let Some(floor) = self.histogram.floor {
            ensure!(
                (0.0..=TOTAL_MAX).contains(&floor),
                "histogram floor must be within 0-{TOTAL_MAX}"
            );
        }
        Ok(())
    }
}
