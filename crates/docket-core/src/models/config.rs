//! Configuration structures for the compliance pipeline.

use std::time::Duration;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DocketError, Result};

/// Pattern confidence below which the AI fallback is consulted.
pub const DEFAULT_FALLBACK_THRESHOLD: f32 = 0.5;

/// Upper bound for a single AI fallback call.
pub const DEFAULT_FALLBACK_TIMEOUT_MS: u64 = 5_000;

/// Extraction confidence at which a sync may overwrite a real value.
pub const DEFAULT_AUTO_SYNC_THRESHOLD: f32 = 0.8;

/// Default relative tolerance for weight comparisons (5%).
pub const DEFAULT_WEIGHT_TOLERANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// Main configuration for the docket pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocketConfig {
    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Rule evaluation configuration.
    pub validation: ValidationConfig,

    /// Shipment sync configuration.
    pub sync: SyncConfig,

    /// Batch processing configuration.
    pub batch: BatchConfig,
}

/// Field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Consult the AI fallback (when one is configured).
    pub enable_fallback: bool,

    /// Pattern confidence below which the fallback is consulted (0.0 - 1.0).
    pub fallback_threshold: f32,

    /// Timeout for a single fallback call in milliseconds.
    pub fallback_timeout_ms: u64,

    /// Score container numbers by their ISO 6346 check digit.
    pub verify_check_digit: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            enable_fallback: true,
            fallback_threshold: DEFAULT_FALLBACK_THRESHOLD,
            fallback_timeout_ms: DEFAULT_FALLBACK_TIMEOUT_MS,
            verify_check_digit: true,
        }
    }
}

impl ExtractionConfig {
    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_millis(self.fallback_timeout_ms)
    }
}

/// Rule evaluation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Relative tolerance for weight comparisons across documents.
    pub weight_tolerance: Decimal,

    /// Do not auto-sync while the latest report says REJECT.
    pub block_auto_sync_on_reject: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            weight_tolerance: DEFAULT_WEIGHT_TOLERANCE,
            block_auto_sync_on_reject: true,
        }
    }
}

/// Shipment sync configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Extraction confidence at which a change may overwrite a real value.
    pub auto_sync_threshold: f32,

    /// Apply qualifying previews without operator confirmation.
    pub auto_apply: bool,

    /// Additional regexes recognizing synthetic placeholder values.
    pub extra_placeholder_patterns: Vec<String>,

    /// Actor recorded in the audit log for automatic syncs.
    pub auto_sync_actor: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_sync_threshold: DEFAULT_AUTO_SYNC_THRESHOLD,
            auto_apply: true,
            extra_placeholder_patterns: Vec::new(),
            auto_sync_actor: "system:auto-sync".to_string(),
        }
    }
}

/// Batch processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of documents extracted concurrently.
    pub max_concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_concurrency: 4 }
    }
}

impl DocketConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check value ranges and placeholder patterns.
    pub fn validate(&self) -> Result<()> {
        check_unit("extraction.fallback_threshold", self.extraction.fallback_threshold)?;
        check_unit("sync.auto_sync_threshold", self.sync.auto_sync_threshold)?;

        if self.extraction.fallback_timeout_ms == 0 {
            return Err(DocketError::Config(
                "extraction.fallback_timeout_ms must be positive".to_string(),
            ));
        }
        if self.validation.weight_tolerance.is_sign_negative() {
            return Err(DocketError::Config(
                "validation.weight_tolerance must not be negative".to_string(),
            ));
        }
        if self.batch.max_concurrency == 0 {
            return Err(DocketError::Config(
                "batch.max_concurrency must be at least 1".to_string(),
            ));
        }
        for pattern in &self.sync.extra_placeholder_patterns {
            Regex::new(pattern).map_err(|e| {
                DocketError::Config(format!("invalid placeholder pattern {:?}: {}", pattern, e))
            })?;
        }
        Ok(())
    }
}

fn check_unit(name: &str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(DocketError::Config(format!("{} must be within 0.0..=1.0, got {}", name, value)))
    }
}
