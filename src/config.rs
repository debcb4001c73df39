//! Analysis configuration.
//!
//! Tunables consumed by the profiling pipeline, the insight engine, and the
//! scheduler. Values normally come from a persisted configuration layer;
//! this module only validates and carries them.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::Result;
use crate::error::DbPulseError;

/// Default column-name vocabulary for PII detection, as case-insensitive
/// regex patterns.
pub const DEFAULT_PII_PATTERNS: &[&str] = &[
    r"(?i)email",
    r"(?i)phone",
    r"(?i)ssn",
    r"(?i)social",
    r"(?i)address",
    r"(?i)name",
    r"(?i)first_name",
    r"(?i)last_name",
    r"(?i)password",
];

/// Default table-name vocabulary for the sensitive-table detector.
pub const DEFAULT_SENSITIVE_TABLE_PATTERNS: &[&str] = &[
    r"(?i)user",
    r"(?i)account",
    r"(?i)payment",
    r"(?i)credit",
    r"(?i)admin",
    r"(?i)password",
];

/// Configuration for a full analysis pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Documents/rows scanned per table when sampling for inference.
    pub sample_size: u32,
    /// Distinct non-null values retained per column profile.
    pub profile_sample_limit: u32,
    /// Row count above which a table is reported as large.
    pub large_table_threshold: u64,
    /// Row count above which a table with at most one index is reported.
    pub missing_index_threshold: u64,
    /// Minimum acceptable column quality score, in `[0, 1]`.
    pub min_quality_score: f64,
    /// Column-name patterns flagged as PII (regex, matched as substrings).
    pub pii_name_patterns: Vec<String>,
    /// Table-name patterns flagged as sensitive (regex).
    pub sensitive_table_patterns: Vec<String>,
    /// Interval between scheduled re-analysis passes.
    pub analysis_interval: Duration,
    /// Maximum concurrently analyzed tables. Keep at or below the
    /// connection pool size.
    pub max_concurrency: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_size: 1000,
            profile_sample_limit: 10,
            large_table_threshold: 1_000_000,
            missing_index_threshold: 10_000,
            min_quality_score: 0.7,
            pii_name_patterns: DEFAULT_PII_PATTERNS.iter().map(|s| s.to_string()).collect(),
            sensitive_table_patterns: DEFAULT_SENSITIVE_TABLE_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            analysis_interval: Duration::from_secs(24 * 60 * 60),
            max_concurrency: 4,
        }
    }
}

impl AnalysisConfig {
    /// Creates a config with default tunables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the sampling size.
    pub fn with_sample_size(mut self, size: u32) -> Self {
        self.sample_size = size;
        self
    }

    /// Builder method to set the large-table row threshold.
    pub fn with_large_table_threshold(mut self, threshold: u64) -> Self {
        self.large_table_threshold = threshold;
        self
    }

    /// Builder method to set the missing-index row threshold.
    pub fn with_missing_index_threshold(mut self, threshold: u64) -> Self {
        self.missing_index_threshold = threshold;
        self
    }

    /// Builder method to set the minimum quality score.
    pub fn with_min_quality_score(mut self, score: f64) -> Self {
        self.min_quality_score = score;
        self
    }

    /// Builder method to set the scheduled analysis interval.
    pub fn with_analysis_interval(mut self, interval: Duration) -> Self {
        self.analysis_interval = interval;
        self
    }

    /// Builder method to set the table worker-pool bound (minimum 1).
    pub fn with_max_concurrency(mut self, concurrency: usize) -> Self {
        self.max_concurrency = concurrency.max(1);
        self
    }

    /// Adds a custom PII column-name pattern.
    pub fn add_pii_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pii_name_patterns.push(pattern.into());
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if the sample size is zero, the quality
    /// minimum is outside `[0, 1]`, the concurrency bound is zero, the
    /// interval is zero, or any vocabulary pattern is not a valid regex.
    pub fn validate(&self) -> Result<()> {
        if self.sample_size == 0 {
            return Err(DbPulseError::invalid_configuration(
                "sample size must be positive",
            ));
        }
        if self.profile_sample_limit == 0 {
            return Err(DbPulseError::invalid_configuration(
                "profile sample limit must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.min_quality_score) {
            return Err(DbPulseError::invalid_configuration(format!(
                "minimum quality score must be in [0, 1], got {}",
                self.min_quality_score
            )));
        }
        if self.max_concurrency == 0 {
            return Err(DbPulseError::invalid_configuration(
                "max concurrency must be at least 1",
            ));
        }
        if self.analysis_interval.is_zero() {
            return Err(DbPulseError::invalid_configuration(
                "analysis interval must be positive",
            ));
        }
        for pattern in self
            .pii_name_patterns
            .iter()
            .chain(&self.sensitive_table_patterns)
        {
            regex::Regex::new(pattern).map_err(|e| {
                DbPulseError::invalid_configuration(format!(
                    "invalid name pattern '{}': {}",
                    pattern, e
                ))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sample_size, 1000);
        assert_eq!(config.profile_sample_limit, 10);
        assert_eq!(config.large_table_threshold, 1_000_000);
        assert_eq!(config.missing_index_threshold, 10_000);
        assert!((config.min_quality_score - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.analysis_interval, Duration::from_secs(86_400));
        assert_eq!(config.max_concurrency, 4);
    }

    #[test]
    fn test_builder_methods() {
        let config = AnalysisConfig::new()
            .with_sample_size(500)
            .with_large_table_threshold(2_000_000)
            .with_min_quality_score(0.9)
            .with_max_concurrency(8)
            .add_pii_pattern(r"(?i)passport");

        assert_eq!(config.sample_size, 500);
        assert_eq!(config.large_table_threshold, 2_000_000);
        assert!((config.min_quality_score - 0.9).abs() < f64::EPSILON);
        assert_eq!(config.max_concurrency, 8);
        assert!(config.pii_name_patterns.contains(&r"(?i)passport".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_clamped_by_builder() {
        let config = AnalysisConfig::new().with_max_concurrency(0);
        assert_eq!(config.max_concurrency, 1);
    }

    #[test]
    fn test_rejects_zero_sample_size() {
        let config = AnalysisConfig::new().with_sample_size(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_quality_minimum() {
        assert!(
            AnalysisConfig::new()
                .with_min_quality_score(1.5)
                .validate()
                .is_err()
        );
        assert!(
            AnalysisConfig::new()
                .with_min_quality_score(-0.1)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_rejects_invalid_pattern() {
        let config = AnalysisConfig::new().add_pii_pattern("(unclosed");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_interval() {
        let config = AnalysisConfig::new().with_analysis_interval(Duration::ZERO);
        assert!(config.validate().is_err());
    }
}
