//! Per-column data profiling.
//!
//! For each column the profiler retrieves up to a fixed number of distinct
//! non-null sample values, computes MIN/MAX/AVG for numeric types, runs a
//! best-effort pattern heuristic over string samples, and derives a quality
//! score from the null ratio. Any statistic the backend cannot answer is
//! downgraded to its zero-value default with a warning; profiling never
//! aborts the surrounding table analysis.

use tracing::{debug, warn};

use crate::adapters::{DialectAdapter, RawColumnStats};
use crate::models::{DataProfile, Pattern};

/// Type-name fragments classified as numeric.
const NUMERIC_TYPE_VOCABULARY: &[&str] = &[
    "int", "decimal", "numeric", "float", "double", "real", "serial", "money", "number",
];

/// Type-name fragments classified as string-like (pattern detection applies).
const STRING_TYPE_VOCABULARY: &[&str] = &["char", "text", "string", "clob", "uuid"];

/// Whether a declared/inferred type name is numeric.
pub fn is_numeric_type(data_type: &str) -> bool {
    let lower = data_type.to_lowercase();
    NUMERIC_TYPE_VOCABULARY.iter().any(|v| lower.contains(v))
}

/// Whether a declared/inferred type name is string-like.
pub fn is_string_type(data_type: &str) -> bool {
    let lower = data_type.to_lowercase();
    STRING_TYPE_VOCABULARY.iter().any(|v| lower.contains(v))
}

/// Detects a value pattern over samples, first match wins.
///
/// Samples are inspected in order; the first sample matching one of the
/// heuristics (contains `@` for email, all digits of length >= 10 for
/// phone, `http` prefix for URL) decides the pattern. Samples matching
/// none fall
/// through to the next; when nothing matches, the column is plain text.
/// This is a representative heuristic, not a validator.
pub fn detect_pattern(samples: &[String]) -> Pattern {
    if samples.is_empty() {
        return Pattern::None;
    }
    for sample in samples {
        if sample.contains('@') {
            return Pattern::Email;
        }
        if sample.len() >= 10 && sample.chars().all(|c| c.is_ascii_digit()) {
            return Pattern::Phone;
        }
        if sample.starts_with("http") {
            return Pattern::Url;
        }
    }
    Pattern::Text
}

/// Computes the quality score `1 - null_count / row_count`, clamped to
/// `[0, 1]`. Defined as `1.0` for empty tables (fail-open).
pub fn quality_score(null_count: u64, row_count: u64) -> f64 {
    if row_count == 0 {
        return 1.0;
    }
    (1.0 - null_count as f64 / row_count as f64).clamp(0.0, 1.0)
}

/// Profiles one column of one table.
///
/// Returns the profile together with the measured distinct/null counts.
/// Failed statistics queries degrade to defaults and are logged; the
/// returned profile is always usable.
pub async fn profile_column(
    adapter: &dyn DialectAdapter,
    table: &str,
    column: &str,
    data_type: &str,
    row_count: u64,
    sample_limit: u32,
) -> (DataProfile, RawColumnStats) {
    let stats = match adapter.column_stats(table, column).await {
        Ok(stats) => stats,
        Err(e) => {
            warn!(
                "Column statistics unavailable for {}.{}: {}",
                table, column, e
            );
            RawColumnStats::default()
        }
    };

    // Degradable failures (empty samples, missing catalogs) are routine and
    // logged quietly; anything else is worth a warning.
    let samples = match adapter.sample_values(table, column, sample_limit).await {
        Ok(samples) => samples,
        Err(e) if e.is_degradable() => {
            debug!("No samples for {}.{}: {}", table, column, e);
            Vec::new()
        }
        Err(e) => {
            warn!("Sampling failed for {}.{}: {}", table, column, e);
            Vec::new()
        }
    };

    let numeric = is_numeric_type(data_type);
    let (min, max, avg) = if numeric {
        match adapter.numeric_stats(table, column).await {
            Ok(Some(stats)) => (Some(stats.min), Some(stats.max), Some(stats.avg)),
            Ok(None) => (None, None, None),
            Err(e) => {
                warn!("Numeric profiling failed for {}.{}: {}", table, column, e);
                (None, None, None)
            }
        }
    } else {
        (None, None, None)
    };

    let pattern = if is_string_type(data_type) {
        detect_pattern(&samples)
    } else {
        Pattern::None
    };

    // A column whose null count could not be measured reports 0 nulls and
    // therefore a quality of 1.0, per the fail-open contract.
    let quality = quality_score(stats.null_count, row_count);

    let profile = DataProfile {
        sample_values: samples,
        pattern,
        min,
        max,
        avg,
        quality,
    };

    (profile, stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_type_vocabulary() {
        assert!(is_numeric_type("integer"));
        assert!(is_numeric_type("BIGINT"));
        assert!(is_numeric_type("numeric(10,2)"));
        assert!(is_numeric_type("double precision"));
        assert!(is_numeric_type("smallserial"));
        assert!(!is_numeric_type("text"));
        assert!(!is_numeric_type("timestamp"));
        assert!(!is_numeric_type("boolean"));
    }

    #[test]
    fn test_string_type_vocabulary() {
        assert!(is_string_type("varchar(255)"));
        assert!(is_string_type("TEXT"));
        assert!(is_string_type("character varying"));
        assert!(is_string_type("string"));
        assert!(!is_string_type("integer"));
        assert!(!is_string_type("bytea"));
    }

    #[test]
    fn test_detect_pattern_email() {
        let samples = vec!["a@b.com".to_string(), "c@d.com".to_string()];
        assert_eq!(detect_pattern(&samples), Pattern::Email);
    }

    #[test]
    fn test_detect_pattern_phone() {
        let samples = vec!["5551234567".to_string()];
        assert_eq!(detect_pattern(&samples), Pattern::Phone);
        // Shorter digit runs are not phone numbers.
        assert_eq!(detect_pattern(&["123456789".to_string()]), Pattern::Text);
    }

    #[test]
    fn test_detect_pattern_url() {
        let samples = vec!["https://example.com".to_string()];
        assert_eq!(detect_pattern(&samples), Pattern::Url);
    }

    #[test]
    fn test_detect_pattern_priority_order() {
        // '@' wins over the URL prefix check within a sample.
        let samples = vec!["http://a@b".to_string()];
        assert_eq!(detect_pattern(&samples), Pattern::Email);

        // A later sample may still decide the pattern.
        let samples = vec!["plain".to_string(), "x@y.z".to_string()];
        assert_eq!(detect_pattern(&samples), Pattern::Email);
    }

    #[test]
    fn test_detect_pattern_fallbacks() {
        assert_eq!(detect_pattern(&[]), Pattern::None);
        assert_eq!(detect_pattern(&["hello world".to_string()]), Pattern::Text);
    }

    #[test]
    fn test_quality_score_bounds() {
        assert_eq!(quality_score(0, 100), 1.0);
        assert!((quality_score(30, 100) - 0.7).abs() < f64::EPSILON);
        assert_eq!(quality_score(100, 100), 0.0);
        // Best-effort counts may exceed the row count; the score clamps.
        assert_eq!(quality_score(150, 100), 0.0);
    }

    #[test]
    fn test_quality_score_empty_table_fails_open() {
        assert_eq!(quality_score(0, 0), 1.0);
        assert_eq!(quality_score(10, 0), 1.0);
    }
}
