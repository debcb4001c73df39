//! Rule-based insight detection and aggregate scoring.
//!
//! The engine walks the normalized tables and emits [`DatabaseInsight`]s for
//! performance, data-quality, privacy, and security conditions, plus two
//! aggregate scores: a `[0, 1]` health score (schema/index hygiene) and an
//! unbounded additive complexity score. Name-based detectors use
//! pre-compiled case-insensitive regex vocabularies.

use regex::Regex;

use crate::Result;
use crate::config::AnalysisConfig;
use crate::error::DbPulseError;
use crate::models::{
    Column, DatabaseInsight, Dialect, InsightCategory, Pattern, Severity, Table,
};

/// Column-name fragments that indicate a password column.
const PASSWORD_NAME_VOCABULARY: &[&str] = &["password", "passwd", "pwd", "pass"];

/// Declared lengths below this are too short to hold a modern password hash.
const MIN_HASHED_PASSWORD_LENGTH: u32 = 32;

/// Insight engine with pre-compiled detector vocabularies.
#[derive(Debug)]
pub struct InsightEngine {
    dialect: Dialect,
    large_table_threshold: u64,
    missing_index_threshold: u64,
    min_quality_score: f64,
    pii_patterns: Vec<Regex>,
    sensitive_table_patterns: Vec<Regex>,
}

impl InsightEngine {
    /// Creates an engine for one dialect from validated configuration.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if a vocabulary pattern fails to
    /// compile.
    pub fn new(dialect: Dialect, config: &AnalysisConfig) -> Result<Self> {
        let compile = |patterns: &[String]| -> Result<Vec<Regex>> {
            patterns
                .iter()
                .map(|p| {
                    Regex::new(p).map_err(|e| {
                        DbPulseError::invalid_configuration(format!(
                            "invalid name pattern '{}': {}",
                            p, e
                        ))
                    })
                })
                .collect()
        };

        Ok(Self {
            dialect,
            large_table_threshold: config.large_table_threshold,
            missing_index_threshold: config.missing_index_threshold,
            min_quality_score: config.min_quality_score,
            pii_patterns: compile(&config.pii_name_patterns)?,
            sensitive_table_patterns: compile(&config.sensitive_table_patterns)?,
        })
    }

    /// Runs every detector over the tables, in table order.
    pub fn generate_insights(&self, tables: &[Table]) -> Vec<DatabaseInsight> {
        let mut insights = Vec::new();

        for table in tables {
            self.detect_large_table(table, &mut insights);
            self.detect_missing_indexes(table, &mut insights);
            self.detect_low_quality_columns(table, &mut insights);
            self.detect_pii_columns(table, &mut insights);
            self.detect_plaintext_passwords(table, &mut insights);
            self.detect_unindexed_sensitive_table(table, &mut insights);
        }

        insights
    }

    /// Whether a column looks like PII: its name matches the configured
    /// vocabulary, or its detected value pattern is email/phone.
    pub fn is_potential_pii(&self, column: &Column) -> bool {
        self.pii_patterns.iter().any(|p| p.is_match(&column.name))
            || matches!(column.profile.pattern, Pattern::Email | Pattern::Phone)
    }

    fn entity_noun(&self) -> &'static str {
        if self.dialect.is_document_store() {
            "Collection"
        } else {
            "Table"
        }
    }

    fn detect_large_table(&self, table: &Table, out: &mut Vec<DatabaseInsight>) {
        if table.row_count > self.large_table_threshold {
            out.push(DatabaseInsight {
                category: InsightCategory::Performance,
                severity: Severity::Medium,
                title: format!("Large {} Detected", self.entity_noun()),
                description: format!(
                    "{} '{}' holds {} rows, above the {} row threshold",
                    self.entity_noun(),
                    table.name,
                    table.row_count,
                    self.large_table_threshold
                ),
                suggestion: format!(
                    "Consider partitioning or archiving historical data in '{}'",
                    table.name
                ),
                affected_objects: vec![table.name.clone()],
                metric: table.row_count as f64,
            });
        }
    }

    fn detect_missing_indexes(&self, table: &Table, out: &mut Vec<DatabaseInsight>) {
        if table.row_count > self.missing_index_threshold && table.indexes.len() <= 1 {
            out.push(DatabaseInsight {
                category: InsightCategory::Performance,
                severity: Severity::High,
                title: "Missing Indexes".to_string(),
                description: format!(
                    "{} '{}' has {} rows but only {} index(es)",
                    self.entity_noun(),
                    table.name,
                    table.row_count,
                    table.indexes.len()
                ),
                suggestion: format!(
                    "Add indexes to '{}' covering the most frequent query predicates",
                    table.name
                ),
                affected_objects: vec![table.name.clone()],
                metric: table.indexes.len() as f64,
            });
        }
    }

    fn detect_low_quality_columns(&self, table: &Table, out: &mut Vec<DatabaseInsight>) {
        for column in &table.columns {
            if column.profile.quality < self.min_quality_score {
                out.push(DatabaseInsight {
                    category: InsightCategory::DataQuality,
                    severity: Severity::Medium,
                    title: "Data Quality Degradation".to_string(),
                    description: format!(
                        "Column '{}.{}' has a quality score of {:.2}, below the {:.2} minimum",
                        table.name, column.name, column.profile.quality, self.min_quality_score
                    ),
                    suggestion: format!(
                        "Investigate null values in '{}.{}' and consider a NOT NULL \
                         constraint or backfill",
                        table.name, column.name
                    ),
                    affected_objects: vec![format!("{}.{}", table.name, column.name)],
                    metric: column.profile.quality,
                });
            }
        }
    }

    fn detect_pii_columns(&self, table: &Table, out: &mut Vec<DatabaseInsight>) {
        for column in &table.columns {
            if self.is_potential_pii(column) {
                out.push(DatabaseInsight {
                    category: InsightCategory::Privacy,
                    severity: Severity::High,
                    title: "Potential PII Detected".to_string(),
                    description: format!(
                        "Column '{}.{}' appears to contain personally identifiable \
                         information ({})",
                        table.name, column.name, column.profile.pattern
                    ),
                    suggestion: format!(
                        "Review access controls and consider encrypting or masking \
                         '{}.{}'",
                        table.name, column.name
                    ),
                    affected_objects: vec![format!("{}.{}", table.name, column.name)],
                    metric: 1.0,
                });
            }
        }
    }

    fn detect_plaintext_passwords(&self, table: &Table, out: &mut Vec<DatabaseInsight>) {
        for column in &table.columns {
            let lower = column.name.to_lowercase();
            let name_matches = PASSWORD_NAME_VOCABULARY.iter().any(|v| lower.contains(v));
            // Hashed and salted passwords are materially longer than 32
            // characters; a short declared length implies plain storage.
            let short_length = column
                .max_length
                .map(|len| len > 0 && len < MIN_HASHED_PASSWORD_LENGTH)
                .unwrap_or(false);

            if name_matches && short_length {
                out.push(DatabaseInsight {
                    category: InsightCategory::Security,
                    severity: Severity::Critical,
                    title: "Plain Text Password Storage".to_string(),
                    description: format!(
                        "Column '{}.{}' is declared with max length {}, too short for \
                         a hashed password",
                        table.name,
                        column.name,
                        column.max_length.unwrap_or(0)
                    ),
                    suggestion: format!(
                        "Store only salted password hashes in '{}.{}' (bcrypt, argon2)",
                        table.name, column.name
                    ),
                    affected_objects: vec![format!("{}.{}", table.name, column.name)],
                    metric: f64::from(column.max_length.unwrap_or(0)),
                });
            }
        }
    }

    fn detect_unindexed_sensitive_table(&self, table: &Table, out: &mut Vec<DatabaseInsight>) {
        let sensitive = self
            .sensitive_table_patterns
            .iter()
            .any(|p| p.is_match(&table.name));

        if sensitive && table.indexes.is_empty() {
            out.push(DatabaseInsight {
                category: InsightCategory::Security,
                severity: Severity::High,
                title: "Sensitive Table Without Indexes".to_string(),
                description: format!(
                    "{} '{}' appears to hold sensitive data but has no indexes, \
                     suggesting unaudited full scans",
                    self.entity_noun(),
                    table.name
                ),
                suggestion: format!(
                    "Add an index on the lookup keys of '{}' and review its access \
                     patterns",
                    table.name
                ),
                affected_objects: vec![table.name.clone()],
                metric: 0.0,
            });
        }
    }
}

/// Computes the aggregate health score: mean of per-table scores, each
/// starting at 1.0 and penalized for index shortage (−0.2 when a table over
/// 1,000 rows has at most one index) and unpartitioned bulk (−0.3 when a
/// table over 10,000,000 rows is not partitioned), floored at 0. A report
/// with no tables scores 0.0.
pub fn health_score(tables: &[Table]) -> f64 {
    if tables.is_empty() {
        return 0.0;
    }

    let total: f64 = tables
        .iter()
        .map(|table| {
            let mut score: f64 = 1.0;
            if table.indexes.len() <= 1 && table.row_count > 1_000 {
                score -= 0.2;
            }
            if table.row_count > 10_000_000 && !table.is_partitioned {
                score -= 0.3;
            }
            score.max(0.0)
        })
        .sum();

    total / tables.len() as f64
}

/// Computes the additive complexity score:
/// `0.1 · table_count + Σ(0.05 · column_count + 0.1 · index_count)`.
/// Unbounded and purely additive, not normalized.
pub fn complexity_score(tables: &[Table]) -> f64 {
    let per_table: f64 = tables
        .iter()
        .map(|t| 0.05 * t.columns.len() as f64 + 0.1 * t.indexes.len() as f64)
        .sum();
    0.1 * tables.len() as f64 + per_table
}

/// Builds the recommendation list: one `"Priority: ..."` string per insight
/// of high or critical severity, or a single healthy-database note when
/// there are none.
pub fn recommendations(insights: &[DatabaseInsight]) -> Vec<String> {
    let priority: Vec<String> = insights
        .iter()
        .filter(|i| i.severity >= Severity::High)
        .map(|i| format!("Priority: {}", i.suggestion))
        .collect();

    if priority.is_empty() {
        vec!["Database appears healthy - no critical issues detected".to_string()]
    } else {
        priority
    }
}
