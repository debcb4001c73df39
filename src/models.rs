//! Core data models for normalized schema and quality reports.
//!
//! This module defines the unified structures produced by the analysis
//! pipeline: the canonical schema model ([`Table`], [`Column`], [`Index`],
//! [`Constraint`], [`Relationship`]), the assembled [`DatabaseReport`], the
//! drift model ([`ComparisonReport`]) and the alerting model
//! ([`MonitoringAlert`]). All report structures are value snapshots: once a
//! report is handed to a consumer it is never mutated. The only mutable
//! structure is `MonitoringAlert`, whose trigger state is owned by the alert
//! engine in [`crate::monitor`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Supported database dialects.
///
/// A closed enumeration; every adapter is constructed for exactly one
/// variant. Unknown dialect tags fail with
/// [`UnsupportedDialect`](crate::error::DbPulseError::UnsupportedDialect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    PostgreSql,
    MySql,
    Sqlite,
    MongoDb,
}

impl Dialect {
    /// Whether this dialect is a document store (schemaless, field-frequency
    /// based introspection) rather than a relational engine.
    pub fn is_document_store(self) -> bool {
        matches!(self, Dialect::MongoDb)
    }

    /// Parses a dialect tag as used in persisted configuration.
    ///
    /// # Errors
    /// Returns `UnsupportedDialect` for unrecognized tags.
    pub fn parse(tag: &str) -> crate::Result<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Dialect::PostgreSql),
            "mysql" => Ok(Dialect::MySql),
            "sqlite" => Ok(Dialect::Sqlite),
            "mongodb" | "mongo" => Ok(Dialect::MongoDb),
            _ => Err(crate::error::DbPulseError::unsupported_dialect(tag)),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::PostgreSql => write!(f, "PostgreSQL"),
            Dialect::MySql => write!(f, "MySQL"),
            Dialect::Sqlite => write!(f, "SQLite"),
            Dialect::MongoDb => write!(f, "MongoDB"),
        }
    }
}

/// Sentinel used when a storage size cannot be determined.
pub const UNKNOWN_SIZE: &str = "Unknown";

/// A normalized table (or document-store collection).
///
/// Absent or unreachable measurements take documented defaults (`0` row
/// count, [`UNKNOWN_SIZE`], empty metadata collections) rather than failing
/// the whole table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub row_count: u64,
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
    pub constraints: Vec<Constraint>,
    pub relationships: Vec<Relationship>,
    /// Approximate storage size with unit, e.g. `"12 MB"`, or [`UNKNOWN_SIZE`].
    pub size: String,
    pub last_modified: Option<DateTime<Utc>>,
    /// Whether the table is horizontally partitioned/sharded.
    pub is_partitioned: bool,
}

impl Table {
    /// Creates an empty table with default (sentinel) measurements.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            row_count: 0,
            columns: Vec::new(),
            indexes: Vec::new(),
            constraints: Vec::new(),
            relationships: Vec::new(),
            size: UNKNOWN_SIZE.to_string(),
            last_modified: None,
            is_partitioned: false,
        }
    }
}

/// A normalized column (or document-store field).
///
/// `unique_values` and `null_count` are best-effort: sampling or dialect
/// limitations may produce values that exceed the table row count. They are
/// reported as measured, not corrected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Declared data type, or the inferred value kind for document fields.
    pub data_type: String,
    pub is_nullable: bool,
    pub is_primary_key: bool,
    pub default_value: Option<String>,
    /// Declared maximum length (character types only).
    pub max_length: Option<u32>,
    /// Declared precision (numeric types only).
    pub numeric_precision: Option<u32>,
    /// Declared scale (numeric types only).
    pub numeric_scale: Option<u32>,
    pub unique_values: u64,
    pub null_count: u64,
    pub profile: DataProfile,
}

/// Detected value pattern for string-typed columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pattern {
    Email,
    Phone,
    Url,
    Text,
    /// No samples were available to inspect.
    None,
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pattern::Email => write!(f, "email pattern"),
            Pattern::Phone => write!(f, "phone pattern"),
            Pattern::Url => write!(f, "URL pattern"),
            Pattern::Text => write!(f, "text pattern"),
            Pattern::None => write!(f, "no pattern detected"),
        }
    }
}

/// Statistical profile computed for one column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataProfile {
    /// Up to 10 distinct non-null sample values, stringified.
    pub sample_values: Vec<String>,
    pub pattern: Pattern,
    /// Populated only for numeric columns.
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
    /// Quality score in `[0, 1]`: `1 - null_count / row_count`.
    pub quality: f64,
}

impl Default for DataProfile {
    fn default() -> Self {
        Self {
            sample_values: Vec::new(),
            pattern: Pattern::None,
            min: None,
            max: None,
            avg: None,
            // Fail-open: an unmeasured column is not reported as degraded.
            quality: 1.0,
        }
    }
}

/// A normalized index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
    /// Index kind, e.g. `"btree"`, `"hash"`, `"text"`.
    pub kind: String,
}

/// Constraint kinds recognized across dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintKind {
    PrimaryKey,
    ForeignKey,
    Unique,
    Check,
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstraintKind::PrimaryKey => write!(f, "PRIMARY KEY"),
            ConstraintKind::ForeignKey => write!(f, "FOREIGN KEY"),
            ConstraintKind::Unique => write!(f, "UNIQUE"),
            ConstraintKind::Check => write!(f, "CHECK"),
        }
    }
}

/// A normalized constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub kind: ConstraintKind,
    pub columns: Vec<String>,
    /// Referenced table, foreign keys only.
    pub referenced_table: Option<String>,
    /// Referenced columns, foreign keys only.
    pub referenced_columns: Vec<String>,
}

/// Relationship kinds. Currently only foreign keys are modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipKind {
    ForeignKey,
}

/// A relationship from a source column to a target table/column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
    pub kind: RelationshipKind,
}

/// Aggregate counts and scores for one report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSummary {
    pub total_tables: usize,
    pub total_columns: usize,
    pub total_indexes: usize,
    pub total_rows: u64,
    /// `[0, 1]` schema/index hygiene score (mean over tables).
    pub health_score: f64,
    /// Unbounded additive structural complexity score.
    pub complexity_score: f64,
}

/// Insight categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsightCategory {
    Performance,
    DataQuality,
    Privacy,
    Security,
}

impl std::fmt::Display for InsightCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InsightCategory::Performance => write!(f, "performance"),
            InsightCategory::DataQuality => write!(f, "data_quality"),
            InsightCategory::Privacy => write!(f, "privacy"),
            InsightCategory::Security => write!(f, "security"),
        }
    }
}

/// Insight and alert severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// A detected condition with severity and remediation suggestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseInsight {
    pub category: InsightCategory,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub suggestion: String,
    /// Names of the affected tables/columns.
    pub affected_objects: Vec<String>,
    /// The numeric value that triggered the detector (row count, quality
    /// score, declared length, ...).
    pub metric: f64,
}

/// One full analysis snapshot of a database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseReport {
    pub database_name: String,
    pub dialect: Dialect,
    pub generated_at: DateTime<Utc>,
    pub analysis_duration_ms: u64,
    pub summary: DatabaseSummary,
    pub tables: Vec<Table>,
    pub insights: Vec<DatabaseInsight>,
    pub recommendations: Vec<String>,
    /// Degraded-enrichment warnings collected during analysis.
    pub warnings: Vec<String>,
}

/// Change kinds detected between two reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    TableCount,
    RowCount,
    NewTable,
    RemovedTable,
}

impl ChangeKind {
    /// Whether this change is structural (schema) or volumetric (data).
    pub fn is_schema_change(self) -> bool {
        !matches!(self, ChangeKind::RowCount)
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::TableCount => write!(f, "schema/table_count"),
            ChangeKind::RowCount => write!(f, "data/row_count"),
            ChangeKind::NewTable => write!(f, "schema/new_table"),
            ChangeKind::RemovedTable => write!(f, "schema/removed_table"),
        }
    }
}

/// Impact classification for a detected change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Impact {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Impact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Impact::Low => write!(f, "low"),
            Impact::Medium => write!(f, "medium"),
            Impact::High => write!(f, "high"),
        }
    }
}

/// One detected difference between two analysis snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseChange {
    pub kind: ChangeKind,
    pub impact: Impact,
    /// Affected table name, or the database name for table-count changes.
    pub object: String,
    pub description: String,
}

/// Counts of changes by type and impact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub total_changes: usize,
    pub schema_changes: usize,
    pub data_changes: usize,
    pub high_impact: usize,
    pub medium_impact: usize,
    pub low_impact: usize,
}

/// Structural diff between two reports of the same database over time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub baseline_generated_at: DateTime<Utc>,
    pub current_generated_at: DateTime<Utc>,
    pub changes: Vec<DatabaseChange>,
    pub summary: ChangeSummary,
}

/// Built-in alert conditions evaluated by the alert engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertCondition {
    /// Any column's quality score below the threshold.
    QualityBelow,
    /// Any table with more rows than the threshold and at most one index.
    MissingIndexes,
}

impl std::fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertCondition::QualityBelow => write!(f, "data quality score below threshold"),
            AlertCondition::MissingIndexes => {
                write!(f, "table exceeding row threshold with at most one index")
            }
        }
    }
}

/// A configured alert with mutable trigger state.
///
/// The trigger fields (`triggered`, `last_trigger`, `message`) are refreshed
/// on every evaluation pass by the alert engine; everything else is fixed at
/// creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringAlert {
    pub id: String,
    pub name: String,
    pub condition: AlertCondition,
    pub threshold: f64,
    pub severity: Severity,
    pub triggered: bool,
    pub last_trigger: Option<DateTime<Utc>>,
    pub message: String,
}

impl MonitoringAlert {
    /// Creates a new untriggered alert with a random id.
    pub fn new(
        name: impl Into<String>,
        condition: AlertCondition,
        threshold: f64,
        severity: Severity,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            condition,
            threshold,
            severity,
            triggered: false,
            last_trigger: None,
            message: String::new(),
        }
    }
}

/// The outcome of evaluating one alert against one report.
///
/// Evaluation results are returned to the caller and appended to the alert
/// engine's per-alert history, rather than being observable only through the
/// mutated alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvaluation {
    pub alert_id: String,
    pub alert_name: String,
    pub triggered: bool,
    pub message: String,
    pub evaluated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_parse() {
        assert_eq!(Dialect::parse("postgres").unwrap(), Dialect::PostgreSql);
        assert_eq!(Dialect::parse("PostgreSQL").unwrap(), Dialect::PostgreSql);
        assert_eq!(Dialect::parse("mysql").unwrap(), Dialect::MySql);
        assert_eq!(Dialect::parse("sqlite").unwrap(), Dialect::Sqlite);
        assert_eq!(Dialect::parse("mongodb").unwrap(), Dialect::MongoDb);
        assert!(Dialect::parse("oracle").is_err());
    }

    #[test]
    fn test_dialect_display() {
        assert_eq!(Dialect::PostgreSql.to_string(), "PostgreSQL");
        assert_eq!(Dialect::MongoDb.to_string(), "MongoDB");
        assert!(Dialect::MongoDb.is_document_store());
        assert!(!Dialect::Sqlite.is_document_store());
    }

    #[test]
    fn test_pattern_display() {
        assert_eq!(Pattern::Email.to_string(), "email pattern");
        assert_eq!(Pattern::Phone.to_string(), "phone pattern");
        assert_eq!(Pattern::Url.to_string(), "URL pattern");
        assert_eq!(Pattern::Text.to_string(), "text pattern");
        assert_eq!(Pattern::None.to_string(), "no pattern detected");
    }

    #[test]
    fn test_table_defaults() {
        let table = Table::new("users");
        assert_eq!(table.name, "users");
        assert_eq!(table.row_count, 0);
        assert_eq!(table.size, UNKNOWN_SIZE);
        assert!(table.columns.is_empty());
        assert!(!table.is_partitioned);
        assert!(table.last_modified.is_none());
    }

    #[test]
    fn test_profile_default_fails_open() {
        let profile = DataProfile::default();
        assert_eq!(profile.quality, 1.0);
        assert_eq!(profile.pattern, Pattern::None);
        assert!(profile.min.is_none());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_change_kind_scope() {
        assert!(ChangeKind::TableCount.is_schema_change());
        assert!(ChangeKind::NewTable.is_schema_change());
        assert!(ChangeKind::RemovedTable.is_schema_change());
        assert!(!ChangeKind::RowCount.is_schema_change());
        assert_eq!(ChangeKind::RowCount.to_string(), "data/row_count");
        assert_eq!(ChangeKind::NewTable.to_string(), "schema/new_table");
    }

    #[test]
    fn test_monitoring_alert_new() {
        let alert =
            MonitoringAlert::new("quality", AlertCondition::QualityBelow, 0.7, Severity::High);
        assert!(!alert.triggered);
        assert!(alert.last_trigger.is_none());
        assert!(alert.message.is_empty());
        assert!(!alert.id.is_empty());
    }

    #[test]
    fn test_report_round_trips_through_json() {
        let table = Table::new("t");
        let json = serde_json::to_string(&table).unwrap();
        let back: Table = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "t");
        assert_eq!(back.size, UNKNOWN_SIZE);
    }
}
