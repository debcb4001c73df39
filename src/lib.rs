//! Schema and data profiling engine for relational and document databases.
//!
//! dbpulse introspects a live database through a dialect adapter
//! (PostgreSQL, MySQL, SQLite, or MongoDB), normalizes the metadata into
//! one canonical table model, profiles column data (samples, numeric
//! ranges, value patterns, quality scores), and runs rule-based detectors
//! that surface performance, data-quality, privacy, and security insights.
//!
//! # Architecture
//! - One [`adapters::DialectAdapter`] implementation per backend, selected
//!   at construction time; all queries are read-only
//! - [`analyzer::DatabaseAnalyzer`] drives a full pass and assembles a
//!   [`models::DatabaseReport`]; per-table failures degrade to warnings
//! - [`differ::compare`] diffs two reports into a
//!   [`models::ComparisonReport`]
//! - [`monitor::Scheduler`] re-runs analysis on an interval and
//!   [`monitor::AlertEngine`] evaluates threshold alerts against reports

pub mod adapters;
pub mod analyzer;
pub mod config;
pub mod differ;
pub mod error;
pub mod inference;
pub mod insights;
pub mod logging;
pub mod models;
pub mod monitor;
pub mod normalize;
pub mod profiler;

// Re-export commonly used types
pub use analyzer::DatabaseAnalyzer;
pub use monitor::{AlertEngine, Scheduler};
pub use config::AnalysisConfig;
pub use error::{DbPulseError, Result};
pub use models::{
    AlertCondition, AlertEvaluation, ChangeKind, ChangeSummary, Column, ComparisonReport,
    Constraint, ConstraintKind, DataProfile, DatabaseChange, DatabaseInsight, DatabaseReport,
    DatabaseSummary, Dialect, Impact, Index, InsightCategory, MonitoringAlert, Pattern,
    Relationship, RelationshipKind, Severity, Table,
};

#[cfg(feature = "postgresql")]
pub use adapters::postgres::PostgresAdapter;

#[cfg(feature = "mysql")]
pub use adapters::mysql::MySqlAdapter;

#[cfg(feature = "sqlite")]
pub use adapters::sqlite::SqliteAdapter;

#[cfg(feature = "mongodb")]
pub use adapters::document::DocumentStoreAdapter;
