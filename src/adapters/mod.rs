//! Dialect adapter trait and raw introspection types.
//!
//! Each supported dialect implements [`DialectAdapter`], an object-safe
//! async trait producing raw introspection rows which the normalizer turns
//! into the canonical model. One concrete adapter exists per [`Dialect`]
//! variant and is selected at construction time; no operation switches on
//! dialect strings at runtime.
//!
//! All adapter operations are read-only. Metadata lookups that a backend
//! cannot answer (e.g. a missing index catalog) return an empty collection
//! or a `MetadataUnavailable` error, which callers degrade to defaults.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::Result;
use crate::models::{ConstraintKind, Dialect};

#[cfg(feature = "postgresql")]
pub mod postgres;

#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "mongodb")]
pub mod document;

/// One raw column row as reported by a dialect's metadata catalog, before
/// normalization and profiling.
#[derive(Debug, Clone)]
pub struct RawColumn {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub is_primary_key: bool,
    pub default_value: Option<String>,
    pub max_length: Option<u32>,
    pub numeric_precision: Option<u32>,
    pub numeric_scale: Option<u32>,
    pub ordinal_position: u32,
}

/// One raw index row.
#[derive(Debug, Clone)]
pub struct RawIndex {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
    pub kind: String,
}

/// One raw constraint row.
#[derive(Debug, Clone)]
pub struct RawConstraint {
    pub name: String,
    pub kind: ConstraintKind,
    pub columns: Vec<String>,
    pub referenced_table: Option<String>,
    pub referenced_columns: Vec<String>,
}

/// One raw relationship (foreign-key edge) row.
#[derive(Debug, Clone)]
pub struct RawRelationship {
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
}

/// Per-column distinct/null counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawColumnStats {
    pub distinct_count: u64,
    pub null_count: u64,
}

/// MIN/MAX/AVG over the non-null values of a numeric column.
#[derive(Debug, Clone, Copy)]
pub struct NumericStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

/// Object-safe introspection capability for one database dialect.
///
/// Connection management belongs to the caller: adapters are constructed
/// over an already-established pool/client and never write to the database.
#[async_trait]
pub trait DialectAdapter: Send + Sync {
    /// The dialect this adapter was constructed for.
    fn dialect(&self) -> Dialect;

    /// Identity of the analyzed database (no credentials).
    fn database_name(&self) -> &str;

    /// Enumerates tables/collections in deterministic (sorted) order.
    ///
    /// # Errors
    /// Enumeration failure is structural and aborts the analysis pass.
    async fn list_entities(&self) -> Result<Vec<String>>;

    /// Describes the columns (or inferred fields) of one table.
    async fn describe_columns(&self, table: &str) -> Result<Vec<RawColumn>>;

    /// Lists the indexes of one table. Backends without an index catalog
    /// return an empty vector.
    async fn list_indexes(&self, table: &str) -> Result<Vec<RawIndex>>;

    /// Lists the constraints of one table.
    async fn list_constraints(&self, table: &str) -> Result<Vec<RawConstraint>>;

    /// Lists outgoing foreign-key relationships of one table.
    async fn list_relationships(&self, table: &str) -> Result<Vec<RawRelationship>>;

    /// Counts the rows/documents of one table.
    async fn row_count(&self, table: &str) -> Result<u64>;

    /// Approximates the storage size of one table as a string with unit.
    async fn estimate_size(&self, table: &str) -> Result<String>;

    /// Last modification timestamp, where the dialect records one.
    async fn last_modified(&self, _table: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(None)
    }

    /// Whether the table is horizontally partitioned or sharded.
    async fn is_partitioned(&self, _table: &str) -> Result<bool> {
        Ok(false)
    }

    /// Distinct and null counts for one column.
    async fn column_stats(&self, table: &str, column: &str) -> Result<RawColumnStats>;

    /// Up to `limit` distinct non-null values of one column, stringified.
    async fn sample_values(&self, table: &str, column: &str, limit: u32) -> Result<Vec<String>>;

    /// MIN/MAX/AVG for one numeric column; `None` when the column holds no
    /// non-null values.
    async fn numeric_stats(&self, table: &str, column: &str) -> Result<Option<NumericStats>>;
}

/// Resolves the dialect a connection URL targets from its scheme.
///
/// Driver-specific scheme suffixes (`mongodb+srv`) are stripped before
/// matching, so every URL the concrete adapters accept resolves here.
///
/// # Errors
/// Returns `InvalidConfiguration` for strings that do not parse as a URL
/// and `UnsupportedDialect` for unrecognized schemes. Error messages carry
/// the redacted URL, never credentials.
pub fn dialect_from_url(database_url: &str) -> Result<Dialect> {
    let parsed = url::Url::parse(database_url).map_err(|e| {
        crate::error::DbPulseError::invalid_configuration(format!(
            "'{}' is not a valid connection URL: {}",
            crate::error::redact_database_url(database_url),
            e
        ))
    })?;
    let scheme = parsed.scheme();
    let scheme = scheme.split('+').next().unwrap_or(scheme);
    Dialect::parse(scheme)
}

/// Validates and double-quotes an SQL identifier.
///
/// Metadata catalogs are queried with bind parameters, but per-table
/// statistics queries must interpolate identifiers; this guard rejects
/// anything that could escape the quoting.
///
/// # Errors
/// Returns `MetadataUnavailable` for identifiers containing quotes,
/// backticks, or control characters.
pub(crate) fn quote_ident(name: &str) -> Result<String> {
    validate_ident(name)?;
    Ok(format!("\"{}\"", name))
}

/// Validates and backtick-quotes a MySQL identifier.
#[cfg(feature = "mysql")]
pub(crate) fn quote_ident_mysql(name: &str) -> Result<String> {
    validate_ident(name)?;
    Ok(format!("`{}`", name))
}

fn validate_ident(name: &str) -> Result<()> {
    if name.is_empty()
        || name
            .chars()
            .any(|c| c == '"' || c == '`' || c == '\'' || c == ';' || c.is_control())
    {
        return Err(crate::error::DbPulseError::metadata_missing(format!(
            "identifier '{}' cannot be safely quoted",
            name
        )));
    }
    Ok(())
}

/// Formats a byte count as a human-readable size string.
pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["bytes", "kB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} {}", bytes, UNITS[0]);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
