//! Shared in-memory adapter for pipeline tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use dbpulse::Result;
use dbpulse::adapters::{
    DialectAdapter, NumericStats, RawColumn, RawColumnStats, RawConstraint, RawIndex,
    RawRelationship,
};
use dbpulse::error::DbPulseError;
use dbpulse::models::Dialect;

/// One scripted column: its raw metadata plus the statistics the adapter
/// hands back when profiled.
#[derive(Debug, Clone)]
pub struct MockColumn {
    pub raw: RawColumn,
    pub samples: Vec<String>,
    pub stats: RawColumnStats,
    pub numeric: Option<NumericStats>,
}

impl MockColumn {
    pub fn new(name: &str, data_type: &str, ordinal: u32) -> Self {
        Self {
            raw: RawColumn {
                name: name.to_string(),
                data_type: data_type.to_string(),
                is_nullable: true,
                is_primary_key: false,
                default_value: None,
                max_length: None,
                numeric_precision: None,
                numeric_scale: None,
                ordinal_position: ordinal,
            },
            samples: Vec::new(),
            stats: RawColumnStats::default(),
            numeric: None,
        }
    }

    pub fn with_samples(mut self, samples: &[&str]) -> Self {
        self.samples = samples.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_stats(mut self, distinct_count: u64, null_count: u64) -> Self {
        self.stats = RawColumnStats {
            distinct_count,
            null_count,
        };
        self
    }

    pub fn with_numeric(mut self, min: f64, max: f64, avg: f64) -> Self {
        self.numeric = Some(NumericStats { min, max, avg });
        self
    }

    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.raw.max_length = Some(max_length);
        self
    }
}

/// One scripted table.
#[derive(Debug, Clone)]
pub struct MockTable {
    pub name: String,
    pub row_count: u64,
    pub columns: Vec<MockColumn>,
    pub indexes: Vec<RawIndex>,
    pub size: String,
    pub is_partitioned: bool,
}

impl MockTable {
    pub fn new(name: &str, row_count: u64) -> Self {
        Self {
            name: name.to_string(),
            row_count,
            columns: Vec::new(),
            indexes: Vec::new(),
            size: "1.0 MB".to_string(),
            is_partitioned: false,
        }
    }

    pub fn with_column(mut self, column: MockColumn) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_index(mut self, name: &str, columns: &[&str], is_unique: bool) -> Self {
        self.indexes.push(RawIndex {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            is_unique,
            kind: "btree".to_string(),
        });
        self
    }
}

/// Scripted adapter serving canned introspection data.
#[derive(Debug, Default)]
pub struct MockAdapter {
    pub database_name: String,
    pub tables: Vec<MockTable>,
    /// Tables whose size lookup should fail, to exercise degradation.
    pub fail_size_for: Vec<String>,
    /// Tables whose partition lookup should fail.
    pub fail_partition_for: Vec<String>,
    /// How many upcoming `list_entities` calls fail before recovering.
    pub fail_enumerations: AtomicU32,
}

impl MockAdapter {
    pub fn new(database_name: &str) -> Self {
        Self {
            database_name: database_name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_table(mut self, table: MockTable) -> Self {
        self.tables.push(table);
        self
    }

    pub fn failing_size_for(mut self, table: &str) -> Self {
        self.fail_size_for.push(table.to_string());
        self
    }

    pub fn failing_partition_for(mut self, table: &str) -> Self {
        self.fail_partition_for.push(table.to_string());
        self
    }

    pub fn failing_enumerations(self, count: u32) -> Self {
        self.fail_enumerations.store(count, Ordering::SeqCst);
        self
    }

    fn table(&self, name: &str) -> Result<&MockTable> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| DbPulseError::metadata_missing(format!("no such table '{}'", name)))
    }

    fn column(&self, table: &str, column: &str) -> Result<&MockColumn> {
        self.table(table)?
            .columns
            .iter()
            .find(|c| c.raw.name == column)
            .ok_or_else(|| {
                DbPulseError::metadata_missing(format!("no such column '{}.{}'", table, column))
            })
    }
}

#[async_trait]
impl DialectAdapter for MockAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::PostgreSql
    }

    fn database_name(&self) -> &str {
        &self.database_name
    }

    async fn list_entities(&self) -> Result<Vec<String>> {
        let remaining = self.fail_enumerations.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_enumerations.store(remaining - 1, Ordering::SeqCst);
            return Err(DbPulseError::query_failed(
                "failed to enumerate tables",
                std::io::Error::other("catalog offline"),
            ));
        }
        Ok(self.tables.iter().map(|t| t.name.clone()).collect())
    }

    async fn describe_columns(&self, table: &str) -> Result<Vec<RawColumn>> {
        Ok(self
            .table(table)?
            .columns
            .iter()
            .map(|c| c.raw.clone())
            .collect())
    }

    async fn list_indexes(&self, table: &str) -> Result<Vec<RawIndex>> {
        Ok(self.table(table)?.indexes.clone())
    }

    async fn list_constraints(&self, _table: &str) -> Result<Vec<RawConstraint>> {
        Ok(Vec::new())
    }

    async fn list_relationships(&self, _table: &str) -> Result<Vec<RawRelationship>> {
        Ok(Vec::new())
    }

    async fn row_count(&self, table: &str) -> Result<u64> {
        Ok(self.table(table)?.row_count)
    }

    async fn estimate_size(&self, table: &str) -> Result<String> {
        if self.fail_size_for.iter().any(|t| t == table) {
            return Err(DbPulseError::metadata_missing(format!(
                "size catalog unavailable for '{}'",
                table
            )));
        }
        Ok(self.table(table)?.size.clone())
    }

    async fn is_partitioned(&self, table: &str) -> Result<bool> {
        if self.fail_partition_for.iter().any(|t| t == table) {
            return Err(DbPulseError::metadata_missing(format!(
                "partition catalog unavailable for '{}'",
                table
            )));
        }
        Ok(self.table(table)?.is_partitioned)
    }

    async fn column_stats(&self, table: &str, column: &str) -> Result<RawColumnStats> {
        Ok(self.column(table, column)?.stats.clone())
    }

    async fn sample_values(&self, table: &str, column: &str, limit: u32) -> Result<Vec<String>> {
        let mut samples = self.column(table, column)?.samples.clone();
        samples.truncate(limit as usize);
        Ok(samples)
    }

    async fn numeric_stats(&self, table: &str, column: &str) -> Result<Option<NumericStats>> {
        Ok(self.column(table, column)?.numeric.clone())
    }
}
