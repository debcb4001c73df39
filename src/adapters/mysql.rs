//! MySQL dialect adapter.
//!
//! Introspects the connection's default schema through `information_schema`.
//! Numeric catalog columns are explicitly CAST so decoding does not depend
//! on the server's data-dictionary column types, which changed across MySQL
//! versions.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use sqlx::{MySqlPool, Row};

use crate::Result;
use crate::adapters::{
    DialectAdapter, NumericStats, RawColumn, RawColumnStats, RawConstraint, RawIndex,
    RawRelationship, dialect_from_url, format_bytes, quote_ident_mysql,
};
use crate::error::{DbPulseError, redact_database_url};
use crate::models::{ConstraintKind, Dialect};

/// Adapter over a MySQL connection pool.
#[derive(Debug, Clone)]
pub struct MySqlAdapter {
    pool: MySqlPool,
    database_name: String,
}

impl MySqlAdapter {
    /// Wraps an existing pool; the pool's lifecycle belongs to the caller.
    pub fn new(pool: MySqlPool, database_name: impl Into<String>) -> Self {
        Self {
            pool,
            database_name: database_name.into(),
        }
    }

    /// Establishes a pool from a connection URL and wraps it.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` or `UnsupportedDialect` when the URL
    /// does not target MySQL, and `Connection` when the pool cannot be
    /// established. Error messages carry the redacted URL only.
    pub async fn connect(database_url: &str, database_name: impl Into<String>) -> Result<Self> {
        match dialect_from_url(database_url)? {
            Dialect::MySql => {}
            other => {
                return Err(DbPulseError::invalid_configuration(format!(
                    "connection URL targets {}, not MySQL",
                    other
                )));
            }
        }

        let pool = MySqlPool::connect(database_url).await.map_err(|e| {
            DbPulseError::connection_failed(
                format!("could not connect to {}", redact_database_url(database_url)),
                e,
            )
        })?;
        Ok(Self::new(pool, database_name))
    }
}

fn decode<'r, T>(row: &'r sqlx::mysql::MySqlRow, column: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::MySql> + sqlx::Type<sqlx::MySql>,
{
    row.try_get(column)
        .map_err(|e| DbPulseError::query_failed(format!("failed to decode '{}'", column), e))
}

#[async_trait]
impl DialectAdapter for MySqlAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn database_name(&self) -> &str {
        &self.database_name
    }

    async fn list_entities(&self) -> Result<Vec<String>> {
        let tables_query = r#"
            SELECT table_name AS table_name
            FROM information_schema.tables
            WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;

        let rows = sqlx::query(tables_query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DbPulseError::query_failed("failed to enumerate tables", e))?;

        rows.iter().map(|row| decode(row, "table_name")).collect()
    }

    async fn describe_columns(&self, table: &str) -> Result<Vec<RawColumn>> {
        let columns_query = r#"
            SELECT
                column_name AS column_name,
                data_type AS data_type,
                is_nullable AS is_nullable,
                column_default AS column_default,
                column_key AS column_key,
                CAST(character_maximum_length AS UNSIGNED) AS max_length,
                CAST(numeric_precision AS UNSIGNED) AS numeric_precision,
                CAST(numeric_scale AS UNSIGNED) AS numeric_scale,
                CAST(ordinal_position AS UNSIGNED) AS ordinal_position
            FROM information_schema.columns
            WHERE table_schema = DATABASE() AND table_name = ?
            ORDER BY ordinal_position
        "#;

        let rows = sqlx::query(columns_query)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                DbPulseError::query_failed(format!("failed to read columns of '{}'", table), e)
            })?;

        rows.iter()
            .map(|row| {
                let is_nullable: String = decode(row, "is_nullable")?;
                let column_key: String = decode(row, "column_key")?;
                let max_length: Option<u64> = decode(row, "max_length")?;
                let precision: Option<u64> = decode(row, "numeric_precision")?;
                let scale: Option<u64> = decode(row, "numeric_scale")?;
                let ordinal: u64 = decode(row, "ordinal_position")?;

                Ok(RawColumn {
                    name: decode(row, "column_name")?,
                    data_type: decode(row, "data_type")?,
                    is_nullable: is_nullable.eq_ignore_ascii_case("YES"),
                    is_primary_key: column_key == "PRI",
                    default_value: decode(row, "column_default")?,
                    max_length: max_length.and_then(|v| u32::try_from(v).ok()),
                    numeric_precision: precision.and_then(|v| u32::try_from(v).ok()),
                    numeric_scale: scale.and_then(|v| u32::try_from(v).ok()),
                    ordinal_position: u32::try_from(ordinal).unwrap_or(0),
                })
            })
            .collect()
    }

    async fn list_indexes(&self, table: &str) -> Result<Vec<RawIndex>> {
        let idx_query = r#"
            SELECT
                index_name AS index_name,
                column_name AS column_name,
                CAST(non_unique AS SIGNED) AS non_unique,
                index_type AS index_type
            FROM information_schema.statistics
            WHERE table_schema = DATABASE() AND table_name = ?
            ORDER BY index_name, seq_in_index
        "#;

        let rows = sqlx::query(idx_query)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                DbPulseError::query_failed(format!("failed to read indexes of '{}'", table), e)
            })?;

        let mut indexes: Vec<RawIndex> = Vec::new();
        for row in &rows {
            let index_name: String = decode(row, "index_name")?;
            let column_name: String = decode(row, "column_name")?;
            match indexes.iter_mut().find(|ix| ix.name == index_name) {
                Some(existing) => existing.columns.push(column_name),
                None => {
                    let non_unique: i64 = decode(row, "non_unique")?;
                    let kind: String = decode(row, "index_type")?;
                    indexes.push(RawIndex {
                        name: index_name,
                        columns: vec![column_name],
                        is_unique: non_unique == 0,
                        kind: kind.to_lowercase(),
                    });
                }
            }
        }
        Ok(indexes)
    }

    async fn list_constraints(&self, table: &str) -> Result<Vec<RawConstraint>> {
        let constraints_query = r#"
            SELECT
                tc.constraint_name AS constraint_name,
                tc.constraint_type AS constraint_type,
                kcu.column_name AS column_name,
                kcu.referenced_table_name AS referenced_table,
                kcu.referenced_column_name AS referenced_column
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
                AND tc.table_name = kcu.table_name
            WHERE tc.table_schema = DATABASE() AND tc.table_name = ?
            ORDER BY tc.constraint_name, kcu.ordinal_position
        "#;

        let rows = sqlx::query(constraints_query)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                DbPulseError::query_failed(
                    format!("failed to read constraints of '{}'", table),
                    e,
                )
            })?;

        let mut constraints: Vec<RawConstraint> = Vec::new();
        for row in &rows {
            let name: String = decode(row, "constraint_name")?;
            let kind_label: String = decode(row, "constraint_type")?;
            let column: String = decode(row, "column_name")?;
            let referenced_table: Option<String> = decode(row, "referenced_table")?;
            let referenced_column: Option<String> = decode(row, "referenced_column")?;

            let kind = match kind_label.as_str() {
                "PRIMARY KEY" => ConstraintKind::PrimaryKey,
                "FOREIGN KEY" => ConstraintKind::ForeignKey,
                "UNIQUE" => ConstraintKind::Unique,
                "CHECK" => ConstraintKind::Check,
                _ => continue,
            };

            match constraints.iter_mut().find(|c| c.name == name) {
                Some(existing) => {
                    existing.columns.push(column);
                    existing.referenced_columns.extend(referenced_column);
                }
                None => constraints.push(RawConstraint {
                    name,
                    kind,
                    columns: vec![column],
                    referenced_table,
                    referenced_columns: referenced_column.into_iter().collect(),
                }),
            }
        }
        Ok(constraints)
    }

    async fn list_relationships(&self, table: &str) -> Result<Vec<RawRelationship>> {
        let fk_query = r#"
            SELECT
                column_name AS column_name,
                referenced_table_name AS referenced_table,
                referenced_column_name AS referenced_column
            FROM information_schema.key_column_usage
            WHERE table_schema = DATABASE()
                AND table_name = ?
                AND referenced_table_name IS NOT NULL
            ORDER BY constraint_name, ordinal_position
        "#;

        let rows = sqlx::query(fk_query)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                DbPulseError::query_failed(
                    format!("failed to read foreign keys of '{}'", table),
                    e,
                )
            })?;

        rows.iter()
            .map(|row| {
                Ok(RawRelationship {
                    source_column: decode(row, "column_name")?,
                    target_table: decode(row, "referenced_table")?,
                    target_column: decode(row, "referenced_column")?,
                })
            })
            .collect()
    }

    async fn row_count(&self, table: &str) -> Result<u64> {
        let count_query = format!("SELECT COUNT(*) FROM {}", quote_ident_mysql(table)?);
        let count: i64 = sqlx::query_scalar(&count_query)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                DbPulseError::query_failed(format!("failed to count rows of '{}'", table), e)
            })?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn estimate_size(&self, table: &str) -> Result<String> {
        let size_query = r#"
            SELECT CAST(COALESCE(data_length, 0) + COALESCE(index_length, 0) AS UNSIGNED)
                AS total_bytes
            FROM information_schema.tables
            WHERE table_schema = DATABASE() AND table_name = ?
        "#;

        let row = sqlx::query(size_query)
            .bind(table)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                DbPulseError::metadata_unavailable(
                    format!("failed to estimate size of '{}'", table),
                    e,
                )
            })?
            .ok_or_else(|| {
                DbPulseError::metadata_missing(format!("table '{}' not found in catalog", table))
            })?;

        let bytes: u64 = decode(&row, "total_bytes")?;
        Ok(format_bytes(bytes))
    }

    async fn last_modified(&self, table: &str) -> Result<Option<DateTime<Utc>>> {
        let update_query = r#"
            SELECT update_time AS update_time
            FROM information_schema.tables
            WHERE table_schema = DATABASE() AND table_name = ?
        "#;

        let row = sqlx::query(update_query)
            .bind(table)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                DbPulseError::metadata_unavailable(
                    format!("failed to read update time of '{}'", table),
                    e,
                )
            })?;

        match row {
            Some(row) => {
                let update_time: Option<NaiveDateTime> = decode(&row, "update_time")?;
                Ok(update_time.map(|dt| Utc.from_utc_datetime(&dt)))
            }
            None => Ok(None),
        }
    }

    async fn is_partitioned(&self, table: &str) -> Result<bool> {
        let partition_query = r#"
            SELECT CAST(COUNT(*) AS UNSIGNED) AS partition_count
            FROM information_schema.partitions
            WHERE table_schema = DATABASE()
                AND table_name = ?
                AND partition_name IS NOT NULL
        "#;

        let row = sqlx::query(partition_query)
            .bind(table)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                DbPulseError::metadata_unavailable(
                    format!("failed to read partitioning of '{}'", table),
                    e,
                )
            })?;

        let partitions: u64 = decode(&row, "partition_count")?;
        Ok(partitions > 0)
    }

    async fn column_stats(&self, table: &str, column: &str) -> Result<RawColumnStats> {
        let stats_query = format!(
            "SELECT CAST(COUNT(DISTINCT {col}) AS UNSIGNED) AS distinct_count, \
             CAST(COALESCE(SUM(CASE WHEN {col} IS NULL THEN 1 ELSE 0 END), 0) AS UNSIGNED) \
             AS null_count FROM {table}",
            col = quote_ident_mysql(column)?,
            table = quote_ident_mysql(table)?,
        );

        let row = sqlx::query(&stats_query)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                DbPulseError::query_failed(
                    format!("failed to read stats of '{}.{}'", table, column),
                    e,
                )
            })?;

        Ok(RawColumnStats {
            distinct_count: decode(&row, "distinct_count")?,
            null_count: decode(&row, "null_count")?,
        })
    }

    async fn sample_values(&self, table: &str, column: &str, limit: u32) -> Result<Vec<String>> {
        let sample_query = format!(
            "SELECT DISTINCT CAST({col} AS CHAR) AS value FROM {table} \
             WHERE {col} IS NOT NULL LIMIT ?",
            col = quote_ident_mysql(column)?,
            table = quote_ident_mysql(table)?,
        );

        let rows = sqlx::query(&sample_query)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                DbPulseError::sample_unavailable(format!(
                    "failed to sample '{}.{}': {}",
                    table, column, e
                ))
            })?;

        rows.iter().map(|row| decode(row, "value")).collect()
    }

    async fn numeric_stats(&self, table: &str, column: &str) -> Result<Option<NumericStats>> {
        let stats_query = format!(
            "SELECT CAST(MIN({col}) AS DOUBLE) AS min_value, \
             CAST(MAX({col}) AS DOUBLE) AS max_value, \
             CAST(AVG({col}) AS DOUBLE) AS avg_value \
             FROM {table} WHERE {col} IS NOT NULL",
            col = quote_ident_mysql(column)?,
            table = quote_ident_mysql(table)?,
        );

        let row = sqlx::query(&stats_query)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                DbPulseError::query_failed(
                    format!("failed to read numeric stats of '{}.{}'", table, column),
                    e,
                )
            })?;

        let min: Option<f64> = decode(&row, "min_value")?;
        let max: Option<f64> = decode(&row, "max_value")?;
        let avg: Option<f64> = decode(&row, "avg_value")?;

        Ok(match (min, max, avg) {
            (Some(min), Some(max), Some(avg)) => Some(NumericStats { min, max, avg }),
            _ => None,
        })
    }
}
