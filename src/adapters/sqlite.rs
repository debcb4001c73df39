//! SQLite dialect adapter.
//!
//! Introspects through `sqlite_master` and the PRAGMA table-valued
//! functions. SQLite has no per-table size catalog unless the `dbstat`
//! virtual table is compiled in, so size estimation degrades to "Unknown"
//! on stock builds.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::Result;
use crate::adapters::{
    DialectAdapter, NumericStats, RawColumn, RawColumnStats, RawConstraint, RawIndex,
    RawRelationship, dialect_from_url, format_bytes, quote_ident,
};
use crate::error::{DbPulseError, redact_database_url};
use crate::models::{ConstraintKind, Dialect};

/// Adapter over a SQLite connection pool.
#[derive(Debug, Clone)]
pub struct SqliteAdapter {
    pool: SqlitePool,
    database_name: String,
}

impl SqliteAdapter {
    /// Wraps an existing pool; the pool's lifecycle belongs to the caller.
    pub fn new(pool: SqlitePool, database_name: impl Into<String>) -> Self {
        Self {
            pool,
            database_name: database_name.into(),
        }
    }

    /// Establishes a pool from a connection URL and wraps it.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` or `UnsupportedDialect` when the URL
    /// does not target SQLite, and `Connection` when the pool cannot be
    /// established. Error messages carry the redacted URL only.
    pub async fn connect(database_url: &str, database_name: impl Into<String>) -> Result<Self> {
        match dialect_from_url(database_url)? {
            Dialect::Sqlite => {}
            other => {
                return Err(DbPulseError::invalid_configuration(format!(
                    "connection URL targets {}, not SQLite",
                    other
                )));
            }
        }

        let pool = SqlitePool::connect(database_url).await.map_err(|e| {
            DbPulseError::connection_failed(
                format!("could not connect to {}", redact_database_url(database_url)),
                e,
            )
        })?;
        Ok(Self::new(pool, database_name))
    }

    async fn foreign_key_list(&self, table: &str) -> Result<Vec<ForeignKeyRow>> {
        let fk_query = format!("PRAGMA foreign_key_list({})", quote_ident(table)?);
        let rows = sqlx::query(&fk_query)
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
                let target_column: Option<String> = decode(row, "to")?;
                Ok(ForeignKeyRow {
                    id: decode(row, "id")?,
                    source_column: decode(row, "from")?,
                    target_table: decode(row, "table")?,
                    // A NULL "to" references the target's implicit rowid key.
                    target_column: target_column.unwrap_or_else(|| "rowid".to_string()),
                })
            })
            .collect()
    }
}

struct ForeignKeyRow {
    id: i64,
    source_column: String,
    target_table: String,
    target_column: String,
}

fn decode<'r, T>(row: &'r sqlx::sqlite::SqliteRow, column: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column)
        .map_err(|e| DbPulseError::query_failed(format!("failed to decode '{}'", column), e))
}

#[async_trait]
impl DialectAdapter for SqliteAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn database_name(&self) -> &str {
        &self.database_name
    }

    async fn list_entities(&self) -> Result<Vec<String>> {
        let tables_query = r#"
            SELECT name FROM sqlite_master
            WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
            ORDER BY name
        "#;

        let rows = sqlx::query(tables_query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DbPulseError::query_failed("failed to enumerate tables", e))?;

        rows.iter().map(|row| decode(row, "name")).collect()
    }

    async fn describe_columns(&self, table: &str) -> Result<Vec<RawColumn>> {
        let columns_query = format!("PRAGMA table_info({})", quote_ident(table)?);
        let rows = sqlx::query(&columns_query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                DbPulseError::query_failed(format!("failed to read columns of '{}'", table), e)
            })?;

        rows.iter()
            .map(|row| {
                let cid: i64 = decode(row, "cid")?;
                let notnull: i64 = decode(row, "notnull")?;
                let pk: i64 = decode(row, "pk")?;

                Ok(RawColumn {
                    name: decode(row, "name")?,
                    data_type: decode(row, "type")?,
                    is_nullable: notnull == 0,
                    is_primary_key: pk > 0,
                    default_value: decode(row, "dflt_value")?,
                    // SQLite type affinity carries no declared length or
                    // precision.
                    max_length: None,
                    numeric_precision: None,
                    numeric_scale: None,
                    ordinal_position: u32::try_from(cid + 1).unwrap_or(0),
                })
            })
            .collect()
    }

    async fn list_indexes(&self, table: &str) -> Result<Vec<RawIndex>> {
        let list_query = format!("PRAGMA index_list({})", quote_ident(table)?);
        let rows = sqlx::query(&list_query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                DbPulseError::query_failed(format!("failed to read indexes of '{}'", table), e)
            })?;

        let mut indexes = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = decode(row, "name")?;
            let unique: i64 = decode(row, "unique")?;

            let info_query = format!("PRAGMA index_info({})", quote_ident(&name)?);
            let info_rows = sqlx::query(&info_query)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    DbPulseError::query_failed(
                        format!("failed to read columns of index '{}'", name),
                        e,
                    )
                })?;

            let mut columns = Vec::with_capacity(info_rows.len());
            for info in &info_rows {
                // Expression index members have a NULL column name.
                let column: Option<String> = decode(info, "name")?;
                if let Some(column) = column {
                    columns.push(column);
                }
            }

            indexes.push(RawIndex {
                name,
                columns,
                is_unique: unique != 0,
                kind: "btree".to_string(),
            });
        }
        Ok(indexes)
    }

    async fn list_constraints(&self, table: &str) -> Result<Vec<RawConstraint>> {
        let mut constraints = Vec::new();

        let pk_columns: Vec<String> = self
            .describe_columns(table)
            .await?
            .into_iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name)
            .collect();
        if !pk_columns.is_empty() {
            constraints.push(RawConstraint {
                name: format!("pk_{}", table),
                kind: ConstraintKind::PrimaryKey,
                columns: pk_columns,
                referenced_table: None,
                referenced_columns: Vec::new(),
            });
        }

        // Composite foreign keys share an id across rows.
        let foreign_keys = self.foreign_key_list(table).await?;
        let mut seen_ids: Vec<i64> = Vec::new();
        for fk in &foreign_keys {
            if seen_ids.contains(&fk.id) {
                continue;
            }
            seen_ids.push(fk.id);

            let members: Vec<&ForeignKeyRow> =
                foreign_keys.iter().filter(|row| row.id == fk.id).collect();
            constraints.push(RawConstraint {
                name: format!("fk_{}_{}", table, fk.id),
                kind: ConstraintKind::ForeignKey,
                columns: members.iter().map(|m| m.source_column.clone()).collect(),
                referenced_table: Some(fk.target_table.clone()),
                referenced_columns: members.iter().map(|m| m.target_column.clone()).collect(),
            });
        }

        for index in self.list_indexes(table).await? {
            if index.is_unique {
                constraints.push(RawConstraint {
                    name: index.name,
                    kind: ConstraintKind::Unique,
                    columns: index.columns,
                    referenced_table: None,
                    referenced_columns: Vec::new(),
                });
            }
        }

        Ok(constraints)
    }

    async fn list_relationships(&self, table: &str) -> Result<Vec<RawRelationship>> {
        Ok(self
            .foreign_key_list(table)
            .await?
            .into_iter()
            .map(|fk| RawRelationship {
                source_column: fk.source_column,
                target_table: fk.target_table,
                target_column: fk.target_column,
            })
            .collect())
    }

    async fn row_count(&self, table: &str) -> Result<u64> {
        let count_query = format!("SELECT COUNT(*) FROM {}", quote_ident(table)?);
        let count: i64 = sqlx::query_scalar(&count_query)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                DbPulseError::query_failed(format!("failed to count rows of '{}'", table), e)
            })?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn estimate_size(&self, table: &str) -> Result<String> {
        // Requires SQLITE_ENABLE_DBSTAT_VTAB; callers degrade to "Unknown"
        // when the virtual table is absent.
        let size_query = "SELECT COALESCE(SUM(pgsize), 0) AS total_bytes FROM dbstat WHERE name = ?";
        let bytes: i64 = sqlx::query_scalar(size_query)
            .bind(table)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                DbPulseError::metadata_unavailable(
                    format!("failed to estimate size of '{}'", table),
                    e,
                )
            })?;
        Ok(format_bytes(u64::try_from(bytes).unwrap_or(0)))
    }

    async fn column_stats(&self, table: &str, column: &str) -> Result<RawColumnStats> {
        let stats_query = format!(
            "SELECT COUNT(DISTINCT {col}) AS distinct_count, \
             COALESCE(SUM(CASE WHEN {col} IS NULL THEN 1 ELSE 0 END), 0) AS null_count \
             FROM {table}",
            col = quote_ident(column)?,
            table = quote_ident(table)?,
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

        let distinct: i64 = decode(&row, "distinct_count")?;
        let nulls: i64 = decode(&row, "null_count")?;
        Ok(RawColumnStats {
            distinct_count: u64::try_from(distinct).unwrap_or(0),
            null_count: u64::try_from(nulls).unwrap_or(0),
        })
    }

    async fn sample_values(&self, table: &str, column: &str, limit: u32) -> Result<Vec<String>> {
        let sample_query = format!(
            "SELECT DISTINCT CAST({col} AS TEXT) AS value FROM {table} \
             WHERE {col} IS NOT NULL LIMIT ?",
            col = quote_ident(column)?,
            table = quote_ident(table)?,
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
            "SELECT CAST(MIN({col}) AS REAL) AS min_value, \
             CAST(MAX({col}) AS REAL) AS max_value, \
             CAST(AVG({col}) AS REAL) AS avg_value \
             FROM {table} WHERE {col} IS NOT NULL",
            col = quote_ident(column)?,
            table = quote_ident(table)?,
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
