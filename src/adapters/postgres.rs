//! PostgreSQL dialect adapter.
//!
//! Introspects the `public` schema through `information_schema` and the
//! `pg_catalog` views over a caller-supplied connection pool. All queries
//! are read-only; per-table statistics quote identifiers after validation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::Result;
use crate::adapters::{
    DialectAdapter, NumericStats, RawColumn, RawColumnStats, RawConstraint, RawIndex,
    RawRelationship, dialect_from_url, format_bytes, quote_ident,
};
use crate::error::{DbPulseError, redact_database_url};
use crate::models::{ConstraintKind, Dialect};

/// Adapter over a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PostgresAdapter {
    pool: PgPool,
    database_name: String,
}

impl PostgresAdapter {
    /// Wraps an existing pool; the pool's lifecycle belongs to the caller.
    pub fn new(pool: PgPool, database_name: impl Into<String>) -> Self {
        Self {
            pool,
            database_name: database_name.into(),
        }
    }

    /// Establishes a pool from a connection URL and wraps it.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` or `UnsupportedDialect` when the URL
    /// does not target PostgreSQL, and `Connection` when the pool cannot be
    /// established. Error messages carry the redacted URL only.
    pub async fn connect(database_url: &str, database_name: impl Into<String>) -> Result<Self> {
        match dialect_from_url(database_url)? {
            Dialect::PostgreSql => {}
            other => {
                return Err(DbPulseError::invalid_configuration(format!(
                    "connection URL targets {}, not PostgreSQL",
                    other
                )));
            }
        }

        let pool = PgPool::connect(database_url).await.map_err(|e| {
            DbPulseError::connection_failed(
                format!("could not connect to {}", redact_database_url(database_url)),
                e,
            )
        })?;
        Ok(Self::new(pool, database_name))
    }

    async fn primary_key_columns(&self, table: &str) -> Result<Vec<String>> {
        let pk_query = r#"
            SELECT kcu.column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            WHERE tc.table_schema = 'public'
                AND tc.table_name = $1
                AND tc.constraint_type = 'PRIMARY KEY'
            ORDER BY kcu.ordinal_position
        "#;

        let rows = sqlx::query(pk_query)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                DbPulseError::query_failed(
                    format!("failed to read primary key of '{}'", table),
                    e,
                )
            })?;

        rows.iter()
            .map(|row| {
                row.try_get("column_name").map_err(|e| {
                    DbPulseError::query_failed("failed to decode primary key column", e)
                })
            })
            .collect()
    }

    async fn foreign_key_rows(&self, table: &str) -> Result<Vec<ForeignKeyRow>> {
        let fk_query = r#"
            SELECT
                tc.constraint_name,
                kcu.column_name,
                ccu.table_name AS referenced_table,
                ccu.column_name AS referenced_column
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            JOIN information_schema.constraint_column_usage ccu
                ON ccu.constraint_name = tc.constraint_name
                AND ccu.table_schema = tc.table_schema
            WHERE tc.table_schema = 'public'
                AND tc.table_name = $1
                AND tc.constraint_type = 'FOREIGN KEY'
            ORDER BY tc.constraint_name, kcu.ordinal_position
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
                Ok(ForeignKeyRow {
                    constraint_name: decode(row, "constraint_name")?,
                    column_name: decode(row, "column_name")?,
                    referenced_table: decode(row, "referenced_table")?,
                    referenced_column: decode(row, "referenced_column")?,
                })
            })
            .collect()
    }
}

struct ForeignKeyRow {
    constraint_name: String,
    column_name: String,
    referenced_table: String,
    referenced_column: String,
}

fn decode<'r, T>(row: &'r sqlx::postgres::PgRow, column: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column)
        .map_err(|e| DbPulseError::query_failed(format!("failed to decode '{}'", column), e))
}

#[async_trait]
impl DialectAdapter for PostgresAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::PostgreSql
    }

    fn database_name(&self) -> &str {
        &self.database_name
    }

    async fn list_entities(&self) -> Result<Vec<String>> {
        let tables_query = r#"
            SELECT table_name
            FROM information_schema.tables
            WHERE table_schema = 'public' AND table_type = 'BASE TABLE'
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
                column_name,
                data_type,
                is_nullable,
                column_default,
                character_maximum_length,
                numeric_precision,
                numeric_scale,
                ordinal_position
            FROM information_schema.columns
            WHERE table_schema = 'public' AND table_name = $1
            ORDER BY ordinal_position
        "#;

        let rows = sqlx::query(columns_query)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                DbPulseError::query_failed(format!("failed to read columns of '{}'", table), e)
            })?;

        let pk_columns = self.primary_key_columns(table).await.unwrap_or_default();

        rows.iter()
            .map(|row| {
                let name: String = decode(row, "column_name")?;
                let is_nullable: String = decode(row, "is_nullable")?;
                let max_length: Option<i32> = decode(row, "character_maximum_length")?;
                let precision: Option<i32> = decode(row, "numeric_precision")?;
                let scale: Option<i32> = decode(row, "numeric_scale")?;
                let ordinal: i32 = decode(row, "ordinal_position")?;

                Ok(RawColumn {
                    is_primary_key: pk_columns.contains(&name),
                    name,
                    data_type: decode(row, "data_type")?,
                    is_nullable: is_nullable.eq_ignore_ascii_case("YES"),
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
                i.relname AS index_name,
                a.attname AS column_name,
                ix.indisunique AS is_unique,
                am.amname AS kind
            FROM pg_class t
            JOIN pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_index ix ON t.oid = ix.indrelid
            JOIN pg_class i ON i.oid = ix.indexrelid
            JOIN pg_am am ON i.relam = am.oid
            JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey)
            WHERE n.nspname = 'public' AND t.relname = $1
            ORDER BY i.relname, a.attnum
        "#;

        let rows = sqlx::query(idx_query)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                DbPulseError::query_failed(format!("failed to read indexes of '{}'", table), e)
            })?;

        // Multi-column indexes arrive as one row per column; fold them in
        // order, keyed by index name.
        let mut indexes: Vec<RawIndex> = Vec::new();
        for row in &rows {
            let index_name: String = decode(row, "index_name")?;
            let column_name: String = decode(row, "column_name")?;
            match indexes.iter_mut().find(|ix| ix.name == index_name) {
                Some(existing) => existing.columns.push(column_name),
                None => indexes.push(RawIndex {
                    name: index_name,
                    columns: vec![column_name],
                    is_unique: decode(row, "is_unique")?,
                    kind: decode(row, "kind")?,
                }),
            }
        }
        Ok(indexes)
    }

    async fn list_constraints(&self, table: &str) -> Result<Vec<RawConstraint>> {
        let constraints_query = r#"
            SELECT tc.constraint_name, tc.constraint_type, kcu.column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            WHERE tc.table_schema = 'public' AND tc.table_name = $1
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

        let foreign_keys = self.foreign_key_rows(table).await.unwrap_or_default();

        let mut constraints: Vec<RawConstraint> = Vec::new();
        for row in &rows {
            let name: String = decode(row, "constraint_name")?;
            let kind_label: String = decode(row, "constraint_type")?;
            let column: String = decode(row, "column_name")?;

            let kind = match kind_label.as_str() {
                "PRIMARY KEY" => ConstraintKind::PrimaryKey,
                "FOREIGN KEY" => ConstraintKind::ForeignKey,
                "UNIQUE" => ConstraintKind::Unique,
                "CHECK" => ConstraintKind::Check,
                _ => continue,
            };

            match constraints.iter_mut().find(|c| c.name == name) {
                Some(existing) => existing.columns.push(column),
                None => {
                    let fk = foreign_keys.iter().find(|fk| fk.constraint_name == name);
                    constraints.push(RawConstraint {
                        name,
                        kind,
                        columns: vec![column],
                        referenced_table: fk.map(|fk| fk.referenced_table.clone()),
                        referenced_columns: foreign_keys
                            .iter()
                            .filter(|row| {
                                fk.is_some_and(|fk| row.constraint_name == fk.constraint_name)
                            })
                            .map(|row| row.referenced_column.clone())
                            .collect(),
                    });
                }
            }
        }
        Ok(constraints)
    }

    async fn list_relationships(&self, table: &str) -> Result<Vec<RawRelationship>> {
        Ok(self
            .foreign_key_rows(table)
            .await?
            .into_iter()
            .map(|fk| RawRelationship {
                source_column: fk.column_name,
                target_table: fk.referenced_table,
                target_column: fk.referenced_column,
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
        let size_query = "SELECT pg_total_relation_size(quote_ident($1)::regclass)";
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

    async fn last_modified(&self, table: &str) -> Result<Option<DateTime<Utc>>> {
        // pg_stat activity timestamps are the closest observable signal;
        // tables never touched since stat reset report NULL.
        let stat_query = r#"
            SELECT GREATEST(last_vacuum, last_autovacuum, last_analyze, last_autoanalyze)
                AS last_activity
            FROM pg_stat_user_tables
            WHERE schemaname = 'public' AND relname = $1
        "#;

        let row = sqlx::query(stat_query)
            .bind(table)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                DbPulseError::metadata_unavailable(
                    format!("failed to read activity stats of '{}'", table),
                    e,
                )
            })?;

        match row {
            Some(row) => decode(&row, "last_activity"),
            None => Ok(None),
        }
    }

    async fn is_partitioned(&self, table: &str) -> Result<bool> {
        let partition_query = r#"
            SELECT EXISTS (
                SELECT 1
                FROM pg_partitioned_table pt
                JOIN pg_class c ON c.oid = pt.partrelid
                JOIN pg_namespace n ON n.oid = c.relnamespace
                WHERE n.nspname = 'public' AND c.relname = $1
            )
        "#;

        sqlx::query_scalar(partition_query)
            .bind(table)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                DbPulseError::metadata_unavailable(
                    format!("failed to read partitioning of '{}'", table),
                    e,
                )
            })
    }

    async fn column_stats(&self, table: &str, column: &str) -> Result<RawColumnStats> {
        let stats_query = format!(
            "SELECT COUNT(DISTINCT {col}) AS distinct_count, \
             COUNT(*) FILTER (WHERE {col} IS NULL) AS null_count FROM {table}",
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
            "SELECT DISTINCT {col}::text AS value FROM {table} \
             WHERE {col} IS NOT NULL LIMIT $1",
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
            "SELECT MIN({col})::float8 AS min_value, MAX({col})::float8 AS max_value, \
             AVG({col})::float8 AS avg_value FROM {table} WHERE {col} IS NOT NULL",
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
