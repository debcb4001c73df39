//! Full-database analysis pipeline.
//!
//! [`DatabaseAnalyzer`] drives one analysis pass: enumerate entities through
//! the dialect adapter, introspect and profile each one concurrently under a
//! bounded worker pool, normalize into [`Table`] values, and run the insight
//! engine over the result. Entity enumeration failure aborts the pass;
//! every per-table enrichment failure degrades to a documented default and a
//! warning so a partial report is still produced.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::Result;
use crate::adapters::DialectAdapter;
use crate::config::AnalysisConfig;
use crate::error::DbPulseError;
use crate::insights::{self, InsightEngine};
use crate::models::{Column, DatabaseReport, DatabaseSummary, Table, UNKNOWN_SIZE};
use crate::normalize::{normalize_column, normalize_constraints, normalize_indexes, normalize_relationships};
use crate::profiler::profile_column;

/// Orchestrates analysis passes over a single database.
pub struct DatabaseAnalyzer {
    adapter: Arc<dyn DialectAdapter>,
    config: AnalysisConfig,
    engine: InsightEngine,
}

impl DatabaseAnalyzer {
    /// Creates an analyzer over a connected adapter.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if the configuration fails validation
    /// or the adapter reports an empty database name.
    pub fn new(adapter: Arc<dyn DialectAdapter>, config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        if adapter.database_name().is_empty() {
            return Err(DbPulseError::invalid_configuration(
                "database name must not be empty",
            ));
        }
        let engine = InsightEngine::new(adapter.dialect(), &config)?;
        Ok(Self {
            adapter,
            config,
            engine,
        })
    }

    /// The configuration this analyzer runs with.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Runs one full analysis pass and assembles a [`DatabaseReport`].
    ///
    /// Tables are analyzed concurrently, at most `max_concurrency` in
    /// flight, and reported in enumeration order regardless of completion
    /// order.
    ///
    /// # Errors
    /// Returns an error only when entity enumeration itself fails; per-table
    /// enrichment failures are degraded into warnings on the report.
    pub async fn analyze(&self) -> Result<DatabaseReport> {
        let started = Instant::now();
        let database_name = self.adapter.database_name().to_string();
        let dialect = self.adapter.dialect();

        info!(database = %database_name, %dialect, "starting analysis pass");

        let entities = self.adapter.list_entities().await?;
        debug!(count = entities.len(), "enumerated entities");

        let mut analyzed: Vec<(usize, Table, Vec<String>)> =
            stream::iter(entities.into_iter().enumerate())
                .map(|(position, name)| async move {
                    let (table, warnings) = self.analyze_table(name).await;
                    (position, table, warnings)
                })
                .buffer_unordered(self.config.max_concurrency)
                .collect()
                .await;
        analyzed.sort_by_key(|(position, _, _)| *position);

        let mut tables = Vec::with_capacity(analyzed.len());
        let mut warnings = Vec::new();
        for (_, table, table_warnings) in analyzed {
            tables.push(table);
            warnings.extend(table_warnings);
        }

        let insights = self.engine.generate_insights(&tables);
        let recommendations = insights::recommendations(&insights);
        let summary = DatabaseSummary {
            total_tables: tables.len(),
            total_columns: tables.iter().map(|t| t.columns.len()).sum(),
            total_indexes: tables.iter().map(|t| t.indexes.len()).sum(),
            total_rows: tables.iter().map(|t| t.row_count).sum(),
            health_score: insights::health_score(&tables),
            complexity_score: insights::complexity_score(&tables),
        };

        let report = DatabaseReport {
            database_name,
            dialect,
            generated_at: chrono::Utc::now(),
            analysis_duration_ms: started.elapsed().as_millis() as u64,
            summary,
            tables,
            insights,
            recommendations,
            warnings,
        };

        info!(
            tables = report.summary.total_tables,
            insights = report.insights.len(),
            warnings = report.warnings.len(),
            duration_ms = report.analysis_duration_ms,
            "analysis pass complete"
        );

        Ok(report)
    }

    /// Analyzes one table, degrading each failed lookup to its default.
    async fn analyze_table(&self, name: String) -> (Table, Vec<String>) {
        let mut warnings = Vec::new();
        let mut table = Table::new(&name);

        table.row_count = match self.adapter.row_count(&name).await {
            Ok(count) => count,
            Err(e) => {
                warn!(table = %name, error = %e, "row count unavailable");
                warnings.push(format!("row count unavailable for '{}': {}", name, e));
                0
            }
        };

        table.columns = self.collect_columns(&name, table.row_count, &mut warnings).await;

        table.indexes = match self.adapter.list_indexes(&name).await {
            Ok(raw) => normalize_indexes(raw),
            Err(e) => {
                warn!(table = %name, error = %e, "index metadata unavailable");
                warnings.push(format!("indexes unavailable for '{}': {}", name, e));
                Vec::new()
            }
        };

        table.constraints = match self.adapter.list_constraints(&name).await {
            Ok(raw) => normalize_constraints(raw),
            Err(e) => {
                warn!(table = %name, error = %e, "constraint metadata unavailable");
                warnings.push(format!("constraints unavailable for '{}': {}", name, e));
                Vec::new()
            }
        };

        table.relationships = match self.adapter.list_relationships(&name).await {
            Ok(raw) => normalize_relationships(raw),
            Err(e) => {
                warn!(table = %name, error = %e, "relationship metadata unavailable");
                warnings.push(format!("relationships unavailable for '{}': {}", name, e));
                Vec::new()
            }
        };

        table.size = match self.adapter.estimate_size(&name).await {
            Ok(size) => size,
            Err(e) => {
                warn!(table = %name, error = %e, "size estimate unavailable");
                warnings.push(format!("size estimate unavailable for '{}': {}", name, e));
                UNKNOWN_SIZE.to_string()
            }
        };

        table.last_modified = match self.adapter.last_modified(&name).await {
            Ok(timestamp) => timestamp,
            Err(e) => {
                warn!(table = %name, error = %e, "modification timestamp unavailable");
                warnings.push(format!("last modified unavailable for '{}': {}", name, e));
                None
            }
        };

        table.is_partitioned = match self.adapter.is_partitioned(&name).await {
            Ok(partitioned) => partitioned,
            Err(e) => {
                warn!(table = %name, error = %e, "partition metadata unavailable");
                warnings.push(format!("partition status unavailable for '{}': {}", name, e));
                false
            }
        };

        (table, warnings)
    }

    async fn collect_columns(
        &self,
        table: &str,
        row_count: u64,
        warnings: &mut Vec<String>,
    ) -> Vec<Column> {
        let raw_columns = match self.adapter.describe_columns(table).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(table = %table, error = %e, "column metadata unavailable");
                warnings.push(format!("columns unavailable for '{}': {}", table, e));
                return Vec::new();
            }
        };

        let mut columns = Vec::with_capacity(raw_columns.len());
        for raw in raw_columns {
            let (profile, stats) = profile_column(
                self.adapter.as_ref(),
                table,
                &raw.name,
                &raw.data_type,
                row_count,
                self.config.profile_sample_limit,
            )
            .await;
            columns.push(normalize_column(raw, stats, profile));
        }
        columns
    }
}
