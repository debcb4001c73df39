//! Periodic re-analysis and threshold-based alerting.
//!
//! [`Scheduler`] owns a single background loop that re-runs the analysis
//! pipeline on a fixed interval and hands each fresh [`DatabaseReport`] to a
//! caller-supplied callback. [`AlertEngine`] evaluates configured alerts
//! against a report, refreshing each alert's trigger state and recording
//! every evaluation in an append-only history keyed by alert id.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::Result;
use crate::analyzer::DatabaseAnalyzer;
use crate::error::DbPulseError;
use crate::models::{
    AlertCondition, AlertEvaluation, DatabaseReport, MonitoringAlert, Severity,
};

struct RunningLoop {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Background scheduler with an {idle, running} lifecycle.
///
/// `start` and `stop` are serialized under one lock; `stop` does not return
/// until the worker loop has exited, so no callback fires after it returns.
pub struct Scheduler {
    analyzer: Arc<DatabaseAnalyzer>,
    state: Mutex<Option<RunningLoop>>,
}

impl Scheduler {
    /// Creates an idle scheduler over an analyzer.
    pub fn new(analyzer: Arc<DatabaseAnalyzer>) -> Self {
        Self {
            analyzer,
            state: Mutex::new(None),
        }
    }

    /// Whether the background loop is currently running.
    pub async fn is_running(&self) -> bool {
        self.state.lock().await.is_some()
    }

    /// Starts the background loop, analyzing every `interval` and passing
    /// each report to `callback`. The first pass runs one full interval
    /// after start. A failed pass is logged and the schedule continues.
    ///
    /// # Errors
    /// Returns `AlreadyRunning` if the loop is active, or
    /// `InvalidConfiguration` for a zero interval.
    pub async fn start<F>(&self, interval: Duration, callback: F) -> Result<()>
    where
        F: Fn(DatabaseReport) + Send + Sync + 'static,
    {
        if interval.is_zero() {
            return Err(DbPulseError::invalid_configuration(
                "analysis interval must be greater than zero",
            ));
        }

        let mut state = self.state.lock().await;
        if state.is_some() {
            return Err(DbPulseError::AlreadyRunning);
        }

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let analyzer = Arc::clone(&self.analyzer);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick of a tokio interval completes immediately;
            // consume it so the first pass lands one interval after start.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        debug!("scheduler loop shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        match analyzer.analyze().await {
                            Ok(report) => callback(report),
                            Err(e) => {
                                error!(error = %e, "scheduled analysis pass failed, skipping");
                            }
                        }
                    }
                }
            }
        });

        *state = Some(RunningLoop { shutdown, handle });
        info!(interval_secs = interval.as_secs(), "scheduler started");
        Ok(())
    }

    /// Stops the background loop and waits for it to exit.
    ///
    /// # Errors
    /// Returns `NotRunning` if the scheduler is idle.
    pub async fn stop(&self) -> Result<()> {
        let running = {
            let mut state = self.state.lock().await;
            state.take().ok_or(DbPulseError::NotRunning)?
        };

        // The receiver may already be gone if the loop panicked; either way
        // the join below observes the loop's exit.
        let _ = running.shutdown.send(true);
        if let Err(e) = running.handle.await {
            warn!(error = %e, "scheduler loop terminated abnormally");
        }

        info!("scheduler stopped");
        Ok(())
    }
}

/// Evaluates threshold alerts against analysis reports.
///
/// Evaluation order over tables and columns is insertion order, and the
/// first match is authoritative per alert. Every evaluation, triggered or
/// not, is appended to the per-alert history.
#[derive(Debug, Default)]
pub struct AlertEngine {
    alerts: Vec<MonitoringAlert>,
    history: HashMap<String, Vec<AlertEvaluation>>,
}

impl AlertEngine {
    /// Creates an engine with no alerts configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine with the two built-in alerts: data quality below
    /// 0.7 and large tables (over 10,000 rows) missing indexes.
    pub fn with_default_alerts() -> Self {
        let mut engine = Self::new();
        engine.alerts.push(MonitoringAlert::new(
            "Data Quality Degradation",
            AlertCondition::QualityBelow,
            0.7,
            Severity::High,
        ));
        engine.alerts.push(MonitoringAlert::new(
            "Missing Indexes",
            AlertCondition::MissingIndexes,
            10_000.0,
            Severity::High,
        ));
        engine
    }

    /// The configured alerts, in insertion order.
    pub fn alerts(&self) -> &[MonitoringAlert] {
        &self.alerts
    }

    /// Past evaluations of one alert, oldest first.
    pub fn history(&self, alert_id: &str) -> &[AlertEvaluation] {
        self.history.get(alert_id).map_or(&[], Vec::as_slice)
    }

    /// Adds an alert.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` for an empty name or a negative
    /// threshold.
    pub fn add_alert(&mut self, alert: MonitoringAlert) -> Result<()> {
        if alert.name.trim().is_empty() {
            return Err(DbPulseError::invalid_configuration(
                "alert name must not be empty",
            ));
        }
        if alert.threshold < 0.0 || !alert.threshold.is_finite() {
            return Err(DbPulseError::invalid_configuration(format!(
                "alert threshold must be a non-negative number, got {}",
                alert.threshold
            )));
        }
        self.alerts.push(alert);
        Ok(())
    }

    /// Removes an alert and its history by id. Returns whether an alert
    /// with that id existed.
    pub fn remove_alert(&mut self, alert_id: &str) -> bool {
        let before = self.alerts.len();
        self.alerts.retain(|a| a.id != alert_id);
        self.history.remove(alert_id);
        self.alerts.len() != before
    }

    /// Evaluates every alert against a report and returns the triggered
    /// evaluations.
    ///
    /// Side effects: each alert's `triggered`/`last_trigger`/`message`
    /// fields are refreshed, and every evaluation is appended to the
    /// history.
    pub fn check_alerts(&mut self, report: &DatabaseReport) -> Vec<AlertEvaluation> {
        let now = Utc::now();
        let mut triggered = Vec::new();

        for alert in &mut self.alerts {
            let message = match alert.condition {
                AlertCondition::QualityBelow => first_degraded_column(report, alert.threshold),
                AlertCondition::MissingIndexes => {
                    first_unindexed_large_table(report, alert.threshold)
                }
            };

            let evaluation = AlertEvaluation {
                alert_id: alert.id.clone(),
                alert_name: alert.name.clone(),
                triggered: message.is_some(),
                message: message.clone().unwrap_or_default(),
                evaluated_at: now,
            };

            if let Some(message) = message {
                warn!(alert = %alert.name, %message, "alert triggered");
                alert.triggered = true;
                alert.last_trigger = Some(now);
                alert.message = message;
                triggered.push(evaluation.clone());
            } else {
                alert.triggered = false;
                alert.message.clear();
            }

            self.history
                .entry(alert.id.clone())
                .or_default()
                .push(evaluation);
        }

        triggered
    }
}

/// First column below the quality threshold, in table/column order.
fn first_degraded_column(report: &DatabaseReport, threshold: f64) -> Option<String> {
    report.tables.iter().find_map(|table| {
        table
            .columns
            .iter()
            .find(|column| column.profile.quality < threshold)
            .map(|column| {
                format!(
                    "Data quality for '{}.{}' is {:.2}, below the {:.2} threshold",
                    table.name, column.name, column.profile.quality, threshold
                )
            })
    })
}

/// First table over the row threshold with at most one index.
fn first_unindexed_large_table(report: &DatabaseReport, threshold: f64) -> Option<String> {
    report
        .tables
        .iter()
        .find(|table| table.row_count as f64 > threshold && table.indexes.len() <= 1)
        .map(|table| {
            format!(
                "Table '{}' has {} rows but only {} index(es)",
                table.name,
                table.row_count,
                table.indexes.len()
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::models::{DataProfile, DatabaseSummary, Dialect, Index, Table};

    fn report(tables: Vec<Table>) -> DatabaseReport {
        DatabaseReport {
            database_name: "inventory".to_string(),
            dialect: Dialect::Sqlite,
            generated_at: Utc::now(),
            analysis_duration_ms: 0,
            summary: DatabaseSummary::default(),
            tables,
            insights: Vec::new(),
            recommendations: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn table_with_quality(name: &str, qualities: &[f64]) -> Table {
        let mut table = Table::new(name);
        table.columns = qualities
            .iter()
            .enumerate()
            .map(|(i, q)| crate::models::Column {
                name: format!("col_{}", i),
                data_type: "text".to_string(),
                is_nullable: true,
                is_primary_key: false,
                default_value: None,
                max_length: None,
                numeric_precision: None,
                numeric_scale: None,
                unique_values: 0,
                null_count: 0,
                profile: DataProfile {
                    quality: *q,
                    ..DataProfile::default()
                },
            })
            .collect();
        table
    }

    #[test]
    fn test_default_alerts() {
        let engine = AlertEngine::with_default_alerts();
        assert_eq!(engine.alerts().len(), 2);
        assert_eq!(engine.alerts()[0].condition, AlertCondition::QualityBelow);
        assert!((engine.alerts()[0].threshold - 0.7).abs() < f64::EPSILON);
        assert_eq!(engine.alerts()[1].condition, AlertCondition::MissingIndexes);
    }

    #[test]
    fn test_add_alert_validation() {
        let mut engine = AlertEngine::new();
        let valid = MonitoringAlert::new("custom", AlertCondition::QualityBelow, 0.9, Severity::Low);
        assert!(engine.add_alert(valid).is_ok());

        let unnamed = MonitoringAlert::new("  ", AlertCondition::QualityBelow, 0.9, Severity::Low);
        assert!(matches!(
            engine.add_alert(unnamed),
            Err(DbPulseError::InvalidConfiguration { .. })
        ));

        let negative =
            MonitoringAlert::new("neg", AlertCondition::MissingIndexes, -1.0, Severity::Low);
        assert!(engine.add_alert(negative).is_err());
    }

    #[test]
    fn test_remove_alert() {
        let mut engine = AlertEngine::with_default_alerts();
        let id = engine.alerts()[0].id.clone();
        assert!(engine.remove_alert(&id));
        assert_eq!(engine.alerts().len(), 1);
        assert!(!engine.remove_alert(&id));
    }

    #[test]
    fn test_quality_alert_first_match_wins() {
        let mut engine = AlertEngine::with_default_alerts();
        let tables = vec![
            table_with_quality("clean", &[0.9, 0.95]),
            table_with_quality("dirty", &[0.8, 0.4, 0.1]),
        ];
        let report = report(tables);

        let triggered = engine.check_alerts(&report);
        assert_eq!(triggered.len(), 1);
        // col_1 (0.4) is the first below threshold; col_2 (0.1) never wins.
        assert!(triggered[0].message.contains("'dirty.col_1'"));

        let alert = &engine.alerts()[0];
        assert!(alert.triggered);
        assert!(alert.last_trigger.is_some());
        assert!(alert.message.contains("dirty.col_1"));
    }

    #[test]
    fn test_missing_index_alert() {
        let mut engine = AlertEngine::with_default_alerts();
        let mut big = Table::new("events");
        big.row_count = 50_000;
        let mut indexed = Table::new("orders");
        indexed.row_count = 50_000;
        indexed.indexes = vec![
            Index {
                name: "a".to_string(),
                columns: vec!["id".to_string()],
                is_unique: true,
                kind: "btree".to_string(),
            },
            Index {
                name: "b".to_string(),
                columns: vec!["ts".to_string()],
                is_unique: false,
                kind: "btree".to_string(),
            },
        ];

        let triggered = engine.check_alerts(&report(vec![indexed, big]));
        assert_eq!(triggered.len(), 1);
        assert!(triggered[0].message.contains("'events'"));
    }

    #[test]
    fn test_alert_state_resets_when_condition_clears() {
        let mut engine = AlertEngine::with_default_alerts();

        let degraded = report(vec![table_with_quality("t", &[0.1])]);
        assert_eq!(engine.check_alerts(&degraded).len(), 1);
        assert!(engine.alerts()[0].triggered);

        let healthy = report(vec![table_with_quality("t", &[0.99])]);
        assert!(engine.check_alerts(&healthy).is_empty());
        assert!(!engine.alerts()[0].triggered);
        assert!(engine.alerts()[0].message.is_empty());
        // Last trigger time is retained as a historical marker.
        assert!(engine.alerts()[0].last_trigger.is_some());
    }

    #[test]
    fn test_history_is_append_only_per_alert() {
        let mut engine = AlertEngine::with_default_alerts();
        let id = engine.alerts()[0].id.clone();

        let degraded = report(vec![table_with_quality("t", &[0.1])]);
        let healthy = report(vec![table_with_quality("t", &[0.99])]);
        engine.check_alerts(&degraded);
        engine.check_alerts(&healthy);
        engine.check_alerts(&degraded);

        let history = engine.history(&id);
        assert_eq!(history.len(), 3);
        assert!(history[0].triggered);
        assert!(!history[1].triggered);
        assert!(history[2].triggered);
    }
}
