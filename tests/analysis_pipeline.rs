//! End-to-end analysis pipeline tests over a scripted adapter.

mod common;

use std::sync::Arc;

use common::{MockAdapter, MockColumn, MockTable};
use dbpulse::{
    AnalysisConfig, DatabaseAnalyzer, DbPulseError, InsightCategory, Pattern, Severity,
};

fn analyzer(adapter: MockAdapter) -> DatabaseAnalyzer {
    DatabaseAnalyzer::new(Arc::new(adapter), AnalysisConfig::default()).unwrap()
}

#[tokio::test]
async fn test_large_underindexed_table_yields_insights_and_recommendations() {
    let adapter = MockAdapter::new("inventory").with_table(
        MockTable::new("users", 2_000_000)
            .with_index("users_pkey", &["id"], true)
            .with_column(MockColumn::new("id", "integer", 1)),
    );

    let report = analyzer(adapter).analyze().await.unwrap();

    assert!(
        report
            .insights
            .iter()
            .any(|i| i.title == "Large Table Detected" && i.severity == Severity::Medium)
    );
    assert!(
        report
            .insights
            .iter()
            .any(|i| i.title == "Missing Indexes" && i.severity == Severity::High)
    );
    assert!(!report.recommendations.is_empty());
    assert!(
        report
            .recommendations
            .iter()
            .any(|r| r.starts_with("Priority:") && r.contains("indexes"))
    );
}

#[tokio::test]
async fn test_email_samples_detected_as_pii_without_name_marker() {
    let adapter = MockAdapter::new("crm").with_table(
        MockTable::new("contacts", 100)
            .with_index("contacts_pkey", &["id"], true)
            .with_index("contacts_created_idx", &["created_at"], false)
            .with_column(
                MockColumn::new("reachable_at", "varchar", 1)
                    .with_samples(&["a@b.com", "c@d.com"])
                    .with_stats(100, 0),
            ),
    );

    let report = analyzer(adapter).analyze().await.unwrap();

    let column = &report.tables[0].columns[0];
    assert_eq!(column.profile.pattern, Pattern::Email);
    assert_eq!(column.profile.pattern.to_string(), "email pattern");

    let privacy = report
        .insights
        .iter()
        .find(|i| i.category == InsightCategory::Privacy)
        .unwrap();
    assert_eq!(privacy.severity, Severity::High);
    assert_eq!(privacy.affected_objects, vec!["contacts.reachable_at"]);
}

#[tokio::test]
async fn test_short_password_column_flagged_long_hash_not() {
    let adapter = MockAdapter::new("auth").with_table(
        MockTable::new("credentials", 500)
            .with_index("credentials_pkey", &["id"], true)
            .with_index("credentials_user_idx", &["user_id"], false)
            .with_column(MockColumn::new("password_hash", "varchar", 1).with_max_length(255))
            .with_column(MockColumn::new("pwd", "varchar", 2).with_max_length(20)),
    );

    let report = analyzer(adapter).analyze().await.unwrap();

    let critical: Vec<_> = report
        .insights
        .iter()
        .filter(|i| i.title == "Plain Text Password Storage")
        .collect();
    assert_eq!(critical.len(), 1);
    assert_eq!(critical[0].severity, Severity::Critical);
    assert_eq!(critical[0].affected_objects, vec!["credentials.pwd"]);
}

#[tokio::test]
async fn test_tables_reported_in_enumeration_order() {
    let adapter = MockAdapter::new("ordering")
        .with_table(MockTable::new("zeta", 1))
        .with_table(MockTable::new("alpha", 2))
        .with_table(MockTable::new("midway", 3));

    let report = analyzer(adapter).analyze().await.unwrap();

    let names: Vec<&str> = report.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["zeta", "alpha", "midway"]);
}

#[tokio::test]
async fn test_size_failure_degrades_to_unknown_with_warning() {
    let adapter = MockAdapter::new("degraded")
        .with_table(MockTable::new("events", 10))
        .failing_size_for("events");

    let report = analyzer(adapter).analyze().await.unwrap();

    assert_eq!(report.tables[0].size, "Unknown");
    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.contains("size estimate unavailable for 'events'"))
    );
}

#[tokio::test]
async fn test_enumeration_failure_aborts_pass() {
    let adapter = MockAdapter::new("offline")
        .with_table(MockTable::new("events", 10))
        .failing_enumerations(1);

    let result = analyzer(adapter).analyze().await;
    assert!(matches!(result, Err(DbPulseError::QueryExecution { .. })));
}

#[tokio::test]
async fn test_partition_failure_degrades_with_warning() {
    let adapter = MockAdapter::new("degraded")
        .with_table(MockTable::new("events", 10))
        .failing_partition_for("events");

    let report = analyzer(adapter).analyze().await.unwrap();

    assert!(!report.tables[0].is_partitioned);
    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.contains("partition status unavailable for 'events'"))
    );
}

#[tokio::test]
async fn test_quality_score_from_null_counts() {
    let adapter = MockAdapter::new("quality").with_table(
        MockTable::new("orders", 200)
            .with_index("orders_pkey", &["id"], true)
            .with_index("orders_ts_idx", &["ts"], false)
            .with_column(
                MockColumn::new("note", "text", 1)
                    .with_samples(&["left at door"])
                    .with_stats(40, 50),
            ),
    );

    let report = analyzer(adapter).analyze().await.unwrap();

    let note = &report.tables[0].columns[0];
    assert!((note.profile.quality - 0.75).abs() < 1e-9);
    assert_eq!(note.null_count, 50);
    assert_eq!(note.unique_values, 40);

    // 0.75 is above the 0.7 default minimum, so no degradation insight.
    assert!(
        !report
            .insights
            .iter()
            .any(|i| i.title == "Data Quality Degradation")
    );
}

#[tokio::test]
async fn test_numeric_profile_only_for_numeric_types() {
    let adapter = MockAdapter::new("metrics").with_table(
        MockTable::new("readings", 50)
            .with_index("readings_pkey", &["id"], true)
            .with_index("readings_ts_idx", &["ts"], false)
            .with_column(
                MockColumn::new("value", "double precision", 1)
                    .with_samples(&["1.5", "2.5"])
                    .with_numeric(1.5, 9.0, 4.2),
            )
            .with_column(
                MockColumn::new("label", "text", 2).with_samples(&["hot", "cold"]),
            ),
    );

    let report = analyzer(adapter).analyze().await.unwrap();

    let value = &report.tables[0].columns[0];
    assert_eq!(value.profile.min, Some(1.5));
    assert_eq!(value.profile.max, Some(9.0));
    assert_eq!(value.profile.avg, Some(4.2));
    // Numeric columns skip pattern detection.
    assert_eq!(value.profile.pattern, Pattern::None);

    let label = &report.tables[0].columns[1];
    assert_eq!(label.profile.min, None);
    assert_eq!(label.profile.pattern, Pattern::Text);
}

#[tokio::test]
async fn test_summary_aggregates() {
    let adapter = MockAdapter::new("sums")
        .with_table(
            MockTable::new("a", 10)
                .with_index("a_pkey", &["id"], true)
                .with_index("a_idx", &["x"], false)
                .with_column(MockColumn::new("id", "integer", 1))
                .with_column(MockColumn::new("x", "integer", 2)),
        )
        .with_table(
            MockTable::new("b", 32)
                .with_index("b_pkey", &["id"], true)
                .with_index("b_idx", &["y"], false)
                .with_column(MockColumn::new("id", "integer", 1)),
        );

    let report = analyzer(adapter).analyze().await.unwrap();

    assert_eq!(report.summary.total_tables, 2);
    assert_eq!(report.summary.total_columns, 3);
    assert_eq!(report.summary.total_indexes, 4);
    assert_eq!(report.summary.total_rows, 42);
    // Small, well-indexed tables are perfectly healthy.
    assert!((report.summary.health_score - 1.0).abs() < 1e-9);
    let expected_complexity = 0.1 * 2.0 + (0.05 * 2.0 + 0.1 * 2.0) + (0.05 + 0.1 * 2.0);
    assert!((report.summary.complexity_score - expected_complexity).abs() < 1e-9);
}

#[tokio::test]
async fn test_empty_database_produces_empty_healthy_report() {
    let report = analyzer(MockAdapter::new("empty")).analyze().await.unwrap();

    assert!(report.tables.is_empty());
    assert_eq!(report.summary.health_score, 0.0);
    assert_eq!(report.recommendations.len(), 1);
    assert!(report.recommendations[0].contains("appears healthy"));
}

#[tokio::test]
async fn test_rejects_empty_database_name() {
    let result = DatabaseAnalyzer::new(
        Arc::new(MockAdapter::new("")),
        AnalysisConfig::default(),
    );
    assert!(result.is_err());
}
