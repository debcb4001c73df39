//! Structural diff between two analysis snapshots.
//!
//! Compares a baseline [`DatabaseReport`] against a newer one and emits an
//! ordered change list: a table-count change first (if any), then per-table
//! changes in the new report's table order, then removed tables in the old
//! report's order. Deterministic given deterministic table ordering upstream.

use std::collections::HashMap;

use crate::models::{
    ChangeKind, ChangeSummary, ComparisonReport, DatabaseChange, DatabaseReport, Impact, Table,
};

/// Compares two reports and produces an ordered [`ComparisonReport`].
pub fn compare(old: &DatabaseReport, new: &DatabaseReport) -> ComparisonReport {
    let mut changes = Vec::new();

    if old.tables.len() != new.tables.len() {
        changes.push(table_count_change(&old.tables, &new.tables));
    }

    let old_by_name: HashMap<&str, &Table> =
        old.tables.iter().map(|t| (t.name.as_str(), t)).collect();

    for table in &new.tables {
        match old_by_name.get(table.name.as_str()) {
            Some(previous) if previous.row_count != table.row_count => {
                changes.push(row_count_change(previous, table));
            }
            Some(_) => {}
            None => changes.push(DatabaseChange {
                kind: ChangeKind::NewTable,
                impact: Impact::Medium,
                object: table.name.clone(),
                description: format!("Table '{}' was added", table.name),
            }),
        }
    }

    let new_names: std::collections::HashSet<&str> =
        new.tables.iter().map(|t| t.name.as_str()).collect();
    for table in &old.tables {
        if !new_names.contains(table.name.as_str()) {
            changes.push(DatabaseChange {
                kind: ChangeKind::RemovedTable,
                impact: Impact::High,
                object: table.name.clone(),
                description: format!("Table '{}' was removed", table.name),
            });
        }
    }

    let summary = summarize(&changes);

    ComparisonReport {
        baseline_generated_at: old.generated_at,
        current_generated_at: new.generated_at,
        changes,
        summary,
    }
}

fn table_count_change(old: &[Table], new: &[Table]) -> DatabaseChange {
    let delta = old.len().abs_diff(new.len());
    let impact = if old.is_empty() {
        Impact::Medium
    } else {
        let ratio = delta as f64 / old.len() as f64;
        if ratio > 0.5 {
            Impact::High
        } else if ratio > 0.2 {
            Impact::Medium
        } else {
            Impact::Low
        }
    };

    DatabaseChange {
        kind: ChangeKind::TableCount,
        impact,
        object: "database".to_string(),
        description: format!("Table count changed from {} to {}", old.len(), new.len()),
    }
}

fn row_count_change(old: &Table, new: &Table) -> DatabaseChange {
    let delta = old.row_count.abs_diff(new.row_count);
    let impact = if old.row_count == 0 {
        Impact::High
    } else {
        let ratio = delta as f64 / old.row_count as f64;
        if ratio > 1.0 {
            Impact::High
        } else if ratio > 0.5 {
            Impact::Medium
        } else {
            Impact::Low
        }
    };

    DatabaseChange {
        kind: ChangeKind::RowCount,
        impact,
        object: new.name.clone(),
        description: format!(
            "Row count of '{}' changed from {} to {}",
            new.name, old.row_count, new.row_count
        ),
    }
}

fn summarize(changes: &[DatabaseChange]) -> ChangeSummary {
    let mut summary = ChangeSummary {
        total_changes: changes.len(),
        ..ChangeSummary::default()
    };

    for change in changes {
        if change.kind.is_schema_change() {
            summary.schema_changes += 1;
        } else {
            summary.data_changes += 1;
        }
        match change.impact {
            Impact::High => summary.high_impact += 1,
            Impact::Medium => summary.medium_impact += 1,
            Impact::Low => summary.low_impact += 1,
        }
    }

    summary
}
