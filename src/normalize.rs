//! Schema normalization.
//!
//! Converts raw dialect rows into the canonical model. Normalization never
//! fails on missing optional metadata: absent fields take documented
//! defaults (zero counts, empty collections, the `"Unknown"` size sentinel,
//! `Pattern::None`).

use crate::adapters::{RawColumn, RawColumnStats, RawConstraint, RawIndex, RawRelationship};
use crate::models::{
    Column, Constraint, DataProfile, Index, Relationship, RelationshipKind,
};

/// Normalizes one raw column row plus its measured statistics and profile.
pub fn normalize_column(raw: RawColumn, stats: RawColumnStats, profile: DataProfile) -> Column {
    Column {
        name: raw.name,
        data_type: raw.data_type,
        is_nullable: raw.is_nullable,
        is_primary_key: raw.is_primary_key,
        default_value: raw.default_value,
        max_length: raw.max_length,
        numeric_precision: raw.numeric_precision,
        numeric_scale: raw.numeric_scale,
        unique_values: stats.distinct_count,
        null_count: stats.null_count,
        profile,
    }
}

/// Normalizes raw index rows, dropping unnamed entries.
pub fn normalize_indexes(raw: Vec<RawIndex>) -> Vec<Index> {
    raw.into_iter()
        .filter(|ix| !ix.name.is_empty())
        .map(|ix| Index {
            name: ix.name,
            columns: ix.columns,
            is_unique: ix.is_unique,
            kind: if ix.kind.is_empty() {
                "btree".to_string()
            } else {
                ix.kind
            },
        })
        .collect()
}

/// Normalizes raw constraint rows.
pub fn normalize_constraints(raw: Vec<RawConstraint>) -> Vec<Constraint> {
    raw.into_iter()
        .map(|c| Constraint {
            name: c.name,
            kind: c.kind,
            columns: c.columns,
            referenced_table: c.referenced_table,
            referenced_columns: c.referenced_columns,
        })
        .collect()
}

/// Normalizes raw relationship rows. Only foreign keys exist today.
pub fn normalize_relationships(raw: Vec<RawRelationship>) -> Vec<Relationship> {
    raw.into_iter()
        .map(|r| Relationship {
            source_column: r.source_column,
            target_table: r.target_table,
            target_column: r.target_column,
            kind: RelationshipKind::ForeignKey,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConstraintKind, Pattern};

    fn raw_column(name: &str) -> RawColumn {
        RawColumn {
            name: name.to_string(),
            data_type: "text".to_string(),
            is_nullable: true,
            is_primary_key: false,
            default_value: None,
            max_length: None,
            numeric_precision: None,
            numeric_scale: None,
            ordinal_position: 1,
        }
    }

    #[test]
    fn test_normalize_column_carries_stats_and_profile() {
        let stats = RawColumnStats {
            distinct_count: 42,
            null_count: 3,
        };
        let profile = DataProfile {
            sample_values: vec!["a@b.com".to_string()],
            pattern: Pattern::Email,
            quality: 0.97,
            ..DataProfile::default()
        };

        let column = normalize_column(raw_column("email"), stats, profile);
        assert_eq!(column.unique_values, 42);
        assert_eq!(column.null_count, 3);
        assert_eq!(column.profile.pattern, Pattern::Email);
    }

    #[test]
    fn test_normalize_column_defaults() {
        let column = normalize_column(
            raw_column("notes"),
            RawColumnStats::default(),
            DataProfile::default(),
        );
        assert_eq!(column.unique_values, 0);
        assert_eq!(column.null_count, 0);
        assert_eq!(column.profile.quality, 1.0);
        assert_eq!(column.profile.pattern, Pattern::None);
    }

    #[test]
    fn test_normalize_indexes_defaults_kind_and_drops_unnamed() {
        let raw = vec![
            RawIndex {
                name: "ix_users_email".to_string(),
                columns: vec!["email".to_string()],
                is_unique: true,
                kind: String::new(),
            },
            RawIndex {
                name: String::new(),
                columns: vec!["ghost".to_string()],
                is_unique: false,
                kind: String::new(),
            },
        ];

        let indexes = normalize_indexes(raw);
        assert_eq!(indexes.len(), 1);
        assert_eq!(indexes[0].kind, "btree");
        assert!(indexes[0].is_unique);
    }

    #[test]
    fn test_normalize_relationships_are_foreign_keys() {
        let raw = vec![RawRelationship {
            source_column: "user_id".to_string(),
            target_table: "users".to_string(),
            target_column: "id".to_string(),
        }];

        let rels = normalize_relationships(raw);
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].kind, RelationshipKind::ForeignKey);
        assert_eq!(rels[0].target_table, "users");
    }

    #[test]
    fn test_normalize_constraints_preserves_fk_targets() {
        let raw = vec![RawConstraint {
            name: "fk_orders_user".to_string(),
            kind: ConstraintKind::ForeignKey,
            columns: vec!["user_id".to_string()],
            referenced_table: Some("users".to_string()),
            referenced_columns: vec!["id".to_string()],
        }];

        let constraints = normalize_constraints(raw);
        assert_eq!(constraints[0].kind, ConstraintKind::ForeignKey);
        assert_eq!(constraints[0].referenced_table.as_deref(), Some("users"));
    }
}
