//! Field inference for schemaless document stores.
//!
//! Document databases have no declared schema, so the column analogue is
//! inferred from sampled documents: each field's occurrence frequency
//! (fraction of sampled documents containing it) and runtime value kind are
//! tracked, with nested documents flattened into dotted paths
//! (`address.city`). The input is the already-decoded tagged form
//! ([`serde_json::Value`]), so classification is a total match over a closed
//! set of kinds.

use serde_json::Value;
use std::collections::HashMap;

use crate::adapters::RawColumn;

/// Runtime value kinds observed in sampled documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    String,
    Int,
    Double,
    Bool,
    Array,
    Object,
    /// More than one non-null kind was observed for the field.
    Mixed,
}

impl ValueKind {
    /// Classifies a decoded document value.
    pub fn classify(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(n) => {
                if n.is_i64() || n.is_u64() {
                    ValueKind::Int
                } else {
                    ValueKind::Double
                }
            }
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueKind::Null => write!(f, "null"),
            ValueKind::String => write!(f, "string"),
            ValueKind::Int => write!(f, "int"),
            ValueKind::Double => write!(f, "double"),
            ValueKind::Bool => write!(f, "bool"),
            ValueKind::Array => write!(f, "array"),
            ValueKind::Object => write!(f, "object"),
            ValueKind::Mixed => write!(f, "mixed"),
        }
    }
}

/// One inferred field of a collection.
#[derive(Debug, Clone)]
pub struct InferredField {
    /// Field name, dotted for nested paths.
    pub name: String,
    /// Dominant value kind, or `Mixed` when kinds disagree.
    pub kind: ValueKind,
    /// Documents in which the field appeared with a non-null value.
    pub occurrences: u64,
    /// Fraction of sampled documents containing the field (non-null).
    pub frequency: f64,
    /// Order of first discovery, starting at 1.
    pub ordinal_position: u32,
}

/// Accumulates field statistics over sampled documents.
#[derive(Debug, Default)]
pub struct FieldInference {
    fields: HashMap<String, FieldStats>,
    next_position: u32,
    documents_scanned: u64,
}

#[derive(Debug)]
struct FieldStats {
    kind_counts: HashMap<ValueKind, u64>,
    non_null_occurrences: u64,
    first_seen_position: u32,
}

impl FieldInference {
    /// Creates an empty inference accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents scanned so far.
    pub fn documents_scanned(&self) -> u64 {
        self.documents_scanned
    }

    /// Scans one decoded document, recording every field path.
    ///
    /// Non-object inputs are counted but contribute no fields.
    pub fn scan_document(&mut self, document: &Value) {
        self.documents_scanned = self.documents_scanned.saturating_add(1);
        if let Value::Object(map) = document {
            self.scan_fields(map, "");
        }
    }

    fn scan_fields(&mut self, map: &serde_json::Map<String, Value>, prefix: &str) {
        for (key, value) in map {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", prefix, key)
            };

            self.record(&path, value);

            // Nested documents get their own dotted entries; arrays of
            // documents are recorded as arrays and not descended into.
            if let Value::Object(nested) = value {
                self.scan_fields(nested, &path);
            }
        }
    }

    fn record(&mut self, path: &str, value: &Value) {
        let kind = ValueKind::classify(value);
        let stats = self.fields.entry(path.to_string()).or_insert_with(|| {
            self.next_position = self.next_position.saturating_add(1);
            FieldStats {
                kind_counts: HashMap::new(),
                non_null_occurrences: 0,
                first_seen_position: self.next_position,
            }
        });

        *stats.kind_counts.entry(kind).or_insert(0) += 1;
        if kind != ValueKind::Null {
            stats.non_null_occurrences += 1;
        }
    }

    /// Finalizes inference into fields ordered by first discovery.
    pub fn finalize(self) -> Vec<InferredField> {
        let total = self.documents_scanned;
        let mut fields: Vec<InferredField> = self
            .fields
            .into_iter()
            .map(|(name, stats)| {
                let non_null_kinds: Vec<ValueKind> = stats
                    .kind_counts
                    .keys()
                    .copied()
                    .filter(|k| *k != ValueKind::Null)
                    .collect();

                let kind = match non_null_kinds.as_slice() {
                    [] => ValueKind::Null,
                    [single] => *single,
                    _ => ValueKind::Mixed,
                };

                let frequency = if total == 0 {
                    0.0
                } else {
                    stats.non_null_occurrences as f64 / total as f64
                };

                InferredField {
                    name,
                    kind,
                    occurrences: stats.non_null_occurrences,
                    frequency,
                    ordinal_position: stats.first_seen_position,
                }
            })
            .collect();

        fields.sort_by_key(|f| f.ordinal_position);
        fields
    }
}

impl InferredField {
    /// Converts this field into a column-analogue raw row.
    ///
    /// A field absent from some documents (frequency below 1.0) or observed
    /// as null is nullable; `_id` is the primary-key analogue.
    pub fn to_raw_column(&self) -> RawColumn {
        RawColumn {
            name: self.name.clone(),
            data_type: self.kind.to_string(),
            is_nullable: self.frequency < 1.0 || self.kind == ValueKind::Null,
            is_primary_key: self.name == "_id",
            default_value: None,
            max_length: None,
            numeric_precision: None,
            numeric_scale: None,
            ordinal_position: self.ordinal_position,
        }
    }
}

/// Extracts the value at a dotted path from a decoded document.
///
/// Returns `None` when any path segment is missing or a non-object is
/// traversed.
pub fn value_at_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = document;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}
