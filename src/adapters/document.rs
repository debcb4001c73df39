//! MongoDB document-store adapter.
//!
//! Collections have no declared schema, so column metadata is inferred from
//! a bounded sample of documents. Each collection is scanned once per
//! adapter instance; the decoded sample is cached and reused for field
//! inference, per-field statistics, sample values, and numeric profiling.
//! Row counts, sizes, and the sharding flag come from `collStats`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mongodb::{Client, Database};
use mongodb::bson::{Bson, Document, doc};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::Result;
use crate::adapters::{
    DialectAdapter, NumericStats, RawColumn, RawColumnStats, RawConstraint, RawIndex,
    RawRelationship, dialect_from_url, format_bytes,
};
use crate::error::{DbPulseError, redact_database_url};
use crate::inference::{FieldInference, InferredField, value_at_path};
use crate::models::{ConstraintKind, Dialect};

/// Decoded sample of one collection, shared across profiling calls.
struct CollectionScan {
    fields: Vec<InferredField>,
    documents: Vec<Value>,
}

/// Adapter over a MongoDB database handle.
pub struct DocumentStoreAdapter {
    database: Database,
    database_name: String,
    sample_size: u32,
    scans: Mutex<HashMap<String, Arc<CollectionScan>>>,
}

impl DocumentStoreAdapter {
    /// Wraps an existing database handle. `sample_size` bounds how many
    /// documents are fetched per collection for schema inference.
    pub fn new(database: Database, sample_size: u32) -> Self {
        let database_name = database.name().to_string();
        Self {
            database,
            database_name,
            sample_size,
            scans: Mutex::new(HashMap::new()),
        }
    }

    /// Connects a new client from a URL and wraps the named database.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` or `UnsupportedDialect` when the URL
    /// does not target a document store, and `Connection` when the client
    /// cannot be created. Error messages carry the redacted URL only.
    pub async fn connect(
        database_url: &str,
        database_name: &str,
        sample_size: u32,
    ) -> Result<Self> {
        match dialect_from_url(database_url)? {
            Dialect::MongoDb => {}
            other => {
                return Err(DbPulseError::invalid_configuration(format!(
                    "connection URL targets {}, not MongoDB",
                    other
                )));
            }
        }

        let client = Client::with_uri_str(database_url).await.map_err(|e| {
            DbPulseError::connection_failed(
                format!("could not connect to {}", redact_database_url(database_url)),
                e,
            )
        })?;
        Ok(Self::new(client.database(database_name), sample_size))
    }

    /// Returns the cached scan for a collection, fetching and inferring on
    /// first use.
    async fn scan(&self, collection: &str) -> Result<Arc<CollectionScan>> {
        {
            let scans = self.scans.lock().await;
            if let Some(scan) = scans.get(collection) {
                return Ok(Arc::clone(scan));
            }
        }

        let coll = self.database.collection::<Document>(collection);
        let mut cursor = coll
            .find(doc! {})
            .limit(i64::from(self.sample_size))
            .await
            .map_err(|e| {
                DbPulseError::query_failed(
                    format!("failed to sample documents from '{}'", collection),
                    e,
                )
            })?;

        let mut documents = Vec::new();
        let mut inference = FieldInference::new();
        while cursor.advance().await.map_err(|e| {
            DbPulseError::query_failed(
                format!("failed to iterate cursor for '{}'", collection),
                e,
            )
        })? {
            let document = cursor.deserialize_current().map_err(|e| {
                DbPulseError::query_failed(
                    format!("failed to deserialize document from '{}'", collection),
                    e,
                )
            })?;
            let value = serde_json::to_value(&document).map_err(|e| {
                DbPulseError::query_failed(
                    format!("failed to convert document from '{}'", collection),
                    e,
                )
            })?;
            inference.scan_document(&value);
            documents.push(value);
        }

        debug!(
            collection = %collection,
            sampled = documents.len(),
            "inferred collection schema"
        );

        let scan = Arc::new(CollectionScan {
            fields: inference.finalize(),
            documents,
        });
        self.scans
            .lock()
            .await
            .insert(collection.to_string(), Arc::clone(&scan));
        Ok(scan)
    }

    async fn coll_stats(&self, collection: &str) -> Result<Document> {
        self.database
            .run_command(doc! { "collStats": collection })
            .await
            .map_err(|e| {
                DbPulseError::metadata_unavailable(
                    format!("failed to read collStats of '{}'", collection),
                    e,
                )
            })
    }
}

/// Numeric BSON values arrive as Int32, Int64, or Double depending on the
/// driver that wrote them.
fn bson_to_u64(value: &Bson) -> Option<u64> {
    match value {
        Bson::Int32(v) => u64::try_from(*v).ok(),
        Bson::Int64(v) => u64::try_from(*v).ok(),
        Bson::Double(v) if *v >= 0.0 => Some(*v as u64),
        _ => None,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl DialectAdapter for DocumentStoreAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::MongoDb
    }

    fn database_name(&self) -> &str {
        &self.database_name
    }

    async fn list_entities(&self) -> Result<Vec<String>> {
        let mut names = self.database.list_collection_names().await.map_err(|e| {
            DbPulseError::query_failed("failed to enumerate collections", e)
        })?;
        names.retain(|name| !name.starts_with("system."));
        names.sort();
        Ok(names)
    }

    async fn describe_columns(&self, table: &str) -> Result<Vec<RawColumn>> {
        let scan = self.scan(table).await?;
        Ok(scan.fields.iter().map(InferredField::to_raw_column).collect())
    }

    async fn list_indexes(&self, table: &str) -> Result<Vec<RawIndex>> {
        let coll = self.database.collection::<Document>(table);
        let mut cursor = coll.list_indexes().await.map_err(|e| {
            DbPulseError::query_failed(format!("failed to list indexes of '{}'", table), e)
        })?;

        let mut indexes = Vec::new();
        while cursor.advance().await.map_err(|e| {
            DbPulseError::query_failed(
                format!("failed to iterate indexes of '{}'", table),
                e,
            )
        })? {
            let model = cursor.deserialize_current().map_err(|e| {
                DbPulseError::query_failed(
                    format!("failed to deserialize index of '{}'", table),
                    e,
                )
            })?;

            let columns: Vec<String> = model.keys.keys().cloned().collect();
            // Non-numeric key values name special index plugins ("text",
            // "2dsphere", "hashed"); plain 1/-1 keys are btree.
            let kind = model
                .keys
                .values()
                .find_map(|v| match v {
                    Bson::String(plugin) => Some(plugin.clone()),
                    _ => None,
                })
                .unwrap_or_else(|| "btree".to_string());

            let (name, is_unique) = match model.options {
                Some(options) => (
                    options.name.unwrap_or_default(),
                    options.unique.unwrap_or(false),
                ),
                None => (String::new(), false),
            };

            indexes.push(RawIndex {
                name,
                columns,
                is_unique,
                kind,
            });
        }
        Ok(indexes)
    }

    async fn list_constraints(&self, table: &str) -> Result<Vec<RawConstraint>> {
        // The only structural guarantees a collection offers are the
        // implicit _id key and unique indexes.
        let mut constraints = vec![RawConstraint {
            name: format!("pk_{}", table),
            kind: ConstraintKind::PrimaryKey,
            columns: vec!["_id".to_string()],
            referenced_table: None,
            referenced_columns: Vec::new(),
        }];

        for index in self.list_indexes(table).await? {
            if index.is_unique && index.columns != ["_id"] {
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

    async fn list_relationships(&self, _table: &str) -> Result<Vec<RawRelationship>> {
        // Document stores declare no foreign keys.
        Ok(Vec::new())
    }

    async fn row_count(&self, table: &str) -> Result<u64> {
        // Views and some server versions omit "count" from collStats; the
        // driver-side estimate covers those and any degradable failure.
        match self.coll_stats(table).await {
            Ok(stats) => {
                if let Some(count) = stats.get("count").and_then(bson_to_u64) {
                    return Ok(count);
                }
            }
            Err(e) if e.is_degradable() => {
                debug!(collection = %table, error = %e, "collStats unavailable, using driver estimate");
            }
            Err(e) => return Err(e),
        }

        self.database
            .collection::<Document>(table)
            .estimated_document_count()
            .await
            .map_err(|e| {
                DbPulseError::metadata_unavailable(
                    format!("failed to count documents of '{}'", table),
                    e,
                )
            })
    }

    async fn estimate_size(&self, table: &str) -> Result<String> {
        let stats = self.coll_stats(table).await?;
        let bytes = stats.get("size").and_then(bson_to_u64).ok_or_else(|| {
            DbPulseError::metadata_missing(format!(
                "collStats of '{}' carries no size",
                table
            ))
        })?;
        Ok(format_bytes(bytes))
    }

    async fn is_partitioned(&self, table: &str) -> Result<bool> {
        let stats = self.coll_stats(table).await?;
        Ok(stats.get_bool("sharded").unwrap_or(false))
    }

    async fn column_stats(&self, table: &str, column: &str) -> Result<RawColumnStats> {
        let scan = self.scan(table).await?;
        if scan.documents.is_empty() {
            return Ok(RawColumnStats::default());
        }

        let mut distinct: Vec<String> = Vec::new();
        let mut missing: u64 = 0;
        for document in &scan.documents {
            match value_at_path(document, column) {
                Some(Value::Null) | None => missing += 1,
                Some(value) => {
                    let rendered = stringify(value);
                    if !distinct.contains(&rendered) {
                        distinct.push(rendered);
                    }
                }
            }
        }

        // Scale the sampled missing ratio up to the full collection.
        let total = self.row_count(table).await.unwrap_or(scan.documents.len() as u64);
        let missing_ratio = missing as f64 / scan.documents.len() as f64;
        Ok(RawColumnStats {
            distinct_count: distinct.len() as u64,
            null_count: (missing_ratio * total as f64).round() as u64,
        })
    }

    async fn sample_values(&self, table: &str, column: &str, limit: u32) -> Result<Vec<String>> {
        let scan = self.scan(table).await?;
        let mut values = Vec::new();
        for document in &scan.documents {
            if let Some(value) = value_at_path(document, column) {
                if value.is_null() {
                    continue;
                }
                let rendered = stringify(value);
                if !values.contains(&rendered) {
                    values.push(rendered);
                    if values.len() as u32 >= limit {
                        break;
                    }
                }
            }
        }
        Ok(values)
    }

    async fn numeric_stats(&self, table: &str, column: &str) -> Result<Option<NumericStats>> {
        let scan = self.scan(table).await?;
        let numbers: Vec<f64> = scan
            .documents
            .iter()
            .filter_map(|document| value_at_path(document, column))
            .filter_map(Value::as_f64)
            .collect();

        if numbers.is_empty() {
            return Ok(None);
        }

        let min = numbers.iter().copied().fold(f64::INFINITY, f64::min);
        let max = numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg = numbers.iter().sum::<f64>() / numbers.len() as f64;
        Ok(Some(NumericStats { min, max, avg }))
    }
}
