//! In-process [`DocumentStore`].
//!
//! Behaves like the remote store for everything the gateways rely on:
//! generated ids, server timestamps, merge updates, equality filters,
//! newest-first ordering that skips documents lacking the order field, and a
//! result cap. Data lives only as long as the value.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use pipeline::{
    CollectionName, DocumentPatch, DocumentQuery, DocumentStore, Fields, RecordId, StoreError,
    StoredDocument,
};
use serde_json::Value;

use crate::ids::generate_document_id;

#[derive(Default)]
struct State {
    collections: HashMap<CollectionName, BTreeMap<RecordId, Fields>>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl State {
    /// Strictly increasing write time, so newest-first ordering is total even
    /// when two writes land within the clock's resolution.
    fn next_timestamp(&mut self) -> Value {
        let now = Utc::now();
        let stamp = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(stamp);
        Value::String(stamp.to_rfc3339_opts(SecondsFormat::Micros, true))
    }
}

/// Thread-safe in-memory document store.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently in `collection`.
    pub fn len(&self, collection: &CollectionName) -> usize {
        self.lock().collections.get(collection).map_or(0, BTreeMap::len)
    }

    /// Returns `true` if `collection` holds no documents.
    pub fn is_empty(&self, collection: &CollectionName) -> bool {
        self.len(collection) == 0
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock cannot leave a half-written document,
        // so the data is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(
        &self,
        collection: &CollectionName,
        id: &RecordId,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let state = self.lock();
        Ok(state
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| StoredDocument {
                id: id.clone(),
                fields: fields.clone(),
            }))
    }

    async fn create(
        &self,
        collection: &CollectionName,
        mut fields: Fields,
        server_timestamps: &[String],
    ) -> Result<RecordId, StoreError> {
        let mut state = self.lock();
        for field in server_timestamps {
            let stamp = state.next_timestamp();
            fields.insert(field.clone(), stamp);
        }

        let docs = state.collections.entry(collection.clone()).or_default();
        let id = loop {
            let candidate = generate_document_id();
            if !docs.contains_key(&candidate) {
                break candidate;
            }
        };
        docs.insert(id.clone(), fields);
        tracing::debug!(collection = %collection, id = %id, "Created in-memory document");
        Ok(id)
    }

    async fn update(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        patch: DocumentPatch,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        let stamps: Vec<(String, Value)> = patch
            .server_timestamps
            .iter()
            .map(|field| (field.clone(), state.next_timestamp()))
            .collect();

        let existing = state
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        existing.extend(patch.fields);
        existing.extend(stamps);
        Ok(())
    }

    async fn query(
        &self,
        collection: &CollectionName,
        query: &DocumentQuery,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let state = self.lock();
        let Some(docs) = state.collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matches: Vec<StoredDocument> = docs
            .iter()
            .filter(|(_, fields)| {
                query
                    .filters
                    .iter()
                    .all(|(field, expected)| fields.get(field) == Some(expected))
            })
            .filter(|(_, fields)| {
                query
                    .order_by_desc
                    .as_ref()
                    .map_or(true, |field| fields.contains_key(field))
            })
            .map(|(id, fields)| StoredDocument {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect();

        if let Some(field) = &query.order_by_desc {
            matches.sort_by(|a, b| compare_values(b.fields.get(field), a.fields.get(field)));
        }
        if let Some(limit) = query.limit {
            matches.truncate(limit as usize);
        }
        Ok(matches)
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}
