//! Port traits implemented by infrastructure crates.
//!
//! The domain defines *what* it needs from the outside world; the `store` and
//! `llm` crates define *how*. Both traits are object-safe so they can be held as
//! `Arc<dyn ...>` and swapped for in-memory fakes in tests.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::{CollectionName, ModelError, ModelName, RecordId, StoreError};

/// Untyped document body: a JSON object keyed by field name.
pub type Fields = Map<String, Value>;

// ---------------------------------------------------------------------------
// Document store
// ---------------------------------------------------------------------------

/// A document as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: RecordId,
    pub fields: Fields,
}

/// A merge-update: listed fields are replaced, all others are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentPatch {
    /// Fields to overwrite.
    pub fields: Fields,
    /// Fields to set to the store's own write time.
    pub server_timestamps: Vec<String>,
}

impl DocumentPatch {
    /// Creates an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `field` to `value`.
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: Value) -> Self {
        self.fields.insert(field.into(), value);
        self
    }

    /// Sets `field` to the server-assigned write time.
    #[must_use]
    pub fn server_timestamp(mut self, field: impl Into<String>) -> Self {
        self.server_timestamps.push(field.into());
        self
    }

    /// Returns `true` if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.server_timestamps.is_empty()
    }
}

/// Equality-filtered, optionally ordered and capped collection query.
///
/// Ordering is always descending (newest first). Documents that lack the
/// ordering field are excluded, as the backing store does.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentQuery {
    pub filters: Vec<(String, Value)>,
    pub order_by_desc: Option<String>,
    pub limit: Option<u32>,
}

impl DocumentQuery {
    /// A query matching every document in the collection.
    pub fn all() -> Self {
        Self::default()
    }

    /// Adds an equality filter.
    #[must_use]
    pub fn where_eq(mut self, field: impl Into<String>, value: Value) -> Self {
        self.filters.push((field.into(), value));
        self
    }

    /// Orders results by `field`, newest (largest) first.
    #[must_use]
    pub fn newest_first(mut self, field: impl Into<String>) -> Self {
        self.order_by_desc = Some(field.into());
        self
    }

    /// Caps the number of results.
    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Remote document database.
///
/// No operation retries. Concurrent updates to the same document race and the
/// last write wins; each individual write is atomic.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads one document; `Ok(None)` when it does not exist.
    async fn get(
        &self,
        collection: &CollectionName,
        id: &RecordId,
    ) -> Result<Option<StoredDocument>, StoreError>;

    /// Creates a document with a store-generated id.
    ///
    /// Every field named in `server_timestamps` is set to the write time.
    async fn create(
        &self,
        collection: &CollectionName,
        fields: Fields,
        server_timestamps: &[String],
    ) -> Result<RecordId, StoreError>;

    /// Merges `patch` into an existing document.
    ///
    /// Fails with [`StoreError::NotFound`] if the document does not exist.
    async fn update(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        patch: DocumentPatch,
    ) -> Result<(), StoreError>;

    /// Runs `query` against `collection`.
    async fn query(
        &self,
        collection: &CollectionName,
        query: &DocumentQuery,
    ) -> Result<Vec<StoredDocument>, StoreError>;
}

// ---------------------------------------------------------------------------
// Language model
// ---------------------------------------------------------------------------

/// Requested completion format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Plain text.
    Text,
    /// Ask the provider to constrain output to a JSON object.
    Json,
}

/// One single-turn completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: ModelName,
    pub prompt: String,
    pub format: ResponseFormat,
}

impl CompletionRequest {
    /// A request for a JSON-object completion.
    pub fn json(model: ModelName, prompt: impl Into<String>) -> Self {
        Self {
            model,
            prompt: prompt.into(),
            format: ResponseFormat::Json,
        }
    }
}

/// Generative-language API: prompt in, completion text out.
///
/// No streaming, no conversation state, no caching. Every call is a fresh
/// network round-trip.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the completion text for `request`.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patch_builder_accumulates_fields_and_timestamps() {
        let patch = DocumentPatch::new()
            .set("status", json!("analyzed"))
            .server_timestamp("analyzedAt");
        assert!(!patch.is_empty());
        assert_eq!(patch.fields["status"], json!("analyzed"));
        assert_eq!(patch.server_timestamps, ["analyzedAt"]);
        assert!(DocumentPatch::new().is_empty());
    }

    #[test]
    fn query_builder_records_filters_in_order() {
        let query = DocumentQuery::all()
            .where_eq("type", json!("email"))
            .where_eq("status", json!("analyzed"))
            .newest_first("createdAt")
            .limit(5);
        assert_eq!(query.filters.len(), 2);
        assert_eq!(query.filters[0].0, "type");
        assert_eq!(query.order_by_desc.as_deref(), Some("createdAt"));
        assert_eq!(query.limit, Some(5));
    }
}
