//! Persistence gateway: typed record storage on one collection.

use std::sync::Arc;

use pipeline::record::fields;
use pipeline::{
    AnalysisResult, AnalysisStatus, CollectionName, DocumentPatch, DocumentQuery, DocumentStore,
    FeedbackChannel, Fields, RecordId, StoreError, StoredRecord,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

/// Page size used by [`ListFilter::default`].
pub const DEFAULT_LIST_LIMIT: u32 = 10;

/// Criteria for [`PersistenceGateway::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilter {
    /// Only feedback records tagged with this channel.
    pub channel: Option<FeedbackChannel>,
    /// Only records in this lifecycle state.
    pub status: Option<AnalysisStatus>,
    pub limit: u32,
}

impl Default for ListFilter {
    fn default() -> Self {
        Self {
            channel: None,
            status: None,
            limit: DEFAULT_LIST_LIMIT,
        }
    }
}

impl ListFilter {
    fn to_query(&self) -> DocumentQuery {
        let mut query = DocumentQuery::all()
            .newest_first(fields::CREATED_AT)
            .limit(self.limit);
        if let Some(channel) = self.channel {
            query = query.where_eq(fields::CHANNEL, Value::from(channel.as_str()));
        }
        if let Some(status) = self.status {
            query = query.where_eq(fields::STATUS, Value::from(status.as_str()));
        }
        query
    }
}

/// Reads and writes records in a single collection.
///
/// The gateway owns the bookkeeping fields (`status`, `createdAt`,
/// `analysis`, `analyzedAt`); callers only ever supply record bodies. Store
/// errors are propagated unchanged and nothing is retried.
#[derive(Clone)]
pub struct PersistenceGateway {
    store: Arc<dyn DocumentStore>,
    collection: CollectionName,
}

impl PersistenceGateway {
    pub fn new(store: Arc<dyn DocumentStore>, collection: CollectionName) -> Self {
        Self { store, collection }
    }

    /// Collection this gateway writes to.
    pub fn collection(&self) -> &CollectionName {
        &self.collection
    }

    /// Serializes `body` and stores it as a new `pending_analysis` record.
    pub async fn create_record<T>(&self, body: &T) -> Result<RecordId, StoreError>
    where
        T: Serialize + Sync,
    {
        match serde_json::to_value(body) {
            Ok(Value::Object(map)) => self.create(map).await,
            Ok(other) => Err(StoreError::Encode {
                message: format!("record body must be an object, got {other}"),
            }),
            Err(e) => Err(StoreError::Encode {
                message: e.to_string(),
            }),
        }
    }

    /// Stores `body` as a new record with status `pending_analysis` and a
    /// server-assigned `createdAt`.
    ///
    /// Any bookkeeping fields present in `body` are replaced.
    #[instrument(skip_all, fields(collection = %self.collection))]
    pub async fn create(&self, mut body: Fields) -> Result<RecordId, StoreError> {
        body.remove(fields::ANALYSIS);
        body.remove(fields::ANALYZED_AT);
        body.remove(fields::CREATED_AT);
        body.insert(
            fields::STATUS.to_string(),
            Value::from(AnalysisStatus::PendingAnalysis.as_str()),
        );

        let id = self
            .store
            .create(&self.collection, body, &[fields::CREATED_AT.to_string()])
            .await
            .inspect_err(|e| warn!(error = %e, "Record could not be stored"))?;
        info!(record_id = %id, "Record stored");
        Ok(id)
    }

    /// Reads one record, or `None` if it does not exist.
    #[instrument(skip_all, fields(collection = %self.collection, record_id = %id))]
    pub async fn get<T: DeserializeOwned>(
        &self,
        id: &RecordId,
    ) -> Result<Option<StoredRecord<T>>, StoreError> {
        match self.store.get(&self.collection, id).await? {
            Some(document) => StoredRecord::from_document(document).map(Some),
            None => {
                debug!("Record not found");
                Ok(None)
            }
        }
    }

    /// Merges `patch` into an existing record.
    pub async fn update(&self, id: &RecordId, patch: DocumentPatch) -> Result<(), StoreError> {
        self.store.update(&self.collection, id, patch).await
    }

    /// Attaches `analysis` to a record and marks it `analyzed`.
    ///
    /// The analysis, the status and the `analyzedAt` timestamp land in one
    /// write, so a reader never observes one without the others.
    #[instrument(skip_all, fields(collection = %self.collection, record_id = %id))]
    pub async fn attach_analysis(
        &self,
        id: &RecordId,
        analysis: &AnalysisResult,
    ) -> Result<(), StoreError> {
        let value = serde_json::to_value(analysis).map_err(|e| StoreError::Encode {
            message: e.to_string(),
        })?;
        let patch = DocumentPatch::new()
            .set(fields::ANALYSIS, value)
            .set(fields::STATUS, Value::from(AnalysisStatus::Analyzed.as_str()))
            .server_timestamp(fields::ANALYZED_AT);

        self.update(id, patch)
            .await
            .inspect_err(|e| warn!(error = %e, "Analysis could not be attached"))?;
        info!("Analysis attached");
        Ok(())
    }

    /// Lists records matching `filter`, newest first by `createdAt`.
    ///
    /// Records without a `createdAt` are not returned.
    #[instrument(skip_all, fields(collection = %self.collection, limit = filter.limit))]
    pub async fn list<T: DeserializeOwned>(
        &self,
        filter: &ListFilter,
    ) -> Result<Vec<StoredRecord<T>>, StoreError> {
        let documents = self.store.query(&self.collection, &filter.to_query()).await?;
        Ok(decode_all(documents))
    }

    /// Reads every record in the collection, in store order.
    #[instrument(skip_all, fields(collection = %self.collection))]
    pub async fn list_all<T: DeserializeOwned>(&self) -> Result<Vec<StoredRecord<T>>, StoreError> {
        let documents = self.store.query(&self.collection, &DocumentQuery::all()).await?;
        Ok(decode_all(documents))
    }
}

/// Decodes documents, skipping (and logging) any that do not fit the record shape.
fn decode_all<T: DeserializeOwned>(documents: Vec<pipeline::StoredDocument>) -> Vec<StoredRecord<T>> {
    let total = documents.len();
    let records: Vec<StoredRecord<T>> = documents
        .into_iter()
        .filter_map(|document| {
            StoredRecord::from_document(document)
                .inspect_err(|e| warn!(error = %e, "Skipping undecodable record"))
                .ok()
        })
        .collect();
    debug!(total, decoded = records.len(), "Records read");
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::{FeedbackRecord, Rating, SurveyRecord, SurveyResponse};
    use serde_json::json;
    use store::MemoryStore;

    fn gateway(store: &Arc<MemoryStore>) -> PersistenceGateway {
        PersistenceGateway::new(store.clone(), CollectionName::new("SurveyResponses").unwrap())
    }

    fn analysis() -> AnalysisResult {
        AnalysisResult::from_reply(r#"{"rating": 2, "explanation": "slow", "keyIssues": ["speed"]}"#)
            .unwrap()
    }

    #[tokio::test]
    async fn created_records_start_pending_with_a_timestamp() {
        let store = Arc::new(MemoryStore::new());
        let gateway = gateway(&store);
        let survey = SurveyResponse {
            price_rating: Rating::new(3),
            ..SurveyResponse::default()
        };

        let id = gateway.create_record(&survey).await.unwrap();
        let record: SurveyRecord = gateway.get(&id).await.unwrap().unwrap();

        assert_eq!(record.status, AnalysisStatus::PendingAnalysis);
        assert!(record.analysis.is_none());
        assert!(record.created_at.is_some());
        assert_eq!(record.body.price_rating, Rating::new(3));
    }

    #[tokio::test]
    async fn attached_analysis_flips_status() {
        let store = Arc::new(MemoryStore::new());
        let gateway = gateway(&store);
        let id = gateway.create_record(&SurveyResponse::default()).await.unwrap();

        gateway.attach_analysis(&id, &analysis()).await.unwrap();

        let record: SurveyRecord = gateway.get(&id).await.unwrap().unwrap();
        assert_eq!(record.status, AnalysisStatus::Analyzed);
        assert_eq!(record.analysis.unwrap().key_issues, ["speed"]);
    }

    #[tokio::test]
    async fn attaching_to_a_missing_record_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let err = gateway(&store)
            .attach_analysis(&RecordId::new("missing").unwrap(), &analysis())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn missing_record_reads_as_none() {
        let store = Arc::new(MemoryStore::new());
        let record: Option<SurveyRecord> = gateway(&store)
            .get(&RecordId::new("nope").unwrap())
            .await
            .unwrap();
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn list_filters_by_channel_and_returns_newest_first() {
        let store = Arc::new(MemoryStore::new());
        let gateway =
            PersistenceGateway::new(store.clone(), CollectionName::new("customer-feedback").unwrap());
        for (channel, content) in [
            (FeedbackChannel::Email, "first email"),
            (FeedbackChannel::Social, "a tweet"),
            (FeedbackChannel::Email, "second email"),
        ] {
            gateway
                .create_record(&FeedbackRecord {
                    channel,
                    content: content.into(),
                    metadata: Some(json!({"source": "test"})),
                })
                .await
                .unwrap();
        }

        let filter = ListFilter {
            channel: Some(FeedbackChannel::Email),
            ..ListFilter::default()
        };
        let emails = gateway.list::<FeedbackRecord>(&filter).await.unwrap();
        let contents: Vec<&str> = emails.iter().map(|e| e.body.content.as_str()).collect();
        assert_eq!(contents, ["second email", "first email"]);
    }

    #[tokio::test]
    async fn list_respects_limit() {
        let store = Arc::new(MemoryStore::new());
        let gateway = gateway(&store);
        for _ in 0..4 {
            gateway.create_record(&SurveyResponse::default()).await.unwrap();
        }
        let filter = ListFilter {
            limit: 3,
            ..ListFilter::default()
        };
        assert_eq!(gateway.list::<SurveyResponse>(&filter).await.unwrap().len(), 3);
        assert_eq!(gateway.list_all::<SurveyResponse>().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn non_object_bodies_are_rejected() {
        let store = Arc::new(MemoryStore::new());
        let err = gateway(&store).create_record(&"just text").await.unwrap_err();
        assert!(matches!(err, StoreError::Encode { .. }));
        assert!(store.is_empty(&CollectionName::new("SurveyResponses").unwrap()));
    }
}
