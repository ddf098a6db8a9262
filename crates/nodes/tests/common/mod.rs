//! Test doubles shared by the orchestration scenarios.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use nodes::{AnalysisGateway, Orchestrator, PersistenceGateway};
use pipeline::{
    CollectionName, CompletionRequest, DocumentPatch, DocumentQuery, DocumentStore, Fields,
    LanguageModel, ModelError, ModelName, RecordId, StoreError, StoredDocument,
};
use store::MemoryStore;

pub const SURVEYS: &str = "SurveyResponses";
pub const FEEDBACK: &str = "customer-feedback";

pub fn surveys() -> CollectionName {
    CollectionName::new(SURVEYS).unwrap()
}

pub fn feedback() -> CollectionName {
    CollectionName::new(FEEDBACK).unwrap()
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Replays a fixed sequence of replies and records every prompt it receives.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, ModelError>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(self, error: ModelError) -> Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(ModelError::Transport {
                    message: "script exhausted".into(),
                })
            })
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// [`MemoryStore`] wrapper whose writes and queries can be made to fail on demand.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_creates: AtomicBool,
    pub fail_updates: AtomicBool,
    pub fail_queries: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn unavailable() -> StoreError {
        StoreError::Status {
            status: 503,
            message: "service unavailable".into(),
        }
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn get(
        &self,
        collection: &CollectionName,
        id: &RecordId,
    ) -> Result<Option<StoredDocument>, StoreError> {
        self.inner.get(collection, id).await
    }

    async fn create(
        &self,
        collection: &CollectionName,
        fields: Fields,
        server_timestamps: &[String],
    ) -> Result<RecordId, StoreError> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.create(collection, fields, server_timestamps).await
    }

    async fn update(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        patch: DocumentPatch,
    ) -> Result<(), StoreError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.update(collection, id, patch).await
    }

    async fn query(
        &self,
        collection: &CollectionName,
        query: &DocumentQuery,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.query(collection, query).await
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub fn orchestrator(store: Arc<dyn DocumentStore>, model: Arc<ScriptedModel>) -> Orchestrator {
    Orchestrator::new(
        PersistenceGateway::new(store.clone(), surveys()),
        PersistenceGateway::new(store, feedback()),
        AnalysisGateway::new(model, ModelName::new("gemini-2.5-flash").unwrap()),
    )
}

pub const POSITIVE_REPLY: &str = r#"{
    "rating": 5,
    "explanation": "Customer is happy with every aspect of the service.",
    "keyIssues": [],
    "positiveAspects": ["fast internet", "helpful support"]
}"#;

pub const NEGATIVE_REPLY: &str = r#"```json
{
    "rating": 1,
    "explanation": "Frequent dropped calls and high prices.",
    "keyIssues": ["dropped calls", "price"],
    "positiveAspects": []
}
```"#;

pub const SUMMARY_REPLY: &str = r#"{
    "overallSummary": "Customers value speed but complain about coverage.",
    "mainTalkingPoints": ["coverage", "speed"],
    "topPositiveAspects": ["speed"],
    "criticalIssues": ["dropped calls"],
    "recommendations": ["Expand rural coverage"],
    "averageRatings": {"connectivity": 1.0}
}"#;
