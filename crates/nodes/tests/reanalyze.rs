//! Manual reanalysis of records left pending.

mod common;

use std::sync::Arc;

use common::{orchestrator, surveys, ScriptedModel, NEGATIVE_REPLY, POSITIVE_REPLY};
use nodes::{ListFilter, PersistenceGateway};
use pipeline::{AnalysisStatus, ModelError, Rating, RecordId, SurveyResponse};
use pipeline::DocumentStore;
use serde_json::{json, Value};
use store::MemoryStore;

fn offline() -> ModelError {
    ModelError::Transport {
        message: "offline".into(),
    }
}

#[tokio::test]
async fn sweep_continues_past_failures() {
    let store = Arc::new(MemoryStore::new());
    // Two submissions fail analysis, then the sweep gets one good and one bad reply.
    let model = Arc::new(
        ScriptedModel::new()
            .fail(offline())
            .fail(offline())
            .reply(POSITIVE_REPLY)
            .reply("not json"),
    );
    let orchestrator = orchestrator(store.clone(), model.clone());

    let older = orchestrator.submit(SurveyResponse::default()).await;
    let newer = orchestrator.submit(SurveyResponse::default()).await;
    assert!(older.is_partial() && newer.is_partial());

    let outcomes = orchestrator.reanalyze_pending(10).await.unwrap();

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].record_id(), newer.record_id());
    assert!(outcomes[0].is_ok());
    assert!(outcomes[1].is_partial());
    assert_eq!(model.calls(), 4);

    let gateway = PersistenceGateway::new(store.clone(), surveys());
    let pending = gateway
        .list::<SurveyResponse>(&ListFilter {
            status: Some(AnalysisStatus::PendingAnalysis),
            ..ListFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(Some(&pending[0].id), older.record_id());
}

#[tokio::test]
async fn sweep_respects_limit_and_skips_analyzed_records() {
    let store = Arc::new(MemoryStore::new());
    let model = Arc::new(
        ScriptedModel::new()
            .reply(POSITIVE_REPLY)
            .fail(offline())
            .fail(offline())
            .reply(NEGATIVE_REPLY),
    );
    let orchestrator = orchestrator(store, model.clone());

    assert!(orchestrator.submit(SurveyResponse::default()).await.is_ok());
    orchestrator.submit(SurveyResponse::default()).await;
    orchestrator.submit(SurveyResponse::default()).await;

    let outcomes = orchestrator.reanalyze_pending(1).await.unwrap();

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_ok());
    assert_eq!(model.calls(), 4);
}

#[tokio::test]
async fn nothing_pending_means_no_model_calls() {
    let store = Arc::new(MemoryStore::new());
    let model = Arc::new(ScriptedModel::new());

    let outcomes = orchestrator(store, model.clone())
        .reanalyze_pending(10)
        .await
        .unwrap();

    assert!(outcomes.is_empty());
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn full_sweep_replaces_existing_analysis() {
    let store = Arc::new(MemoryStore::new());
    let model = Arc::new(
        ScriptedModel::new()
            .reply(POSITIVE_REPLY)
            .reply(NEGATIVE_REPLY),
    );
    let orchestrator = orchestrator(store.clone(), model.clone());

    let first = orchestrator.submit(SurveyResponse::default()).await;
    assert!(first.is_ok());
    let id = first.record_id().cloned().unwrap();

    let outcomes = orchestrator.reanalyze_all().await.unwrap();

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_ok());
    let record = orchestrator
        .surveys()
        .get::<SurveyResponse>(&id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, AnalysisStatus::Analyzed);
    let analysis = record.analysis.unwrap();
    assert_eq!(analysis.rating, Rating::new(1));
    assert_eq!(analysis.key_issues, ["dropped calls", "price"]);
}

#[tokio::test]
async fn full_sweep_includes_records_without_bookkeeping_fields() {
    let store = Arc::new(MemoryStore::new());
    let Value::Object(fields) = json!({
        "connectivityRating": 2,
        "submittedAt": "2024-11-16T10:00:00.000Z",
        "sentimentRating": 4,
        "sentimentExplanation": "mostly fine"
    }) else {
        unreachable!()
    };
    let legacy: RecordId = store.create(&surveys(), fields, &[]).await.unwrap();
    let model = Arc::new(ScriptedModel::new().reply(NEGATIVE_REPLY));
    let orchestrator = orchestrator(store.clone(), model.clone());

    assert!(orchestrator.reanalyze_pending(10).await.unwrap().is_empty());
    let outcomes = orchestrator.reanalyze_all().await.unwrap();

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].record_id(), Some(&legacy));
    assert!(outcomes[0].is_ok());
    assert_eq!(model.calls(), 1);

    let record = orchestrator
        .surveys()
        .get::<SurveyResponse>(&legacy)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.analysis.unwrap().rating, Rating::new(1));
}

#[tokio::test]
async fn failed_full_sweep_keeps_previous_analysis() {
    let store = Arc::new(MemoryStore::new());
    let model = Arc::new(ScriptedModel::new().reply(POSITIVE_REPLY).fail(offline()));
    let orchestrator = orchestrator(store, model);

    let id = orchestrator
        .submit(SurveyResponse::default())
        .await
        .record_id()
        .cloned()
        .unwrap();
    let outcomes = orchestrator.reanalyze_all().await.unwrap();

    assert!(outcomes[0].is_partial());
    let record = orchestrator
        .surveys()
        .get::<SurveyResponse>(&id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, AnalysisStatus::Analyzed);
    assert_eq!(record.analysis.unwrap().rating, Rating::new(5));
}
