//! Summary report scenarios.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{orchestrator, surveys, FlakyStore, ScriptedModel, SUMMARY_REPLY};
use nodes::{PersistenceGateway, NO_RESPONSES_MESSAGE};
use pipeline::{ModelError, Rating, SummaryOutcome, SurveyResponse};
use serde_json::json;
use store::MemoryStore;

async fn seed(store: &Arc<MemoryStore>, connectivity: &[u8]) {
    let gateway = PersistenceGateway::new(store.clone(), surveys());
    for rating in connectivity {
        let survey = SurveyResponse {
            connectivity_rating: Rating::new(*rating),
            ..SurveyResponse::default()
        };
        gateway.create_record(&survey).await.unwrap();
    }
}

#[tokio::test]
async fn empty_collection_fails_without_calling_the_model() {
    let store = Arc::new(MemoryStore::new());
    let model = Arc::new(ScriptedModel::new().reply(SUMMARY_REPLY));

    let outcome = orchestrator(store, model.clone()).summary().await;

    assert_eq!(
        outcome,
        SummaryOutcome::Failed {
            error: NO_RESPONSES_MESSAGE.into()
        }
    );
    assert_eq!(model.calls(), 0);
    assert_eq!(serde_json::to_value(&outcome).unwrap()["success"], json!(false));
}

#[tokio::test]
async fn averages_and_counts_are_computed_locally() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, &[2, 4, 5]).await;
    let model = Arc::new(ScriptedModel::new().reply(SUMMARY_REPLY));

    let outcome = orchestrator(store, model).summary().await;

    let report = outcome.report().expect("summary succeeds");
    assert_eq!(report.total_reviews, 3);
    assert_eq!(report.negative_reviews_count, 1);
    let connectivity = report.summary.average_ratings["connectivity"];
    assert!((connectivity - 3.67).abs() < 0.01, "got {connectivity}");
    assert!(!report.summary.average_ratings.contains_key("price"));
    assert_eq!(report.summary.critical_issues, ["dropped calls"]);
    assert_eq!(report.summary.sentiment_distribution["unanalyzed"], 3);

    let wire = serde_json::to_value(&outcome).unwrap();
    assert_eq!(wire["success"], json!(true));
    assert_eq!(wire["totalReviews"], json!(3));
    assert_eq!(wire["negativeReviewsCount"], json!(1));
    assert_eq!(
        wire["summary"]["overallSummary"],
        json!("Customers value speed but complain about coverage.")
    );
}

#[tokio::test]
async fn repeated_summaries_agree_on_local_figures() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, &[1, 3]).await;
    let model = Arc::new(ScriptedModel::new().reply(SUMMARY_REPLY).reply(SUMMARY_REPLY));
    let orchestrator = orchestrator(store, model.clone());

    let first = orchestrator.summary().await;
    let second = orchestrator.summary().await;

    assert_eq!(model.calls(), 2);
    let (first, second) = (first.report().unwrap(), second.report().unwrap());
    assert_eq!(first.total_reviews, second.total_reviews);
    assert_eq!(first.negative_reviews_count, second.negative_reviews_count);
    assert_eq!(first.summary.average_ratings, second.summary.average_ratings);
}

#[tokio::test]
async fn model_failure_becomes_an_unsuccessful_result() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, &[4]).await;
    let model = Arc::new(ScriptedModel::new().fail(ModelError::Transport {
        message: "connection reset".into(),
    }));

    let outcome = orchestrator(store, model).summary().await;

    let SummaryOutcome::Failed { error } = outcome else {
        panic!("expected failure");
    };
    assert!(error.contains("connection reset"), "got {error}");
}

#[tokio::test]
async fn reply_without_overall_summary_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, &[4]).await;
    let model = Arc::new(ScriptedModel::new().reply(r#"{"mainTalkingPoints": ["speed"]}"#));

    let outcome = orchestrator(store, model).summary().await;

    assert!(!outcome.is_success());
}

#[tokio::test]
async fn model_sentiment_distribution_is_preferred() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, &[5]).await;
    let model = Arc::new(ScriptedModel::new().reply(
        r#"{"overallSummary": "Happy customers.", "sentimentDistribution": {"satisfied": 1}}"#,
    ));

    let outcome = orchestrator(store, model).summary().await;

    let report = outcome.report().unwrap();
    assert_eq!(report.summary.sentiment_distribution.get("satisfied"), Some(&1));
    assert!(!report.summary.sentiment_distribution.contains_key("unanalyzed"));
}

#[tokio::test]
async fn unreadable_collection_fails_without_calling_the_model() {
    let store = Arc::new(FlakyStore::new());
    // The only scripted call is the submission's analysis, which fails.
    let model = Arc::new(ScriptedModel::new());
    let orchestrator = orchestrator(store.clone(), model.clone());
    assert!(orchestrator.submit(SurveyResponse::default()).await.is_partial());

    store.fail_queries.store(true, Ordering::SeqCst);
    let outcome = orchestrator.summary().await;

    match &outcome {
        SummaryOutcome::Failed { error } => {
            assert!(error.starts_with("Could not read survey responses"), "got {error}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(model.calls(), 1);
    assert_eq!(serde_json::to_value(&outcome).unwrap()["success"], json!(false));
}
