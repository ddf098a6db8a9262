//! Submission orchestrator: store, then analyse, then attach.

use pipeline::{
    AnalysisResult, AnalysisStatus, FeedbackChannel, FeedbackPayload, FeedbackRecord, RecordId,
    StoreError, SubmissionId, SubmissionOutcome, SurveyRecord, SurveyResponse, SummaryOutcome,
};
use serde_json::Value;
use tracing::field::{display, Empty};
use tracing::{info, instrument, warn, Span};

use crate::{AggregationGateway, AnalysisGateway, ListFilter, PersistenceGateway};

/// Drives a submission through `Collected -> Stored -> Analyzed`.
///
/// Steps run strictly in order and none is retried. The record is written
/// before analysis starts, so a model failure never loses a submission: the
/// record simply stays `pending_analysis` and can be picked up later by
/// [`Orchestrator::reanalyze_pending`].
#[derive(Clone)]
pub struct Orchestrator {
    surveys: PersistenceGateway,
    feedback: PersistenceGateway,
    analysis: AnalysisGateway,
    aggregation: AggregationGateway,
}

impl Orchestrator {
    /// Wires the gateways. `surveys` and `feedback` must target different collections.
    pub fn new(
        surveys: PersistenceGateway,
        feedback: PersistenceGateway,
        analysis: AnalysisGateway,
    ) -> Self {
        let aggregation = AggregationGateway::new(surveys.clone(), analysis.clone());
        Self {
            surveys,
            feedback,
            analysis,
            aggregation,
        }
    }

    /// Survey collection gateway.
    pub fn surveys(&self) -> &PersistenceGateway {
        &self.surveys
    }

    /// Feedback collection gateway.
    pub fn feedback(&self) -> &PersistenceGateway {
        &self.feedback
    }

    /// Analysis gateway, for analyses that are not persisted.
    pub fn analysis(&self) -> &AnalysisGateway {
        &self.analysis
    }

    /// Stores a survey response and attaches its analysis.
    #[instrument(skip_all, fields(submission_id = %SubmissionId::new_random(), record_id = Empty))]
    pub async fn submit(&self, survey: SurveyResponse) -> SubmissionOutcome {
        let id = match self.surveys.create_record(&survey).await {
            Ok(id) => id,
            Err(error) => return store_failed(error),
        };
        Span::current().record("record_id", display(&id));

        let analysis = self.analysis.analyze_survey(&survey).await;
        Self::finish(&self.surveys, id, analysis).await
    }

    /// Stores a piece of ad-hoc feedback and attaches its analysis.
    #[instrument(
        skip_all,
        fields(
            submission_id = %SubmissionId::new_random(),
            channel = %channel,
            record_id = Empty
        )
    )]
    pub async fn submit_feedback(
        &self,
        channel: FeedbackChannel,
        content: String,
        metadata: Option<Value>,
    ) -> SubmissionOutcome {
        let record = FeedbackRecord {
            channel,
            content,
            metadata,
        };
        let id = match self.feedback.create_record(&record).await {
            Ok(id) => id,
            Err(error) => return store_failed(error),
        };
        Span::current().record("record_id", display(&id));

        let analysis = self
            .analysis
            .analyze_feedback(&FeedbackPayload::for_record(&record))
            .await;
        Self::finish(&self.feedback, id, analysis).await
    }

    /// Analyses up to `limit` survey records still `pending_analysis`,
    /// newest first, one at a time.
    ///
    /// Each record gets its own outcome; a failure on one record does not stop
    /// the sweep. Only the initial listing can fail the call as a whole.
    #[instrument(skip(self))]
    pub async fn reanalyze_pending(
        &self,
        limit: u32,
    ) -> Result<Vec<SubmissionOutcome>, StoreError> {
        let filter = ListFilter {
            status: Some(AnalysisStatus::PendingAnalysis),
            limit,
            ..ListFilter::default()
        };
        let pending: Vec<SurveyRecord> = self.surveys.list(&filter).await?;
        info!(count = pending.len(), "Reanalysing pending records");
        Ok(self.reanalyze(pending).await)
    }

    /// Analyses every survey record again, analysed or not, replacing any
    /// analysis already attached.
    ///
    /// Records without `status` or `createdAt` are included. Per-record
    /// failures are reported in the outcomes and leave the previous analysis
    /// in place.
    #[instrument(skip(self))]
    pub async fn reanalyze_all(&self) -> Result<Vec<SubmissionOutcome>, StoreError> {
        let records: Vec<SurveyRecord> = self.surveys.list_all().await?;
        info!(count = records.len(), "Reanalysing every record");
        Ok(self.reanalyze(records).await)
    }

    async fn reanalyze(&self, records: Vec<SurveyRecord>) -> Vec<SubmissionOutcome> {
        let mut outcomes = Vec::with_capacity(records.len());
        for record in records {
            let analysis = self.analysis.analyze_survey(&record.body).await;
            outcomes.push(Self::finish(&self.surveys, record.id, analysis).await);
        }

        let completed = outcomes.iter().filter(|o| o.is_ok()).count();
        info!(completed, total = outcomes.len(), "Reanalysis sweep finished");
        outcomes
    }

    /// Produces the reviews summary report.
    pub async fn summary(&self) -> SummaryOutcome {
        self.aggregation.generate_summary().await
    }

    async fn finish(
        gateway: &PersistenceGateway,
        id: RecordId,
        analysis: Result<AnalysisResult, pipeline::AnalysisError>,
    ) -> SubmissionOutcome {
        let analysis = match analysis {
            Ok(analysis) => analysis,
            Err(error) => {
                warn!(record_id = %id, error = %error, "Record left pending analysis");
                return SubmissionOutcome::Stored { id, error };
            }
        };

        match gateway.attach_analysis(&id, &analysis).await {
            Ok(()) => {
                info!(record_id = %id, "Submission analysed");
                SubmissionOutcome::StoredAndAnalyzed { id, analysis }
            }
            Err(error) => SubmissionOutcome::AnalysisUnattached {
                id,
                analysis,
                error,
            },
        }
    }
}

fn store_failed(error: StoreError) -> SubmissionOutcome {
    warn!(error = %error, "Submission not stored; analysis skipped");
    SubmissionOutcome::StoreFailed { error }
}
