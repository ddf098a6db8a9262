//! Aggregation gateway: the on-demand reviews summary report.

use pipeline::{
    prompts, SummaryNarrative, SummaryOutcome, SummaryReport, SummaryStats, SurveyRecord,
    SurveyResponse,
};
use tracing::{info, instrument, warn};

use crate::{AnalysisGateway, PersistenceGateway};

/// Message returned when there is nothing to summarise.
pub const NO_RESPONSES_MESSAGE: &str = "No survey responses have been submitted yet";

/// Builds summary reports over every stored survey response.
///
/// Reports are computed on demand and never stored. Counts and averages are
/// derived locally on every call; only the narrative comes from the model.
#[derive(Clone)]
pub struct AggregationGateway {
    surveys: PersistenceGateway,
    analysis: AnalysisGateway,
}

impl AggregationGateway {
    pub fn new(surveys: PersistenceGateway, analysis: AnalysisGateway) -> Self {
        Self { surveys, analysis }
    }

    /// Produces a summary report.
    ///
    /// Never returns an error: an empty collection, a store failure, a model
    /// failure and an unusable reply all yield [`SummaryOutcome::Failed`]. The
    /// model is not called when there are no records.
    #[instrument(skip_all, fields(collection = %self.surveys.collection()))]
    pub async fn generate_summary(&self) -> SummaryOutcome {
        let records: Vec<SurveyRecord> = match self.surveys.list_all::<SurveyResponse>().await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Survey responses could not be read");
                return SummaryOutcome::Failed {
                    error: format!("Could not read survey responses: {e}"),
                };
            }
        };

        if records.is_empty() {
            info!("No survey responses to summarise");
            return SummaryOutcome::Failed {
                error: NO_RESPONSES_MESSAGE.to_string(),
            };
        }

        let stats = SummaryStats::compute(&records);
        info!(
            total = stats.total_reviews,
            negative = stats.negative_reviews_count,
            "Summary statistics computed"
        );

        let reply = match self
            .analysis
            .complete_json(prompts::summary_prompt(&records, &stats))
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Summary model call failed");
                return SummaryOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        match SummaryNarrative::from_reply(&reply) {
            Ok(narrative) => SummaryOutcome::Ready(SummaryReport::assemble(stats, narrative)),
            Err(e) => {
                warn!(error = %e, "Summary reply rejected");
                SummaryOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}
