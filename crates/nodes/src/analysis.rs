//! Analysis gateway: prompt, model call, reply decoding.

use std::sync::Arc;

use pipeline::{
    prompts, AnalysisError, AnalysisResult, CompletionRequest, FeedbackPayload, LanguageModel,
    ModelError, ModelName, SurveyResponse,
};
use tracing::{debug, info, instrument, warn};

/// Turns survey responses and free-text feedback into [`AnalysisResult`]s.
///
/// Each call is exactly one model round-trip. Nothing is cached and nothing is
/// retried; model failures are surfaced unchanged inside [`AnalysisError`].
#[derive(Clone)]
pub struct AnalysisGateway {
    model: Arc<dyn LanguageModel>,
    model_name: ModelName,
}

impl AnalysisGateway {
    pub fn new(model: Arc<dyn LanguageModel>, model_name: ModelName) -> Self {
        Self { model, model_name }
    }

    /// Model this gateway targets.
    pub fn model_name(&self) -> &ModelName {
        &self.model_name
    }

    /// Analyses one survey response.
    #[instrument(skip_all, fields(model = %self.model_name))]
    pub async fn analyze_survey(
        &self,
        survey: &SurveyResponse,
    ) -> Result<AnalysisResult, AnalysisError> {
        self.analyze(prompts::survey_analysis_prompt(survey)).await
    }

    /// Analyses a set of labelled free-text excerpts.
    #[instrument(skip_all, fields(model = %self.model_name, blocks = payload.blocks().len()))]
    pub async fn analyze_feedback(
        &self,
        payload: &FeedbackPayload,
    ) -> Result<AnalysisResult, AnalysisError> {
        if payload.is_blank() {
            debug!("Every feedback block is blank");
        }
        self.analyze(prompts::feedback_analysis_prompt(payload)).await
    }

    /// Sends `prompt` and returns the raw JSON-mode completion text.
    pub async fn complete_json(&self, prompt: String) -> Result<String, ModelError> {
        let request = CompletionRequest::json(self.model_name.clone(), prompt);
        self.model.complete(&request).await
    }

    async fn analyze(&self, prompt: String) -> Result<AnalysisResult, AnalysisError> {
        let reply = self
            .complete_json(prompt)
            .await
            .inspect_err(|e| warn!(error = %e, "Model call failed"))?;

        match AnalysisResult::from_reply(&reply) {
            Ok(analysis) => {
                info!(
                    rating = analysis.rating.map(|r| r.as_u8()),
                    key_issues = analysis.key_issues.len(),
                    "Analysis complete"
                );
                Ok(analysis)
            }
            Err(e) => {
                warn!(error = %e, reply_chars = reply.len(), "Model reply rejected");
                Err(e)
            }
        }
    }
}
