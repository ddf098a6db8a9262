//! Outcome of one store-then-analyse submission.
//!
//! A submission moves `Collected -> Stored -> Analyzed`. The store write and the
//! analysis update are separate writes, so a submission can end part-way; each
//! terminal state is its own [`SubmissionOutcome`] variant rather than being
//! inferred from which optional fields happen to be set.

use serde::{Serialize, Serializer};

use crate::{AnalysisError, AnalysisResult, RecordId, StoreError};

/// Furthest stage a submission reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStage {
    /// Input accepted, nothing persisted.
    Collected,
    /// Record persisted with status `pending_analysis`.
    Stored,
    /// Analysis attached and status `analyzed`.
    Analyzed,
}

/// Terminal state of a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// The initial write failed; nothing was persisted and no analysis was attempted.
    StoreFailed { error: StoreError },

    /// The record was persisted but analysis failed. It stays `pending_analysis`.
    Stored { id: RecordId, error: AnalysisError },

    /// The record was persisted and analysed, but attaching the analysis failed.
    /// The analysis is returned here and nowhere else.
    AnalysisUnattached {
        id: RecordId,
        analysis: AnalysisResult,
        error: StoreError,
    },

    /// The record was persisted and its analysis attached.
    StoredAndAnalyzed { id: RecordId, analysis: AnalysisResult },
}

impl SubmissionOutcome {
    /// Furthest stage reached.
    pub fn stage(&self) -> SubmissionStage {
        match self {
            Self::StoreFailed { .. } => SubmissionStage::Collected,
            Self::Stored { .. } | Self::AnalysisUnattached { .. } => SubmissionStage::Stored,
            Self::StoredAndAnalyzed { .. } => SubmissionStage::Analyzed,
        }
    }

    /// `true` only when every step succeeded.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::StoredAndAnalyzed { .. })
    }

    /// `true` when the record was persisted but analysis did not land on it.
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::Stored { .. } | Self::AnalysisUnattached { .. })
    }

    /// Id of the persisted record, if the first write succeeded.
    pub fn record_id(&self) -> Option<&RecordId> {
        match self {
            Self::StoreFailed { .. } => None,
            Self::Stored { id, .. }
            | Self::AnalysisUnattached { id, .. }
            | Self::StoredAndAnalyzed { id, .. } => Some(id),
        }
    }

    /// Analysis computed during the submission, attached or not.
    pub fn analysis(&self) -> Option<&AnalysisResult> {
        match self {
            Self::AnalysisUnattached { analysis, .. } | Self::StoredAndAnalyzed { analysis, .. } => {
                Some(analysis)
            }
            _ => None,
        }
    }

    /// User-facing error message, if any step failed.
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::StoreFailed { error } => Some(format!("Could not save submission: {error}")),
            Self::Stored { error, .. } => {
                Some(format!("Submission saved, but analysis failed: {error}"))
            }
            Self::AnalysisUnattached { error, .. } => Some(format!(
                "Submission saved and analysed, but the analysis could not be stored: {error}"
            )),
            Self::StoredAndAnalyzed { .. } => None,
        }
    }
}

impl Serialize for SubmissionOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Wire<'a> {
            ok: bool,
            partial: bool,
            stage: SubmissionStage,
            #[serde(skip_serializing_if = "Option::is_none")]
            record_id: Option<&'a RecordId>,
            #[serde(skip_serializing_if = "Option::is_none")]
            analysis: Option<&'a AnalysisResult>,
            #[serde(skip_serializing_if = "Option::is_none")]
            error: Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            raw_reply: Option<&'a str>,
        }

        let raw_reply = match self {
            Self::Stored { error, .. } => error.raw_reply(),
            _ => None,
        };

        Wire {
            ok: self.is_ok(),
            partial: self.is_partial(),
            stage: self.stage(),
            record_id: self.record_id(),
            analysis: self.analysis(),
            error: self.error_message(),
            raw_reply,
        }
        .serialize(serializer)
    }
}
