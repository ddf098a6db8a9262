//! Typed view over stored documents.
//!
//! A stored record is its submitted body (survey or feedback) plus the
//! bookkeeping fields the persistence layer owns: lifecycle status, creation
//! time, and the attached analysis.

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::{
    AnalysisResult, AnalysisStatus, FeedbackRecord, RecordId, StoreError, StoredDocument,
    SurveyResponse,
};

/// Field names owned by the persistence layer.
pub mod fields {
    /// Lifecycle status (`pending_analysis` / `analyzed`).
    pub const STATUS: &str = "status";
    /// Serialized [`crate::AnalysisResult`].
    pub const ANALYSIS: &str = "analysis";
    /// Server-assigned creation time.
    pub const CREATED_AT: &str = "createdAt";
    /// Server-assigned time of the last analysis.
    pub const ANALYZED_AT: &str = "analyzedAt";
    /// Feedback channel tag.
    pub const CHANNEL: &str = "type";
}

/// A decoded record: body `T` plus persistence bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord<T> {
    pub id: RecordId,
    pub body: T,
    pub status: AnalysisStatus,
    pub analysis: Option<AnalysisResult>,
    /// RFC 3339 creation time, when the store recorded one.
    pub created_at: Option<String>,
}

/// A stored survey response.
pub type SurveyRecord = StoredRecord<SurveyResponse>;

/// A stored ad-hoc feedback record.
pub type FeedbackEntry = StoredRecord<FeedbackRecord>;

impl<T: DeserializeOwned> StoredRecord<T> {
    /// Decodes a stored document.
    ///
    /// Documents written before status tracking existed have no `status` field;
    /// their status is inferred from whether an analysis is attached. Such
    /// documents may carry the analysis as flat top-level fields instead of an
    /// `analysis` map (see [`AnalysisResult::from_flat_fields`]). A document
    /// whose explicit status contradicts its analysis is rejected with
    /// [`StoreError::Decode`].
    pub fn from_document(document: StoredDocument) -> Result<Self, StoreError> {
        let StoredDocument { id, fields: map } = document;
        let decode_error = |message: String| StoreError::Decode {
            message: format!("{id}: {message}"),
        };

        let analysis = match map.get(fields::ANALYSIS) {
            None | Some(Value::Null) => AnalysisResult::from_flat_fields(&map),
            Some(value) => Some(
                serde_json::from_value::<AnalysisResult>(value.clone())
                    .map_err(|e| decode_error(format!("invalid analysis: {e}")))?,
            ),
        };

        let status = match map.get(fields::STATUS) {
            None | Some(Value::Null) => {
                if analysis.is_some() {
                    AnalysisStatus::Analyzed
                } else {
                    AnalysisStatus::PendingAnalysis
                }
            }
            Some(Value::String(s)) => s.parse::<AnalysisStatus>().map_err(decode_error)?,
            Some(other) => return Err(decode_error(format!("invalid status {other}"))),
        };

        if (status == AnalysisStatus::Analyzed) != analysis.is_some() {
            return Err(decode_error(format!(
                "status '{status}' disagrees with analysis field presence"
            )));
        }

        let created_at = match map.get(fields::CREATED_AT) {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        };

        let body = serde_json::from_value::<T>(Value::Object(map))
            .map_err(|e| decode_error(format!("invalid record body: {e}")))?;

        Ok(Self {
            id,
            body,
            status,
            analysis,
            created_at,
        })
    }
}

/// Serializes as the stored document layout: body fields flattened alongside
/// `id`, `status`, `createdAt` and `analysis`.
impl<T: Serialize> Serialize for StoredRecord<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Wire<'a, T> {
            id: &'a RecordId,
            status: AnalysisStatus,
            #[serde(skip_serializing_if = "Option::is_none")]
            created_at: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            analysis: Option<&'a AnalysisResult>,
            #[serde(flatten)]
            body: &'a T,
        }

        Wire {
            id: &self.id,
            status: self.status,
            created_at: self.created_at.as_deref(),
            analysis: self.analysis.as_ref(),
            body: &self.body,
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FeedbackChannel, Rating};
    use serde_json::json;

    fn document(fields: Value) -> StoredDocument {
        StoredDocument {
            id: RecordId::new("doc-1").unwrap(),
            fields: match fields {
                Value::Object(map) => map,
                _ => unreachable!(),
            },
        }
    }

    #[test]
    fn decodes_analyzed_survey() {
        let record = SurveyRecord::from_document(document(json!({
            "connectivityRating": 1,
            "status": "analyzed",
            "createdAt": "2026-01-02T03:04:05Z",
            "analysis": {"rating": 2, "explanation": "poor coverage", "keyIssues": ["coverage"], "positiveAspects": []}
        })))
        .unwrap();

        assert_eq!(record.status, AnalysisStatus::Analyzed);
        assert_eq!(record.body.connectivity_rating, Rating::new(1));
        assert_eq!(record.analysis.unwrap().key_issues, ["coverage"]);
        assert_eq!(record.created_at.as_deref(), Some("2026-01-02T03:04:05Z"));
    }

    #[test]
    fn legacy_document_status_is_inferred() {
        let record = SurveyRecord::from_document(document(json!({"priceRating": 3}))).unwrap();
        assert_eq!(record.status, AnalysisStatus::PendingAnalysis);
        assert!(record.analysis.is_none());
    }

    #[test]
    fn flat_layout_analysis_counts_as_analyzed() {
        let record = SurveyRecord::from_document(document(json!({
            "connectivityRating": 4,
            "customerServiceRating": 4,
            "internetSpeedRating": 4,
            "priceRating": 4,
            "submittedAt": "2024-11-16T10:00:00.000Z",
            "sentimentRating": 1,
            "sentimentExplanation": "angry about billing",
            "keyIssues": ["billing"],
            "positiveAspects": [],
            "analyzedAt": "2024-11-16T10:00:05.000Z"
        })))
        .unwrap();

        assert_eq!(record.status, AnalysisStatus::Analyzed);
        let analysis = record.analysis.as_ref().unwrap();
        assert_eq!(analysis.rating, Rating::new(1));
        assert_eq!(analysis.key_issues, ["billing"]);
        assert!(crate::summary::is_negative_record(&record));

        let stats = crate::SummaryStats::compute(std::slice::from_ref(&record));
        assert_eq!(stats.negative_reviews_count, 1);
        assert!(!stats.sentiment_distribution.contains_key(crate::summary::UNANALYZED_KEY));
    }

    #[test]
    fn contradictory_status_is_rejected() {
        let err = SurveyRecord::from_document(document(json!({"status": "analyzed"}))).unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }

    #[test]
    fn decodes_feedback_entry() {
        let entry = FeedbackEntry::from_document(document(json!({
            "type": "email",
            "content": "billing issue",
            "status": "pending_analysis"
        })))
        .unwrap();
        assert_eq!(entry.body.channel, FeedbackChannel::Email);
        assert_eq!(entry.status, AnalysisStatus::PendingAnalysis);
    }

    #[test]
    fn serializes_body_alongside_bookkeeping() {
        let record = SurveyRecord::from_document(document(json!({
            "priceRating": 4,
            "location": "Austin",
            "createdAt": "2026-01-02T03:04:05Z"
        })))
        .unwrap();
        let wire = serde_json::to_value(&record).unwrap();
        assert_eq!(wire["id"], json!("doc-1"));
        assert_eq!(wire["status"], json!("pending_analysis"));
        assert_eq!(wire["createdAt"], json!("2026-01-02T03:04:05Z"));
        assert_eq!(wire["priceRating"], json!(4));
        assert_eq!(wire["location"], json!("Austin"));
        assert!(wire.get("analysis").is_none());
    }
}
