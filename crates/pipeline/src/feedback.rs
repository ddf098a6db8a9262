//! Ad-hoc feedback records and free-text analysis payloads.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Channel and lifecycle
// ---------------------------------------------------------------------------

/// Where a piece of ad-hoc feedback came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackChannel {
    Social,
    Survey,
    Email,
}

impl FeedbackChannel {
    /// Stored tag value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Social => "social",
            Self::Survey => "survey",
            Self::Email => "email",
        }
    }
}

impl std::str::FromStr for FeedbackChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "social" => Ok(Self::Social),
            "survey" => Ok(Self::Survey),
            "email" => Ok(Self::Email),
            other => Err(format!("unknown feedback channel '{other}' (expected social, survey or email)")),
        }
    }
}

impl std::fmt::Display for FeedbackChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------

/// Lifecycle status of a stored record.
///
/// Transitions `PendingAnalysis -> Analyzed` exactly once per successful
/// analysis; the status and the `analysis` field are always written together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    PendingAnalysis,
    Analyzed,
}

impl AnalysisStatus {
    /// Stored status value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingAnalysis => "pending_analysis",
            Self::Analyzed => "analyzed",
        }
    }
}

impl std::str::FromStr for AnalysisStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending_analysis" => Ok(Self::PendingAnalysis),
            "analyzed" => Ok(Self::Analyzed),
            other => Err(format!("unknown analysis status '{other}'")),
        }
    }
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A piece of feedback captured outside the survey form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    #[serde(rename = "type")]
    pub channel: FeedbackChannel,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Analysis payloads
// ---------------------------------------------------------------------------

/// A labelled excerpt of free text to be analysed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    pub label: String,
    pub text: String,
}

/// An ordered set of labelled text excerpts submitted for one analysis.
///
/// Order is preserved so the rendered prompt is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackPayload {
    blocks: Vec<TextBlock>,
}

impl FeedbackPayload {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a labelled block.
    #[must_use]
    pub fn with_block(mut self, label: impl Into<String>, text: impl Into<String>) -> Self {
        self.blocks.push(TextBlock {
            label: label.into(),
            text: text.into(),
        });
        self
    }

    /// Payload for the three-channel demo form (social media, surveys, emails).
    pub fn from_channels(social_media: &str, surveys: &str, emails: &str) -> Self {
        Self::new()
            .with_block("Social Media", social_media)
            .with_block("Surveys", surveys)
            .with_block("Emails", emails)
    }

    /// Payload for a single stored feedback record.
    pub fn for_record(record: &FeedbackRecord) -> Self {
        let label = match record.channel {
            FeedbackChannel::Social => "Social Media",
            FeedbackChannel::Survey => "Survey",
            FeedbackChannel::Email => "Email",
        };
        Self::new().with_block(label, record.content.clone())
    }

    /// Blocks in insertion order.
    pub fn blocks(&self) -> &[TextBlock] {
        &self.blocks
    }

    /// Returns `true` if every block is blank.
    pub fn is_blank(&self) -> bool {
        self.blocks.iter().all(|b| b.text.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn channel_parses_case_insensitively() {
        assert_eq!("Email".parse::<FeedbackChannel>(), Ok(FeedbackChannel::Email));
        assert!("fax".parse::<FeedbackChannel>().is_err());
    }

    #[test]
    fn record_uses_type_tag_on_the_wire() {
        let record = FeedbackRecord {
            channel: FeedbackChannel::Social,
            content: "love the 5G".into(),
            metadata: None,
        };
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"type": "social", "content": "love the 5G"})
        );
    }

    #[test]
    fn status_round_trips_through_its_stored_form() {
        for status in [AnalysisStatus::PendingAnalysis, AnalysisStatus::Analyzed] {
            assert_eq!(status.as_str().parse::<AnalysisStatus>(), Ok(status));
        }
    }

    #[test]
    fn channel_payload_keeps_block_order() {
        let payload = FeedbackPayload::from_channels("a", "", "c");
        let labels: Vec<_> = payload.blocks().iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["Social Media", "Surveys", "Emails"]);
        assert!(!payload.is_blank());
        assert!(FeedbackPayload::from_channels(" ", "", "").is_blank());
    }
}
