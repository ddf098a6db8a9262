//! Sentiment analysis results and their decoding from model replies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::reply::{self, lenient_list, lenient_number, lenient_number_map, lenient_string};
use crate::{AnalysisError, ConfidenceScore, Rating};

/// Categorical sentiment, used when a model answers with a label instead of
/// (or in addition to) a numeric rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
    Mixed,
}

impl SentimentLabel {
    /// Interprets a free-form label such as `"Negative"`, `"very dissatisfied"`
    /// or `"mixed"`. Returns `None` for anything unrecognised.
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();
        if label.contains("mix") {
            Some(Self::Mixed)
        } else if label.contains("neg")
            || label.contains("dissatisf")
            || label.contains("unsatisf")
        {
            Some(Self::Negative)
        } else if label.contains("neutral") {
            Some(Self::Neutral)
        } else if label.contains("pos") || label.contains("satisf") {
            Some(Self::Positive)
        } else {
            None
        }
    }

    /// Key used in sentiment distributions.
    pub fn distribution_key(self) -> &'static str {
        match self {
            Self::Positive => "satisfied",
            Self::Neutral => "neutral",
            Self::Negative => "dissatisfied",
            Self::Mixed => "mixed",
        }
    }
}

// ---------------------------------------------------------------------------

/// The decoded outcome of analysing one survey response or feedback payload.
///
/// At least one of [`rating`](Self::rating) and [`sentiment`](Self::sentiment)
/// is always present. Stored under the `analysis` field of its source record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<SentimentLabel>,
    pub explanation: String,
    #[serde(default)]
    pub key_issues: Vec<String>,
    #[serde(default)]
    pub positive_aspects: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<ConfidenceScore>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub categories: BTreeMap<String, f64>,
}

impl AnalysisResult {
    /// Decodes a model reply into an [`AnalysisResult`].
    ///
    /// Accepts both the survey shape (`rating`, `explanation`, `keyIssues`,
    /// `positiveAspects`) and the free-text shape (`sentiment`, `score`,
    /// `mainTopics`, `summary`, `categories`).
    pub fn from_reply(text: &str) -> Result<Self, AnalysisError> {
        let shape: ReplyShape = reply::decode_reply(text)?;
        let shape_error = |reason: String| AnalysisError::Shape {
            reason,
            raw: text.to_string(),
        };

        let rating = match shape.rating {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                rating_from_value(&value)
                    .ok_or_else(|| shape_error(format!("rating {value} is not a 1-5 value")))?,
            ),
        };

        let sentiment = match shape.sentiment.as_deref() {
            None => None,
            Some(label) => Some(
                SentimentLabel::parse(label)
                    .ok_or_else(|| shape_error(format!("unrecognised sentiment '{label}'")))?,
            ),
        };

        if rating.is_none() && sentiment.is_none() {
            return Err(shape_error("reply has neither a rating nor a sentiment".into()));
        }

        let explanation = shape
            .explanation
            .or(shape.summary)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| shape_error("reply has no explanation".into()))?;

        // Out-of-range or non-numeric confidence is dropped; the analysis stands.
        let confidence = shape.score.and_then(ConfidenceScore::new);

        Ok(Self {
            rating,
            sentiment,
            explanation,
            key_issues: shape.key_issues,
            positive_aspects: shape.positive_aspects,
            topics: shape.topics,
            confidence,
            categories: shape.categories,
        })
    }

    /// Rebuilds an analysis stored in the flat survey layout, where the result
    /// sits beside the answers as `sentimentRating`, `sentimentExplanation`,
    /// `keyIssues` and `positiveAspects`.
    ///
    /// Returns `None` unless `sentimentRating` holds a 1-5 value.
    pub fn from_flat_fields(fields: &Map<String, Value>) -> Option<Self> {
        let rating = fields.get("sentimentRating").and_then(rating_from_value)?;
        let list = |key: &str| {
            fields
                .get(key)
                .cloned()
                .map_or_else(|| Ok(Vec::new()), lenient_list)
                .unwrap_or_default()
        };
        let explanation = fields
            .get("sentimentExplanation")
            .cloned()
            .and_then(|value| lenient_string(value).ok().flatten())
            .unwrap_or_default();

        Some(Self {
            rating: Some(rating),
            sentiment: None,
            explanation,
            key_issues: list("keyIssues"),
            positive_aspects: list("positiveAspects"),
            topics: Vec::new(),
            confidence: None,
            categories: BTreeMap::new(),
        })
    }

    /// Returns `true` if this analysis classifies its source as negative.
    pub fn is_negative(&self) -> bool {
        self.rating.is_some_and(Rating::is_negative)
            || self.sentiment == Some(SentimentLabel::Negative)
    }

    /// Key under which this analysis is tallied in a sentiment distribution.
    pub fn distribution_key(&self) -> &'static str {
        match (self.rating, self.sentiment) {
            (Some(rating), _) => rating.satisfaction_key(),
            (None, Some(label)) => label.distribution_key(),
            (None, None) => "unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Reply decoding
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplyShape {
    #[serde(default, alias = "sentimentRating")]
    rating: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string")]
    sentiment: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    explanation: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    key_issues: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    positive_aspects: Vec<String>,
    #[serde(default, alias = "mainTopics", deserialize_with = "lenient_list")]
    topics: Vec<String>,
    #[serde(default, alias = "confidence", deserialize_with = "lenient_number")]
    score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number_map")]
    categories: BTreeMap<String, f64>,
}

fn rating_from_value(value: &Value) -> Option<Rating> {
    reply::number_from_value(value).and_then(Rating::from_f64_rounded)
}
