//! Aggregate "reviews summary" report.
//!
//! Counts and averages are always computed locally from stored records
//! ([`SummaryStats::compute`]); only the narrative fields come from the model
//! ([`SummaryNarrative`]). The two are combined by [`SummaryReport::assemble`].

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::reply::{self, lenient_list, lenient_string};
use crate::{AnalysisError, RatingDimension, SurveyRecord, NEGATIVE_RATING_THRESHOLD};

/// Distribution key for records that have not been analysed yet.
pub const UNANALYZED_KEY: &str = "unanalyzed";

// ---------------------------------------------------------------------------
// Local statistics
// ---------------------------------------------------------------------------

/// Returns `true` if a stored survey counts as negative feedback.
///
/// The stored analysis decides when present; otherwise the mean of the
/// customer's own ratings is compared against the negative threshold.
pub fn is_negative_record(record: &SurveyRecord) -> bool {
    match &record.analysis {
        Some(analysis) => analysis.is_negative(),
        None => record
            .body
            .mean_rating()
            .is_some_and(|mean| mean <= f64::from(NEGATIVE_RATING_THRESHOLD)),
    }
}

/// Figures derived from stored records without involving the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub total_reviews: usize,
    pub negative_reviews_count: usize,
    /// Mean rating per dimension key; dimensions nobody rated are omitted.
    pub average_ratings: BTreeMap<String, f64>,
    /// Tally of stored analyses by satisfaction key.
    pub sentiment_distribution: BTreeMap<String, u64>,
}

impl SummaryStats {
    /// Computes totals, the negative count, per-dimension means and the
    /// locally observed sentiment distribution.
    pub fn compute(records: &[SurveyRecord]) -> Self {
        let mut sums: BTreeMap<&'static str, (f64, u32)> = BTreeMap::new();
        let mut distribution: BTreeMap<String, u64> = BTreeMap::new();

        for record in records {
            for dimension in RatingDimension::ALL {
                if let Some(rating) = record.body.rating(dimension) {
                    let entry = sums.entry(dimension.key()).or_insert((0.0, 0));
                    entry.0 += f64::from(rating.as_u8());
                    entry.1 += 1;
                }
            }

            let key = record
                .analysis
                .as_ref()
                .map_or(UNANALYZED_KEY, |analysis| analysis.distribution_key());
            *distribution.entry(key.to_string()).or_default() += 1;
        }

        Self {
            total_reviews: records.len(),
            negative_reviews_count: records.iter().filter(|r| is_negative_record(r)).count(),
            average_ratings: sums
                .into_iter()
                .map(|(key, (sum, count))| (key.to_string(), sum / f64::from(count)))
                .collect(),
            sentiment_distribution: distribution,
        }
    }
}

// ---------------------------------------------------------------------------
// Model narrative
// ---------------------------------------------------------------------------

/// Narrative fields produced by the model for a summary report.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryNarrative {
    #[serde(default, deserialize_with = "lenient_string")]
    pub overall_summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub main_talking_points: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub top_positive_aspects: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub critical_issues: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub recommendations: Vec<String>,
    #[serde(default, deserialize_with = "lenient_counts")]
    pub sentiment_distribution: Option<BTreeMap<String, u64>>,
}

impl SummaryNarrative {
    /// Decodes a model reply. An empty or missing `overallSummary` is a shape error.
    pub fn from_reply(text: &str) -> Result<Self, AnalysisError> {
        let narrative: Self = reply::decode_reply(text)?;
        if narrative
            .overall_summary
            .as_deref()
            .map_or(true, |s| s.trim().is_empty())
        {
            return Err(AnalysisError::Shape {
                reason: "reply has no overallSummary".into(),
                raw: text.to_string(),
            });
        }
        Ok(narrative)
    }
}

/// Accepts a map of label to count; non-numeric counts are dropped and
/// fractional counts rounded.
fn lenient_counts<'de, D>(deserializer: D) -> Result<Option<BTreeMap<String, u64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(Value::Object(map)) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(None);
    };

    let counts: BTreeMap<String, u64> = map
        .into_iter()
        .filter_map(|(label, value)| {
            let count = reply::number_from_value(&value)?;
            (count >= 0.0).then(|| (label, count.round() as u64))
        })
        .collect();

    Ok((!counts.is_empty()).then_some(counts))
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Body of a summary report, as rendered by the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryBody {
    pub overall_summary: String,
    pub main_talking_points: Vec<String>,
    pub top_positive_aspects: Vec<String>,
    pub critical_issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub sentiment_distribution: BTreeMap<String, u64>,
    pub average_ratings: BTreeMap<String, f64>,
}

/// A complete, ephemeral summary over every stored survey response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    pub total_reviews: usize,
    pub negative_reviews_count: usize,
    pub summary: SummaryBody,
}

impl SummaryReport {
    /// Combines locally computed statistics with the model narrative.
    ///
    /// The model's sentiment distribution is used when it supplied one;
    /// otherwise the locally observed tally is reported.
    pub fn assemble(stats: SummaryStats, narrative: SummaryNarrative) -> Self {
        Self {
            total_reviews: stats.total_reviews,
            negative_reviews_count: stats.negative_reviews_count,
            summary: SummaryBody {
                overall_summary: narrative.overall_summary.unwrap_or_default(),
                main_talking_points: narrative.main_talking_points,
                top_positive_aspects: narrative.top_positive_aspects,
                critical_issues: narrative.critical_issues,
                recommendations: narrative.recommendations,
                sentiment_distribution: narrative
                    .sentiment_distribution
                    .unwrap_or(stats.sentiment_distribution),
                average_ratings: stats.average_ratings,
            },
        }
    }
}

/// Result of a summary request. Failures are values, never raised errors.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryOutcome {
    Ready(SummaryReport),
    Failed { error: String },
}

impl SummaryOutcome {
    /// Returns `true` for [`SummaryOutcome::Ready`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Returns the report, if one was produced.
    pub fn report(&self) -> Option<&SummaryReport> {
        match self {
            Self::Ready(report) => Some(report),
            Self::Failed { .. } => None,
        }
    }
}

impl Serialize for SummaryOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            success: bool,
            #[serde(flatten)]
            report: Option<&'a SummaryReport>,
            #[serde(skip_serializing_if = "Option::is_none")]
            error: Option<&'a str>,
        }

        let wire = match self {
            Self::Ready(report) => Wire {
                success: true,
                report: Some(report),
                error: None,
            },
            Self::Failed { error } => Wire {
                success: false,
                report: None,
                error: Some(error),
            },
        };
        wire.serialize(serializer)
    }
}
