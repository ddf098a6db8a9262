//! Shared value types for the SurveyLens domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values with invariants (e.g. ratings are integers in `1..=5`,
//! confidence scores are in `[0.0, 1.0]`) and participate in domain computations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wall-clock instant attached to submissions and analyses.
pub type Timestamp = DateTime<Utc>;

/// Ratings at or below this value are counted as negative feedback.
pub const NEGATIVE_RATING_THRESHOLD: u8 = 2;

// ---------------------------------------------------------------------------
// Ratings
// ---------------------------------------------------------------------------

/// A star rating in the range `1..=5`.
///
/// Used both for the per-dimension survey ratings entered by a customer and for
/// the overall satisfaction rating returned by sentiment analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Lowest valid rating.
    pub const MIN: u8 = 1;
    /// Highest valid rating.
    pub const MAX: u8 = 5;

    /// Creates a [`Rating`], returning `None` if `value` is outside `1..=5`.
    #[must_use]
    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    /// Rounds a fractional rating (as models sometimes return `4.5`) to the
    /// nearest integer star. Returns `None` when the rounded value is out of range.
    #[must_use]
    pub fn from_f64_rounded(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let rounded = value.round();
        if rounded < f64::from(Self::MIN) || rounded > f64::from(Self::MAX) {
            return None;
        }
        Self::new(rounded as u8)
    }

    /// Returns the rating as an integer.
    pub fn as_u8(self) -> u8 {
        self.0
    }

    /// Returns `true` if this rating counts as negative feedback.
    pub fn is_negative(self) -> bool {
        self.0 <= NEGATIVE_RATING_THRESHOLD
    }

    /// Satisfaction label for this rating, as used in sentiment distributions.
    pub fn satisfaction_key(self) -> &'static str {
        match self.0 {
            1 => "veryDissatisfied",
            2 => "dissatisfied",
            3 => "neutral",
            4 => "satisfied",
            _ => "verySatisfied",
        }
    }
}

impl TryFrom<u8> for Rating {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("rating {value} is outside 1..=5"))
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------

/// One of the four survey rating dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RatingDimension {
    Connectivity,
    CustomerService,
    InternetSpeed,
    Price,
}

impl RatingDimension {
    /// All dimensions in survey order.
    pub const ALL: [RatingDimension; 4] = [
        Self::Connectivity,
        Self::CustomerService,
        Self::InternetSpeed,
        Self::Price,
    ];

    /// Key used in `averageRatings` maps.
    pub fn key(self) -> &'static str {
        match self {
            Self::Connectivity => "connectivity",
            Self::CustomerService => "customerService",
            Self::InternetSpeed => "internetSpeed",
            Self::Price => "price",
        }
    }

    /// Human-readable label used in prompts.
    pub fn label(self) -> &'static str {
        match self {
            Self::Connectivity => "Connectivity",
            Self::CustomerService => "Customer Service",
            Self::InternetSpeed => "Internet Speed",
            Self::Price => "Price",
        }
    }
}

// ---------------------------------------------------------------------------
// Scores
// ---------------------------------------------------------------------------

/// Model-reported confidence in the range `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ConfidenceScore(f64);

impl ConfidenceScore {
    /// Creates a [`ConfidenceScore`], returning `None` if `value` is outside
    /// the valid range `[0.0, 1.0]`.
    #[must_use]
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Returns the score as an `f64` in `[0.0, 1.0]`.
    pub fn as_f64(self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for ConfidenceScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}%", self.0 * 100.0)
    }
}
