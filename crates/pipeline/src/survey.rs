//! Customer satisfaction survey responses.

use serde::{Deserialize, Serialize};

use crate::{Rating, RatingDimension, Timestamp};

/// One submitted customer satisfaction survey.
///
/// Ratings are optional so that partially filled forms (and legacy documents)
/// still round-trip; prompts render a missing value as `N/A`. Field names match
/// the stored document layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connectivity_rating: Option<Rating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_service_rating: Option<Rating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internet_speed_rating: Option<Rating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_rating: Option<Rating>,

    #[serde(default)]
    pub features_to_improve: String,
    #[serde(default)]
    pub most_important_aspects: String,
    #[serde(default)]
    pub other_aspects: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, rename = "yearAsCustomer")]
    pub years_as_customer: String,

    /// Client-side submission time. Distinct from the store-assigned `createdAt`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<Timestamp>,
}

impl SurveyResponse {
    /// Returns the rating recorded for `dimension`, if any.
    pub fn rating(&self, dimension: RatingDimension) -> Option<Rating> {
        match dimension {
            RatingDimension::Connectivity => self.connectivity_rating,
            RatingDimension::CustomerService => self.customer_service_rating,
            RatingDimension::InternetSpeed => self.internet_speed_rating,
            RatingDimension::Price => self.price_rating,
        }
    }

    /// Sets the rating for `dimension`.
    pub fn set_rating(&mut self, dimension: RatingDimension, rating: Option<Rating>) {
        let slot = match dimension {
            RatingDimension::Connectivity => &mut self.connectivity_rating,
            RatingDimension::CustomerService => &mut self.customer_service_rating,
            RatingDimension::InternetSpeed => &mut self.internet_speed_rating,
            RatingDimension::Price => &mut self.price_rating,
        };
        *slot = rating;
    }

    /// Mean of the ratings present, or `None` when no dimension was rated.
    pub fn mean_rating(&self) -> Option<f64> {
        let ratings: Vec<f64> = RatingDimension::ALL
            .iter()
            .filter_map(|d| self.rating(*d))
            .map(|r| f64::from(r.as_u8()))
            .collect();
        if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().sum::<f64>() / ratings.len() as f64)
        }
    }
}
