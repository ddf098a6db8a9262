//! Prompt construction.
//!
//! Prompts are pure functions of their input: the same survey always yields the
//! same prompt text. Missing values render as `N/A`.

use crate::{
    FeedbackPayload, Rating, RatingDimension, SummaryStats, SurveyRecord, SurveyResponse,
};

const NOT_AVAILABLE: &str = "N/A";

fn text_or_na(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        NOT_AVAILABLE
    } else {
        trimmed
    }
}

fn rating_or_na(rating: Option<Rating>) -> String {
    rating.map_or_else(|| NOT_AVAILABLE.to_string(), |r| r.to_string())
}

/// Renders the survey fields as the data block embedded in prompts.
pub fn render_survey(survey: &SurveyResponse) -> String {
    let mut out = String::from("Customer Ratings:\n");
    for dimension in RatingDimension::ALL {
        out.push_str(&format!(
            "- {}: {}/5\n",
            dimension.label(),
            rating_or_na(survey.rating(dimension))
        ));
    }
    out.push_str(&format!(
        "\nCustomer Feedback:\n\
         - Features to Improve: {}\n\
         - Most Important Aspects: {}\n\
         - Other Aspects: {}\n\
         \nAdditional Information:\n\
         - Location: {}\n\
         - Years as Customer: {}\n",
        text_or_na(&survey.features_to_improve),
        text_or_na(&survey.most_important_aspects),
        text_or_na(&survey.other_aspects),
        text_or_na(&survey.location),
        text_or_na(&survey.years_as_customer),
    ));
    out
}

/// Prompt asking for a 1-5 satisfaction analysis of one survey response.
pub fn survey_analysis_prompt(survey: &SurveyResponse) -> String {
    format!(
        "You are analysing a customer satisfaction survey for a wireless carrier. \
Weigh the numerical ratings together with the written feedback.\n\
\n\
Assess:\n\
1. Overall satisfaction implied by the ratings\n\
2. Concerns and praise expressed in the written feedback\n\
3. Loyalty signals such as tenure as a customer\n\
\n\
Rate overall satisfaction from 1 to 5:\n\
1 = Very Dissatisfied, 2 = Dissatisfied, 3 = Neutral, 4 = Satisfied, 5 = Very Satisfied\n\
\n\
Respond with a single JSON object and nothing else, using these keys:\n\
- \"rating\": integer 1-5\n\
- \"explanation\": string explaining the rating\n\
- \"keyIssues\": array of strings, the main concerns (empty if none)\n\
- \"positiveAspects\": array of strings, the main positives (empty if none)\n\
\n\
Survey data:\n\
\n\
{}",
        render_survey(survey)
    )
}

/// Prompt asking for a categorical sentiment analysis of free-text excerpts.
pub fn feedback_analysis_prompt(payload: &FeedbackPayload) -> String {
    let mut excerpts = String::new();
    for block in payload.blocks() {
        excerpts.push_str(&format!("{}:\n{}\n\n", block.label, text_or_na(&block.text)));
    }

    format!(
        "You are analysing customer feedback for a wireless carrier collected from \
several channels.\n\
\n\
Respond with a single JSON object and nothing else, using these keys:\n\
- \"sentiment\": one of \"positive\", \"neutral\", \"negative\", \"mixed\"\n\
- \"score\": number between 0 and 1, your confidence in the sentiment\n\
- \"rating\": integer 1-5 overall satisfaction (1 = Very Dissatisfied, 5 = Very Satisfied)\n\
- \"summary\": string summarising the feedback\n\
- \"mainTopics\": array of strings\n\
- \"keyIssues\": array of strings (empty if none)\n\
- \"positiveAspects\": array of strings (empty if none)\n\
- \"categories\": object mapping topic name to a score between 0 and 1\n\
\n\
Feedback:\n\
\n\
{excerpts}"
    )
}

/// Prompt asking for a narrative summary across every stored survey.
///
/// Average ratings and counts are computed locally and handed to the model as
/// context; the model is not asked to recompute them.
pub fn summary_prompt(records: &[SurveyRecord], stats: &SummaryStats) -> String {
    let mut averages = String::new();
    for (dimension, mean) in &stats.average_ratings {
        averages.push_str(&format!("- {dimension}: {mean:.2}/5\n"));
    }
    if averages.is_empty() {
        averages.push_str(&format!("- {NOT_AVAILABLE}\n"));
    }

    let mut rendered = String::new();
    for (index, record) in records.iter().enumerate() {
        rendered.push_str(&format!("### Response {}\n", index + 1));
        rendered.push_str(&render_survey(&record.body));
        match &record.analysis {
            Some(analysis) => rendered.push_str(&format!(
                "Sentiment Rating: {}\nSentiment Explanation: {}\n",
                rating_or_na(analysis.rating),
                text_or_na(&analysis.explanation)
            )),
            None => rendered.push_str(&format!("Sentiment Rating: {NOT_AVAILABLE}\n")),
        }
        rendered.push('\n');
    }

    format!(
        "You are preparing a reviews summary report for a wireless carrier from \
{total} customer survey responses, {negative} of which are negative \
(overall rating of 2 or below).\n\
\n\
Average ratings:\n\
{averages}\n\
Respond with a single JSON object and nothing else, using these keys:\n\
- \"overallSummary\": string, a short narrative of overall customer sentiment\n\
- \"mainTalkingPoints\": array of strings, most important first\n\
- \"topPositiveAspects\": array of strings\n\
- \"criticalIssues\": array of strings (empty if none)\n\
- \"recommendations\": array of strings, ordered by priority, focused on resolving \
the negative feedback\n\
- \"sentimentDistribution\": object with integer counts for \"veryDissatisfied\", \
\"dissatisfied\", \"neutral\", \"satisfied\", \"verySatisfied\"\n\
\n\
Survey responses:\n\
\n\
{rendered}",
        total = stats.total_reviews,
        negative = stats.negative_reviews_count,
    )
}
