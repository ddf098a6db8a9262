//! Core feedback-analysis domain for SurveyLens.
//!
//! This crate contains every domain concept, newtype identifier, value type, and
//! error type used throughout the workspace, together with the pure pieces of
//! the collect → persist → analyse → aggregate pipeline: prompt construction,
//! model-reply parsing, and local aggregation math. Infrastructure crates
//! implement the port traits defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`RecordId`, `CollectionName`, `ModelName`, `SubmissionId`) |
//! | [`types`] | Value types with invariants (`Rating`, `ConfidenceScore`, `RatingDimension`) |
//! | [`errors`] | `StoreError`, `ModelError`, `ReplyError`, `AnalysisError`, `ConfigError` |
//! | [`survey`] | `SurveyResponse` |
//! | [`feedback`] | `FeedbackRecord`, `FeedbackChannel`, `AnalysisStatus`, `FeedbackPayload` |
//! | [`analysis`] | `AnalysisResult`, `SentimentLabel` |
//! | [`record`] | `StoredRecord` and the persistence-owned field names |
//! | [`reply`] | JSON-object extraction from model replies |
//! | [`prompts`] | Deterministic prompt builders |
//! | [`summary`] | Local statistics, model narrative, `SummaryReport` |
//! | [`submission`] | `SubmissionOutcome` state-tagged result |
//! | [`ports`] | `DocumentStore` and `LanguageModel` traits |

pub mod analysis;
pub mod errors;
pub mod feedback;
pub mod identifiers;
pub mod ports;
pub mod prompts;
pub mod record;
pub mod reply;
pub mod submission;
pub mod summary;
pub mod survey;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use analysis::{AnalysisResult, SentimentLabel};
pub use errors::{
    truncate_error_body, AnalysisError, ConfigError, ModelError, ReplyError, StoreError,
    MAX_ERROR_BODY,
};
pub use feedback::{AnalysisStatus, FeedbackChannel, FeedbackPayload, FeedbackRecord, TextBlock};
pub use identifiers::{CollectionName, ModelName, RecordId, SubmissionId};
pub use ports::{
    CompletionRequest, DocumentPatch, DocumentQuery, DocumentStore, Fields, LanguageModel,
    ResponseFormat, StoredDocument,
};
pub use record::{FeedbackEntry, StoredRecord, SurveyRecord};
pub use reply::{decode_reply, extract_json_object};
pub use submission::{SubmissionOutcome, SubmissionStage};
pub use summary::{
    is_negative_record, SummaryBody, SummaryNarrative, SummaryOutcome, SummaryReport,
    SummaryStats,
};
pub use survey::SurveyResponse;
pub use types::{ConfidenceScore, Rating, RatingDimension, Timestamp, NEGATIVE_RATING_THRESHOLD};
