//! Error taxonomy for the SurveyLens domain.
//!
//! Each port has its own error type ([`StoreError`] for the document store,
//! [`ModelError`] for the generative-language API). [`AnalysisError`] wraps model
//! failures together with reply-parsing failures, and [`ConfigError`] covers
//! startup configuration problems.
//!
//! No error type here carries retry semantics: gateways never retry. A partial
//! failure (record stored, analysis not attached) is not an error at all but a
//! [`crate::SubmissionOutcome`] variant.

use thiserror::Error;

/// Failures reported by a [`crate::DocumentStore`] implementation.
///
/// Propagated verbatim through the persistence gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An update targeted a document that does not exist.
    #[error("Document {collection}/{id} not found")]
    NotFound {
        /// Collection that was searched.
        collection: String,
        /// Id that was not found.
        id: String,
    },

    /// The request never produced a response (DNS, TLS, connection reset, timeout).
    #[error("Store transport failure: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// The store answered with an error status (permission denied, quota, etc.).
    #[error("Store returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body or status text.
        message: String,
    },

    /// A stored document could not be converted into the expected record shape.
    #[error("Stored document could not be decoded: {message}")]
    Decode {
        /// Description of the decode failure.
        message: String,
    },

    /// A record could not be converted into document fields.
    #[error("Record could not be encoded: {message}")]
    Encode {
        /// Description of the encode failure.
        message: String,
    },
}

// ---------------------------------------------------------------------------

/// Failures reported by a [`crate::LanguageModel`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// The request never produced a response.
    #[error("Model transport failure: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// The model API answered with an error status.
    #[error("Model API returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated by the adapter if very large.
        body: String,
    },

    /// The API answered successfully but its body could not be decoded.
    #[error("Model response could not be decoded: {message}")]
    Decode {
        /// Decoder message.
        message: String,
    },

    /// The API answered successfully but produced no completion text.
    #[error("Model returned no completion: {detail}")]
    EmptyCompletion {
        /// Block reason or finish reason reported by the API, if any.
        detail: String,
    },
}

// ---------------------------------------------------------------------------

/// Failure to recover a JSON object from free-form model reply text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplyError {
    /// No `{...}` span exists in the reply.
    #[error("reply contains no JSON object")]
    NoJsonObject,

    /// A `{...}` span exists but does not decode as a JSON object.
    #[error("reply JSON is malformed: {message}")]
    Malformed {
        /// Decoder message for the first candidate span.
        message: String,
    },
}

// ---------------------------------------------------------------------------

/// Failures of a single analysis or summary model round-trip.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// The model call itself failed; surfaced unchanged.
    #[error("Model call failed: {0}")]
    Model(#[from] ModelError),

    /// The reply text could not be parsed as JSON.
    #[error("Model reply could not be parsed: {source}")]
    Unparseable {
        /// Underlying extraction error.
        source: ReplyError,
        /// Full reply text, kept for diagnostics.
        raw: String,
    },

    /// The reply parsed as JSON but lacks required fields or has invalid values.
    #[error("Model reply has unexpected shape: {reason}")]
    Shape {
        /// Which field is missing or invalid.
        reason: String,
        /// Full reply text, kept for diagnostics.
        raw: String,
    },
}

impl AnalysisError {
    /// Returns the raw reply text for parse-related failures.
    pub fn raw_reply(&self) -> Option<&str> {
        match self {
            Self::Model(_) => None,
            Self::Unparseable { raw, .. } | Self::Shape { raw, .. } => Some(raw),
        }
    }
}

// ---------------------------------------------------------------------------

/// Startup configuration problems. Fatal to the component that needs the setting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// None of the recognised credential variables holds a non-empty value.
    #[error("Missing API credential: set one of {}", .variables.join(", "))]
    MissingCredential {
        /// Variable names that were checked, in priority order.
        variables: Vec<String>,
    },

    /// A required setting is absent.
    #[error("Missing required setting {variable}")]
    MissingSetting {
        /// Name of the missing variable.
        variable: String,
    },

    /// A setting is present but cannot be interpreted.
    #[error("Invalid value for {variable}: {message}")]
    InvalidValue {
        /// Name of the offending variable.
        variable: String,
        /// Why the value was rejected.
        message: String,
    },
}

/// Longest error response body kept in [`StoreError::Status`] and
/// [`ModelError::Status`].
pub const MAX_ERROR_BODY: usize = 2_048;

/// Cuts an error response body to at most [`MAX_ERROR_BODY`] bytes, on a char
/// boundary.
pub fn truncate_error_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_lists_every_variable() {
        let err = ConfigError::MissingCredential {
            variables: vec!["A_KEY".into(), "B_KEY".into()],
        };
        assert_eq!(err.to_string(), "Missing API credential: set one of A_KEY, B_KEY");
    }

    #[test]
    fn raw_reply_is_only_present_for_parse_failures() {
        let model = AnalysisError::Model(ModelError::Transport {
            message: "reset".into(),
        });
        assert!(model.raw_reply().is_none());

        let parse = AnalysisError::Unparseable {
            source: ReplyError::NoJsonObject,
            raw: "sorry".into(),
        };
        assert_eq!(parse.raw_reply(), Some("sorry"));
    }

    #[test]
    fn long_error_bodies_are_cut_on_a_char_boundary() {
        // 'é' is two bytes, so byte MAX_ERROR_BODY falls inside a character.
        let body = format!("x{}", "é".repeat(MAX_ERROR_BODY));
        let cut = truncate_error_body(body);
        assert_eq!(cut.len(), MAX_ERROR_BODY - 1);
        assert!(cut.ends_with('é'));

        assert_eq!(truncate_error_body("short".into()), "short");
    }
}
