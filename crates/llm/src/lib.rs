//! SurveyLens generative-language provider adapter.
//!
//! Implements the [`pipeline::LanguageModel`] trait for Google's Gemini API.
//! Additional providers are added as new `impl` blocks in this crate without any
//! changes to the `pipeline` crate.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, request formatting, response parsing and
//! credential resolution live here. The [`pipeline`] crate sees only
//! [`pipeline::LanguageModel`] and [`pipeline::ModelError`]. Reply *content*
//! (the JSON object inside the completion) is parsed by the domain, not here.

pub mod credentials;
pub mod gemini;

pub use credentials::{ApiKey, API_KEY_VARIABLES};
pub use gemini::{GeminiProvider, ProviderInitError};
