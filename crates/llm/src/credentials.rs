//! API credential resolution.

use pipeline::ConfigError;

/// Environment variables checked for the Gemini API key, in priority order.
pub const API_KEY_VARIABLES: [&str; 3] = ["VITE_GEMINI_API_KEY", "GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// A generative-language API key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wraps an explicit key, rejecting blank values.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            None
        } else {
            Some(Self(key))
        }
    }

    /// Reads the key from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(|name| std::env::var(name).ok())
    }

    /// Returns the first non-blank value among [`API_KEY_VARIABLES`] as looked
    /// up by `lookup`.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        API_KEY_VARIABLES
            .iter()
            .find_map(|name| lookup(name).and_then(|value| Self::new(value)))
            .ok_or_else(|| ConfigError::MissingCredential {
                variables: API_KEY_VARIABLES.iter().map(|v| v.to_string()).collect(),
            })
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}
