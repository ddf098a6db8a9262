//! Environment configuration, read once at start-up.

use std::fmt::Display;
use std::str::FromStr;

use clap::ValueEnum;
use pipeline::{CollectionName, ConfigError, ModelName};
use store::FirestoreConfig;
use tracing::debug;

/// Which [`pipeline::DocumentStore`] backs the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// Cloud Firestore over REST (or its emulator).
    Firestore,
    /// Process-local store; contents vanish on exit.
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(Self::Firestore),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store '{other}' (expected firestore or memory)")),
        }
    }
}

/// Log output style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}' (expected pretty or json)")),
        }
    }
}

/// Non-secret settings. The model credential is resolved separately by the
/// `llm` crate so it never passes through here.
#[derive(Debug, Clone)]
pub struct Settings {
    pub store: StoreKind,
    pub model: ModelName,
    pub gemini_base_url: String,
    pub survey_collection: CollectionName,
    pub feedback_collection: CollectionName,
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, applying defaults for unset variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            store: try_load(&lookup, "SURVEYLENS_STORE", "firestore")?,
            model: named(&lookup, "SURVEYLENS_MODEL", "gemini-2.5-flash", |v| ModelName::new(v))?,
            gemini_base_url: try_load(
                &lookup,
                "SURVEYLENS_GEMINI_BASE_URL",
                llm::GeminiProvider::DEFAULT_BASE_URL,
            )?,
            survey_collection: named(
                &lookup,
                "SURVEYLENS_SURVEY_COLLECTION",
                "SurveyResponses",
                |v| CollectionName::new(v),
            )?,
            feedback_collection: named(
                &lookup,
                "SURVEYLENS_FEEDBACK_COLLECTION",
                "customer-feedback",
                |v| CollectionName::new(v),
            )?,
        })
    }
}

/// Log format from `SURVEYLENS_LOG_FORMAT`. Read before tracing is installed,
/// so it does not log.
pub fn log_format() -> Result<LogFormat, ConfigError> {
    match non_empty(&|key: &str| std::env::var(key).ok(), "SURVEYLENS_LOG_FORMAT") {
        None => Ok(LogFormat::Pretty),
        Some(value) => value.parse::<LogFormat>().map_err(|message| ConfigError::InvalidValue {
            variable: "SURVEYLENS_LOG_FORMAT".into(),
            message,
        }),
    }
}

/// Firestore connection settings.
pub fn firestore_config(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<FirestoreConfig, ConfigError> {
    let project_id =
        non_empty(&lookup, "FIRESTORE_PROJECT_ID").ok_or_else(|| ConfigError::MissingSetting {
            variable: "FIRESTORE_PROJECT_ID".into(),
        })?;

    let mut config = FirestoreConfig::new(project_id);
    if let Some(database) = non_empty(&lookup, "FIRESTORE_DATABASE") {
        config = config.with_database(database);
    }
    if let Some(host) = non_empty(&lookup, "FIRESTORE_EMULATOR_HOST") {
        debug!(%host, "Using Firestore emulator");
        config = config.with_emulator(&host);
    }
    if let Some(token) = non_empty(&lookup, "FIRESTORE_ACCESS_TOKEN") {
        config = config.with_access_token(token);
    }
    Ok(config)
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    non_empty(lookup, key)
        .unwrap_or_else(|| {
            debug!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            variable: key.to_string(),
            message: e.to_string(),
        })
}

fn named<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
    build: impl Fn(String) -> Option<T>,
) -> Result<T, ConfigError> {
    let value: String = try_load(lookup, key, default)?;
    build(value).ok_or_else(|| ConfigError::InvalidValue {
        variable: key.to_string(),
        message: "must not be empty".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.store, StoreKind::Firestore);
        assert_eq!(settings.model.as_str(), "gemini-2.5-flash");
        assert_eq!(settings.survey_collection.as_str(), "SurveyResponses");
        assert_eq!(settings.feedback_collection.as_str(), "customer-feedback");
        assert_eq!(settings.gemini_base_url, llm::GeminiProvider::DEFAULT_BASE_URL);
    }

    #[test]
    fn overrides_are_honoured() {
        let settings = Settings::from_lookup(lookup(&[
            ("SURVEYLENS_STORE", "Memory"),
            ("SURVEYLENS_MODEL", "gemini-1.5-flash"),
        ]))
        .unwrap();
        assert_eq!(settings.store, StoreKind::Memory);
        assert_eq!(settings.model.as_str(), "gemini-1.5-flash");
    }

    #[test]
    fn unknown_store_is_a_config_error() {
        let err = Settings::from_lookup(lookup(&[("SURVEYLENS_STORE", "postgres")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref variable, .. } if variable == "SURVEYLENS_STORE"));
    }

    #[test]
    fn firestore_requires_a_project() {
        let err = firestore_config(lookup(&[])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingSetting {
                variable: "FIRESTORE_PROJECT_ID".into()
            }
        );
    }

    #[test]
    fn firestore_settings_are_read() {
        let config = firestore_config(lookup(&[
            ("FIRESTORE_PROJECT_ID", "hackutd"),
            ("FIRESTORE_EMULATOR_HOST", "localhost:8080"),
        ]))
        .unwrap();
        assert_eq!(config.project_id, "hackutd");
        assert_eq!(config.base_url, "http://localhost:8080/v1");
    }
}
