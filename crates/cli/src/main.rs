//! SurveyLens CLI entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration**: environment variables via [`config`], plus
//!    command-line flags.
//! 2. **Wire observability**: `tracing-subscriber` with a pretty or JSON layer
//!    and an optional OpenTelemetry OTLP exporter (see [`telemetry`]).
//! 3. **Construct infrastructure**: a `FirestoreStore` or `MemoryStore` and a
//!    `GeminiProvider`, injected into the `nodes` gateways.
//! 4. **Run one subcommand** and print its result to stdout as JSON.
//!
//! Partial submissions (stored but not analysed) exit with status 0; the JSON
//! reports `"partial": true`. Configuration errors and failed stores exit
//! non-zero.

mod config;
mod telemetry;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use config::{Settings, StoreKind};
use llm::GeminiProvider;
use nodes::{AnalysisGateway, ListFilter, Orchestrator, PersistenceGateway, DEFAULT_LIST_LIMIT};
use pipeline::{
    AnalysisStatus, DocumentStore, FeedbackChannel, FeedbackPayload, FeedbackRecord, Rating,
    RecordId, SubmissionOutcome, SurveyResponse,
};
use serde::Serialize;
use serde_json::Value;
use store::{FirestoreStore, MemoryStore};
use tracing::info;

#[derive(Parser)]
#[command(name = "surveylens")]
#[command(about = "Collect, analyse and summarise customer feedback", long_about = None)]
struct Cli {
    /// Document store backend (overrides SURVEYLENS_STORE)
    #[arg(long, global = true, value_enum)]
    store: Option<StoreKind>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a survey response and analyse it
    Submit(SurveyArgs),
    /// Store a piece of ad-hoc feedback and analyse it
    Feedback {
        #[arg(long)]
        channel: FeedbackChannel,
        #[arg(long)]
        content: String,
        /// Arbitrary JSON object stored with the feedback
        #[arg(long)]
        metadata: Option<String>,
    },
    /// Analyse free-text excerpts without storing anything
    Analyze {
        #[arg(long, default_value = "")]
        social: String,
        #[arg(long, default_value = "")]
        survey: String,
        #[arg(long, default_value = "")]
        email: String,
    },
    /// Generate a summary report over every stored survey response
    Summary,
    /// List stored records, newest first
    List {
        #[arg(long, value_enum, default_value_t = CollectionArg::Surveys)]
        collection: CollectionArg,
        #[arg(long)]
        channel: Option<FeedbackChannel>,
        #[arg(long)]
        status: Option<AnalysisStatus>,
        #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: u32,
    },
    /// Show one stored record
    Get {
        id: String,
        #[arg(long, value_enum, default_value_t = CollectionArg::Surveys)]
        collection: CollectionArg,
    },
    /// Analyse survey responses still pending analysis
    Reanalyze {
        #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: u32,
        /// Analyse every survey response again, replacing existing analyses
        #[arg(long, conflicts_with = "limit")]
        all: bool,
    },
}

#[derive(Args)]
struct SurveyArgs {
    /// Read the whole response from a JSON file instead of flags
    #[arg(
        long,
        conflicts_with_all = [
            "connectivity", "customer_service", "internet_speed", "price",
            "features_to_improve", "most_important_aspects", "other_aspects",
            "location", "years_as_customer",
        ]
    )]
    json: Option<PathBuf>,
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    connectivity: Option<u8>,
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    customer_service: Option<u8>,
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    internet_speed: Option<u8>,
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    price: Option<u8>,
    #[arg(long, default_value = "")]
    features_to_improve: String,
    #[arg(long, default_value = "")]
    most_important_aspects: String,
    #[arg(long, default_value = "")]
    other_aspects: String,
    #[arg(long, default_value = "")]
    location: String,
    #[arg(long, default_value = "")]
    years_as_customer: String,
}

impl SurveyArgs {
    fn into_response(self) -> anyhow::Result<SurveyResponse> {
        let mut response = match self.json {
            Some(path) => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                serde_json::from_str::<SurveyResponse>(&text)
                    .with_context(|| format!("{} is not a valid survey response", path.display()))?
            }
            None => SurveyResponse {
                connectivity_rating: self.connectivity.and_then(Rating::new),
                customer_service_rating: self.customer_service.and_then(Rating::new),
                internet_speed_rating: self.internet_speed.and_then(Rating::new),
                price_rating: self.price.and_then(Rating::new),
                features_to_improve: self.features_to_improve,
                most_important_aspects: self.most_important_aspects,
                other_aspects: self.other_aspects,
                location: self.location,
                years_as_customer: self.years_as_customer,
                submitted_at: None,
            },
        };
        response.submitted_at.get_or_insert_with(chrono::Utc::now);
        Ok(response)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CollectionArg {
    Surveys,
    Feedback,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let _telemetry = telemetry::init(config::log_format()?)?;

    let mut settings = Settings::load().context("invalid configuration")?;
    if let Some(kind) = cli.store {
        settings.store = kind;
    }

    match cli.command {
        Commands::Submit(args) => {
            let response = args.into_response()?;
            let orchestrator = build_orchestrator(&settings)?;
            report_submission(&orchestrator.submit(response).await)
        }
        Commands::Feedback {
            channel,
            content,
            metadata,
        } => {
            let metadata = metadata
                .map(|raw| serde_json::from_str::<Value>(&raw))
                .transpose()
                .context("--metadata must be valid JSON")?;
            let orchestrator = build_orchestrator(&settings)?;
            let outcome = orchestrator.submit_feedback(channel, content, metadata).await;
            report_submission(&outcome)
        }
        Commands::Analyze {
            social,
            survey,
            email,
        } => {
            let payload = FeedbackPayload::from_channels(&social, &survey, &email);
            let analysis = build_analysis(&settings)?
                .analyze_feedback(&payload)
                .await
                .context("analysis failed")?;
            print_json(&analysis)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Summary => {
            let orchestrator = build_orchestrator(&settings)?;
            let outcome = orchestrator.summary().await;
            print_json(&outcome)?;
            Ok(if outcome.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::List {
            collection,
            channel,
            status,
            limit,
        } => {
            let filter = ListFilter {
                channel,
                status,
                limit,
            };
            let (surveys, feedback) = gateways(&settings)?;
            match collection {
                CollectionArg::Surveys => {
                    print_json(&surveys.list::<SurveyResponse>(&filter).await?)?;
                }
                CollectionArg::Feedback => {
                    print_json(&feedback.list::<FeedbackRecord>(&filter).await?)?;
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Get { id, collection } => {
            let id = RecordId::new(id).context("record id must not be empty")?;
            let (surveys, feedback) = gateways(&settings)?;
            let found = match collection {
                CollectionArg::Surveys => surveys
                    .get::<SurveyResponse>(&id)
                    .await?
                    .map(|r| serde_json::to_value(&r))
                    .transpose()?,
                CollectionArg::Feedback => feedback
                    .get::<FeedbackRecord>(&id)
                    .await?
                    .map(|r| serde_json::to_value(&r))
                    .transpose()?,
            };
            print_json(&found)?;
            Ok(if found.is_some() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Reanalyze { limit, all } => {
            let orchestrator = build_orchestrator(&settings)?;
            let outcomes = if all {
                orchestrator.reanalyze_all().await?
            } else {
                orchestrator.reanalyze_pending(limit).await?
            };
            info!(count = outcomes.len(), "Reanalysis finished");
            print_json(&outcomes)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn build_store(settings: &Settings) -> anyhow::Result<Arc<dyn DocumentStore>> {
    Ok(match settings.store {
        StoreKind::Memory => {
            info!("Using in-memory store; records are discarded on exit");
            Arc::new(MemoryStore::new())
        }
        StoreKind::Firestore => {
            let config = config::firestore_config(|key| std::env::var(key).ok())
                .context("invalid Firestore configuration")?;
            info!(project = %config.project_id, database = %config.database, "Using Firestore");
            Arc::new(FirestoreStore::new(config).context("failed to create Firestore client")?)
        }
    })
}

/// Survey and feedback gateways over the configured store.
fn gateways(settings: &Settings) -> anyhow::Result<(PersistenceGateway, PersistenceGateway)> {
    let store = build_store(settings)?;
    Ok((
        PersistenceGateway::new(store.clone(), settings.survey_collection.clone()),
        PersistenceGateway::new(store, settings.feedback_collection.clone()),
    ))
}

fn build_orchestrator(settings: &Settings) -> anyhow::Result<Orchestrator> {
    let analysis = build_analysis(settings)?;
    let (surveys, feedback) = gateways(settings)?;
    Ok(Orchestrator::new(surveys, feedback, analysis))
}

fn build_analysis(settings: &Settings) -> anyhow::Result<AnalysisGateway> {
    let provider = GeminiProvider::from_env()
        .context("failed to configure the language model")?
        .with_base_url(settings.gemini_base_url.as_str());
    Ok(AnalysisGateway::new(Arc::new(provider), settings.model.clone()))
}

fn report_submission(outcome: &SubmissionOutcome) -> anyhow::Result<ExitCode> {
    print_json(outcome)?;
    Ok(match outcome {
        SubmissionOutcome::StoreFailed { .. } => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{text}");
    Ok(())
}
