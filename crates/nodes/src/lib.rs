//! SurveyLens gateways and submission orchestrator.
//!
//! This crate sequences calls between the pure domain logic in the [`pipeline`]
//! crate and the infrastructure behind its port traits. It provides three
//! gateways and the orchestrator that drives a submission through them.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Gateways hold an `Arc<dyn DocumentStore>` or an
//! `Arc<dyn LanguageModel>` and contain no domain rules of their own: prompt
//! text, reply parsing and summary math all live in [`pipeline`].
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`persistence`] | `PersistenceGateway`, `ListFilter` |
//! | [`analysis`] | `AnalysisGateway` |
//! | [`aggregation`] | `AggregationGateway` |
//! | [`orchestrator`] | `Orchestrator` |

pub mod aggregation;
pub mod analysis;
pub mod orchestrator;
pub mod persistence;

pub use aggregation::{AggregationGateway, NO_RESPONSES_MESSAGE};
pub use analysis::AnalysisGateway;
pub use orchestrator::Orchestrator;
pub use persistence::{ListFilter, PersistenceGateway, DEFAULT_LIST_LIMIT};
