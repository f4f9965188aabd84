//! Claimline Orchestrator
//!
//! Runs claims through the pipeline: extraction, context assembly, the
//! decision agents and finalization.
//!
//! # Overview
//!
//! - [`LocalWorkflowStarter`] starts at most one run per claim and queues it
//! - [`PipelineWorker`] takes runs off the queue and executes each on its
//!   own task
//! - [`PipelineRunner`] moves a claim through the [`RunState`] machine,
//!   retrying transient step failures with backoff
//! - [`CommandHandler`] serves the JSON-lines protocol of the
//!   `claimline-worker` binary
//!
//! # Run States
//!
//! | State | Next | Notes |
//! |-------|------|-------|
//! | **Started** | Extracted | OCR and redaction of every received document |
//! | **Extracted** | ContextReady | Context bundle written |
//! | **ContextReady** | FraudScreened | Summarization and fraud screen |
//! | **FraudScreened** | Adjudicated, AwaitingReview, Finalized | A stopping screen skips adjudication |
//! | **Adjudicated** | AwaitingReview, Finalized | Large approvals go to a human |
//! | any running state | Failed | Claim parked in ERROR_REVIEW |
//!
//! # Configuration
//!
//! ```
//! use claimline_orchestrator::PipelineConfig;
//!
//! let config = PipelineConfig::from_toml(r#"
//!     [orchestrator]
//!     hitl_amount_threshold = 5000.0
//!     max_step_attempts = 4
//! "#).unwrap();
//!
//! assert_eq!(config.orchestrator.hitl_amount_threshold, 5000.0);
//! assert_eq!(config.agents.fraud_threshold, 0.70);
//! ```

#![warn(missing_docs)]

mod commands;
mod config;
mod error;
mod metrics;
mod runner;
mod starter;
mod state;
mod worker;

pub use commands::{CommandHandler, UploadCommand, WorkerCommand};
pub use config::{OrchestratorConfig, PipelineConfig};
pub use error::PipelineError;
pub use metrics::PipelineMetrics;
pub use runner::{PipelineRunner, RunReport};
pub use starter::{ExecutionInfo, LocalWorkflowStarter, RunRequest};
pub use state::RunState;
pub use worker::PipelineWorker;
