//! Claimline Agents
//!
//! The decision agents and the boundary between their free-text output and
//! the rest of the pipeline.
//!
//! # Overview
//!
//! Every agent shares one invocation path, parameterized by [`AgentKind`]:
//!
//! 1. [`PromptLibrary`] loads the agent's versioned template and
//!    [`substitute`] fills in the claim fields
//! 2. The model is called on a blocking thread under a timeout
//! 3. [`parse_agent_output`] finds a JSON object in the completion
//! 4. [`validate_result`] checks it against the result schema
//! 5. Malformed output is retried; when the budget runs out the kind's
//!    [`fallback_result`] is used, which is never an approval
//!
//! [`DecisionPipeline`] sequences summarization, the fraud screen and
//! adjudication into a [`DecisionOutcome`].
//!
//! # Example Usage
//!
//! ```
//! use claimline_agents::{parse_agent_output, validate_result};
//! use claimline_domain::{AgentKind, Decision};
//!
//! let parsed = parse_agent_output("Sure! {\"decision\": \"continue\", \"confidence\": 0.2}").unwrap();
//! let result = validate_result(AgentKind::Fraud, parsed).unwrap();
//!
//! assert_eq!(result.decision, Decision::Continue);
//! assert_eq!(result.fraud_score(), Some(0.2));
//! ```
//!
//! [`AgentKind`]: claimline_domain::AgentKind

#![warn(missing_docs)]

mod config;
mod decision;
mod error;
mod invoker;
mod parser;
mod prompt;
mod validate;

pub use config::AgentConfig;
pub use decision::{parse_amount, DecisionOutcome, DecisionPipeline, Outcome};
pub use error::AgentError;
pub use invoker::{fallback_result, masked_snippet, AgentInvocation, AgentInvoker};
pub use parser::{parse_agent_output, ParsedOutput};
pub use prompt::{normalize_agent_name, substitute, PromptFields, PromptLibrary, LATEST};
pub use validate::{validate_result, EXTRACTED_FACTS_KEY, SUMMARY_KEY};
