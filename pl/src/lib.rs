//! PromptLab - live test harness for a prompt library
//!
//! Sends prompts from a [`promptcatalog::Catalog`] to a hosted model and
//! scores what comes back.
//!
//! # Modules
//!
//! - [`llm`] - LlmClient trait, Gemini and OpenAI clients, pricing
//! - [`tester`] - Tester, TestResult, quality scoring and batch reports
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod llm;
pub mod tester;

pub use config::{CatalogConfig, Config, LlmConfig};
pub use llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, ModelPrice, PriceTable, TokenUsage, create_client};
pub use tester::{BatchFailure, BatchReport, TestResult, Tester, TesterError, TesterOptions};
