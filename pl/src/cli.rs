//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use promptcatalog::Category;
use std::path::PathBuf;
use tracing::debug;

/// PromptLab - prompt library and live test harness
#[derive(Parser)]
#[command(
    name = "pl",
    about = "Browse, render and test a library of LLM prompts",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Prompt library root (overrides config)
    #[arg(short = 'd', long = "dir", global = true, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List prompts, optionally for one category
    List {
        /// Category to filter by
        #[arg(long)]
        category: Option<Category>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List categories present in the library, with counts
    Categories,

    /// Search names, descriptions and tags
    Search {
        /// Case-insensitive substring
        query: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show one prompt in full
    Show {
        /// Prompt name
        name: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Render a prompt template without calling a model
    Render {
        /// Prompt name
        name: String,

        /// Parameter value, repeatable
        #[arg(short, long = "input", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        input: Vec<(String, String)>,
    },

    /// Report every invalid document in the library
    Validate,

    /// Show library statistics
    Stats {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Run one prompt against the model endpoint
    Test {
        /// Prompt name, or path to a prompt YAML file
        #[arg(value_name = "NAME_OR_PATH")]
        target: String,

        /// Parameter value, repeatable; overrides the first example's input
        #[arg(short, long = "input", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        input: Vec<(String, String)>,

        /// Model to use instead of the prompt's recommended model
        #[arg(short, long)]
        model: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Run every prompt with its first example
    TestAll {
        /// Model to use instead of each prompt's recommended model
        #[arg(short, long)]
        model: Option<String>,

        /// Category to filter by
        #[arg(long)]
        category: Option<Category>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Parse a `KEY=VALUE` pair; the value may itself contain `=`
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    debug!(%s, "parse_key_val: called");
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => Err(format!("invalid KEY=VALUE: no `=` or empty key in '{}'", s)),
    }
}

/// Output format for listing and result commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => {
                debug!(%s, "OutputFormat::from_str: unknown format");
                Err(format!("Unknown format: {}. Use: text or json", s))
            }
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Location of the log file
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("promptlab")
        .join("logs")
        .join("promptlab.log")
}
