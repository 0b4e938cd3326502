//! Catalog error types

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that abort building a catalog
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk prompt directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// A malformed or inconsistent prompt document
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}: field `{field}`: {message}", location(.path))]
pub struct ValidationError {
    /// Document the problem was found in (None for inline documents)
    pub path: Option<PathBuf>,
    /// Offending field, e.g. `parameters[1].type`
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: Option<&Path>, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.map(Path::to_path_buf),
            field: field.into(),
            message: message.into(),
        }
    }
}

fn location(path: &Option<PathBuf>) -> String {
    path.as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<inline>".to_string())
}

/// Lookup miss for a prompt name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Prompt not found: {name}")]
pub struct NotFoundError {
    pub name: String,
}

/// Render-time mismatch between supplied values and declared parameters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Prompt '{prompt}': {}", describe(.missing, .undeclared))]
pub struct MissingParameterError {
    pub prompt: String,
    /// Required parameters with no supplied value
    pub missing: Vec<String>,
    /// Supplied keys the prompt does not declare
    pub undeclared: Vec<String>,
}

fn describe(missing: &[String], undeclared: &[String]) -> String {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("missing required parameter(s): {}", missing.join(", ")));
    }
    if !undeclared.is_empty() {
        parts.push(format!("undeclared parameter(s): {}", undeclared.join(", ")));
    }
    parts.join("; ")
}
