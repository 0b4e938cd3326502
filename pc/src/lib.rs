//! PromptCatalog - validated prompt library
//!
//! Loads a tree of YAML prompt documents into an in-memory [`Catalog`],
//! validating each document strictly at load time, and renders templates
//! against supplied parameter values.
//!
//! # Layout
//!
//! ```text
//! prompts/
//! ├── summarization/
//! │   ├── executive_summary.yaml
//! │   └── ...
//! ├── analysis/
//! └── code_generation/
//! ```
//!
//! The directory a document sits in must match its `category` field.
//!
//! # Example
//!
//! ```ignore
//! use promptcatalog::{Catalog, ParameterValues};
//!
//! let catalog = Catalog::load("prompts")?;
//! let prompt = catalog.get("executive_summary")?;
//! let mut values = ParameterValues::new();
//! values.insert("document".into(), report_text);
//! let text = prompt.render(&values)?;
//! ```

mod catalog;
mod definition;
mod error;
mod render;

pub use catalog::{Catalog, CatalogStats, LoadPolicy};
pub use definition::{
    Category, DEFAULT_MODEL, DEFAULT_VERSION, ParameterKind, ParameterSpec, PromptDefinition, PromptExample,
    PromptMetadata,
};
pub use error::{LoadError, MissingParameterError, NotFoundError, ValidationError};
pub use render::{ParameterValues, placeholders, render};
