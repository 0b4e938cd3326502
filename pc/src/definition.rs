//! Prompt definition schema
//!
//! A prompt document is parsed leniently into raw structs and then validated
//! into an immutable [`PromptDefinition`]. Every rejection names the document
//! and the offending field.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::debug;

use crate::error::{LoadError, MissingParameterError, ValidationError};
use crate::render::{self, ParameterValues};

/// Model used when a document does not recommend one
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";

/// Version label used when a document does not carry one
pub const DEFAULT_VERSION: &str = "1.0";

const DEFAULT_EXPECTED_TOKENS: i64 = 500;
const DEFAULT_TEMPERATURE: f64 = 0.7;
const MAX_TEMPERATURE: f64 = 2.0;

/// Domain tag of a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Summarization,
    Analysis,
    CodeGeneration,
    ContentCreation,
    DataExtraction,
    CustomerService,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Summarization,
        Category::Analysis,
        Category::CodeGeneration,
        Category::ContentCreation,
        Category::DataExtraction,
        Category::CustomerService,
    ];

    /// Canonical (directory) spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summarization => "summarization",
            Self::Analysis => "analysis",
            Self::CodeGeneration => "code_generation",
            Self::ContentCreation => "content_creation",
            Self::DataExtraction => "data_extraction",
            Self::CustomerService => "customer_service",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Accepts the snake_case spelling and the hyphenated alias
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(Category::as_str).collect();
                format!("unknown category '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

/// Declared type of a parameter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    #[default]
    String,
    Number,
    Boolean,
}

impl FromStr for ParameterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "string" => Ok(Self::String),
            "number" => Ok(Self::Number),
            "boolean" => Ok(Self::Boolean),
            other => Err(format!("unknown type '{}' (expected string, number or boolean)", other)),
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
        }
    }
}

/// One declared template parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParameterKind,
    pub required: bool,
    pub description: String,
    /// Substituted for an omitted optional parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// Model hints and search tags
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptMetadata {
    pub recommended_model: String,
    pub expected_tokens: u32,
    pub temperature: f64,
    pub tags: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// A worked example with the substrings a good answer should contain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptExample {
    pub input: ParameterValues,
    pub expected_output_contains: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<String>,
}

/// A validated prompt asset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptDefinition {
    pub name: String,
    pub version: String,
    pub category: Category,
    pub description: String,
    pub template: String,
    pub parameters: Vec<ParameterSpec>,
    pub metadata: PromptMetadata,
    pub examples: Vec<PromptExample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

impl PromptDefinition {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(content: &str, source: Option<&Path>) -> Result<Self, ValidationError> {
        debug!(?source, content_len = content.len(), "PromptDefinition::from_yaml_str: called");
        let raw: RawDocument = serde_yaml::from_str(content)
            .map_err(|e| ValidationError::new(source, "document", format!("not a valid prompt document: {}", e)))?;
        Validator { source }.document(raw)
    }

    /// Read, parse and validate a single document file
    ///
    /// No category-directory check is made; that belongs to the catalog.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        debug!(?path, "PromptDefinition::from_file: called");
        let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_yaml_str(&content, Some(path))?)
    }

    /// Substitute `values` into the template
    pub fn render(&self, values: &ParameterValues) -> Result<String, MissingParameterError> {
        render::render(self, values)
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters.iter().filter(|p| p.required)
    }

    /// First example whose input equals `values` exactly
    pub fn matching_example(&self, values: &ParameterValues) -> Option<&PromptExample> {
        self.examples.iter().find(|e| &e.input == values)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDocument {
    name: Option<String>,
    version: Option<Value>,
    category: Option<String>,
    description: Option<String>,
    template: Option<String>,
    parameters: Vec<RawParameter>,
    metadata: RawMetadata,
    examples: Vec<RawExample>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawParameter {
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    required: Option<bool>,
    description: Option<String>,
    default: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMetadata {
    recommended_model: Option<String>,
    expected_tokens: Option<i64>,
    temperature: Option<f64>,
    tags: Vec<String>,
    max_tokens: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawExample {
    input: BTreeMap<String, Value>,
    expected_output_contains: Vec<String>,
    expected_output: Option<String>,
}

struct Validator<'a> {
    source: Option<&'a Path>,
}

impl Validator<'_> {
    fn error(&self, field: impl Into<String>, message: impl Into<String>) -> ValidationError {
        ValidationError::new(self.source, field, message)
    }

    fn required_text(&self, value: Option<String>, field: &str) -> Result<String, ValidationError> {
        match value {
            Some(text) if !text.trim().is_empty() => Ok(text),
            Some(_) => Err(self.error(field, "must not be empty")),
            None => Err(self.error(field, "is required")),
        }
    }

    fn document(&self, raw: RawDocument) -> Result<PromptDefinition, ValidationError> {
        let name = self.required_text(raw.name, "name")?.trim().to_string();
        let category_text = self.required_text(raw.category, "category")?;
        let category = category_text.parse::<Category>().map_err(|e| self.error("category", e))?;
        let template = self.required_text(raw.template, "template")?;

        let version = match raw.version {
            None | Some(Value::Null) => DEFAULT_VERSION.to_string(),
            Some(value) => scalar_to_string(&value).ok_or_else(|| self.error("version", "must be a scalar"))?,
        };

        let parameters = self.parameters(raw.parameters)?;
        self.placeholders(&template, &parameters)?;
        let metadata = self.metadata(raw.metadata)?;
        let examples = self.examples(raw.examples, &parameters)?;

        debug!(%name, %category, param_count = parameters.len(), "Validator::document: valid");
        Ok(PromptDefinition {
            name,
            version,
            category,
            description: raw.description.unwrap_or_default(),
            template,
            parameters,
            metadata,
            examples,
            source: self.source.map(Path::to_path_buf),
        })
    }

    fn parameters(&self, raw: Vec<RawParameter>) -> Result<Vec<ParameterSpec>, ValidationError> {
        let mut seen = BTreeSet::new();
        let mut parameters = Vec::with_capacity(raw.len());

        for (i, param) in raw.into_iter().enumerate() {
            let name = self.required_text(param.name, &format!("parameters[{}].name", i))?.trim().to_string();
            if !render::is_identifier(&name) {
                return Err(self.error(
                    format!("parameters[{}].name", i),
                    format!("'{}' must be an identifier (letters, digits, `_`)", name),
                ));
            }
            if !seen.insert(name.clone()) {
                return Err(self.error(
                    format!("parameters[{}].name", i),
                    format!("duplicate parameter '{}'", name),
                ));
            }

            let kind = match param.kind {
                Some(kind) => kind
                    .parse::<ParameterKind>()
                    .map_err(|e| self.error(format!("parameters[{}].type", i), e))?,
                None => ParameterKind::default(),
            };

            let required = param.required.unwrap_or(true);
            let default = match param.default {
                None | Some(Value::Null) => None,
                Some(value) => Some(
                    scalar_to_string(&value)
                        .ok_or_else(|| self.error(format!("parameters[{}].default", i), "must be a scalar"))?,
                ),
            };
            if required && default.is_some() {
                return Err(self.error(
                    format!("parameters[{}].default", i),
                    format!("required parameter '{}' cannot declare a default", name),
                ));
            }

            parameters.push(ParameterSpec {
                name,
                kind,
                required,
                description: param.description.unwrap_or_default(),
                default,
            });
        }

        Ok(parameters)
    }

    /// Placeholders and declared parameters must match one-to-one
    fn placeholders(&self, template: &str, parameters: &[ParameterSpec]) -> Result<(), ValidationError> {
        let used = render::placeholders(template);

        if let Some(undeclared) = used.iter().find(|p| !parameters.iter().any(|d| &d.name == *p)) {
            return Err(self.error(
                "template",
                format!("placeholder '{{{}}}' has no matching parameter", undeclared),
            ));
        }

        if let Some((i, unused)) = parameters.iter().enumerate().find(|(_, p)| !used.contains(&p.name)) {
            return Err(self.error(
                format!("parameters[{}].name", i),
                format!("parameter '{}' is not used by the template", unused.name),
            ));
        }

        Ok(())
    }

    fn metadata(&self, raw: RawMetadata) -> Result<PromptMetadata, ValidationError> {
        let recommended_model = match raw.recommended_model {
            Some(model) if model.trim().is_empty() => {
                return Err(self.error("metadata.recommended_model", "must not be empty"));
            }
            Some(model) => model.trim().to_string(),
            None => DEFAULT_MODEL.to_string(),
        };

        let expected_tokens = raw.expected_tokens.unwrap_or(DEFAULT_EXPECTED_TOKENS);
        let expected_tokens = u32::try_from(expected_tokens)
            .ok()
            .filter(|t| *t > 0)
            .ok_or_else(|| self.error("metadata.expected_tokens", format!("must be a positive integer, got {}", expected_tokens)))?;

        let temperature = raw.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        if !(0.0..=MAX_TEMPERATURE).contains(&temperature) {
            return Err(self.error(
                "metadata.temperature",
                format!("must be between 0.0 and {:.1}, got {}", MAX_TEMPERATURE, temperature),
            ));
        }

        let max_tokens = match raw.max_tokens {
            None => None,
            Some(n) => Some(
                u32::try_from(n)
                    .ok()
                    .filter(|t| *t > 0)
                    .ok_or_else(|| self.error("metadata.max_tokens", format!("must be a positive integer, got {}", n)))?,
            ),
        };

        Ok(PromptMetadata {
            recommended_model,
            expected_tokens,
            temperature,
            tags: raw.tags.into_iter().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect(),
            max_tokens,
        })
    }

    fn examples(&self, raw: Vec<RawExample>, parameters: &[ParameterSpec]) -> Result<Vec<PromptExample>, ValidationError> {
        raw.into_iter()
            .enumerate()
            .map(|(i, example)| {
                let mut input = ParameterValues::new();
                for (key, value) in example.input {
                    if !parameters.iter().any(|p| p.name == key) {
                        return Err(self.error(
                            format!("examples[{}].input.{}", i, key),
                            format!("'{}' is not a declared parameter", key),
                        ));
                    }
                    let text = scalar_to_string(&value)
                        .ok_or_else(|| self.error(format!("examples[{}].input.{}", i, key), "must be a scalar"))?;
                    input.insert(key, text);
                }

                Ok(PromptExample {
                    input,
                    expected_output_contains: example.expected_output_contains,
                    expected_output: example.expected_output,
                })
            })
            .collect()
    }
}

/// Normalise a YAML scalar to its string form
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
