//! Template rendering
//!
//! Placeholders are `{identifier}`. Substitution is a single pass over the
//! template, so substituted values are never re-scanned.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::definition::PromptDefinition;
use crate::error::MissingParameterError;

/// Parameter name -> concrete value
pub type ParameterValues = BTreeMap<String, String>;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid"));

/// Whether `name` can appear as a `{name}` placeholder
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Distinct placeholder names referenced by a template
pub fn placeholders(template: &str) -> BTreeSet<String> {
    PLACEHOLDER
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Render `definition` with `values`
///
/// Fails if a required parameter is absent or `values` carries a key the
/// definition does not declare. Omitted optional parameters take their
/// default, or the empty string.
pub fn render(definition: &PromptDefinition, values: &ParameterValues) -> Result<String, MissingParameterError> {
    debug!(name = %definition.name, value_count = values.len(), "render: called");

    let missing: Vec<String> = definition
        .required_parameters()
        .filter(|p| !values.contains_key(&p.name))
        .map(|p| p.name.clone())
        .collect();
    let undeclared: Vec<String> = values
        .keys()
        .filter(|key| definition.parameter(key).is_none())
        .cloned()
        .collect();

    if !missing.is_empty() || !undeclared.is_empty() {
        debug!(?missing, ?undeclared, "render: parameter mismatch");
        return Err(MissingParameterError {
            prompt: definition.name.clone(),
            missing,
            undeclared,
        });
    }

    let rendered = PLACEHOLDER.replace_all(&definition.template, |caps: &Captures| {
        let key = &caps[1];
        match (values.get(key), definition.parameter(key)) {
            (Some(value), _) => value.clone(),
            (None, Some(param)) => param.default.clone().unwrap_or_default(),
            (None, None) => caps[0].to_string(),
        }
    });

    Ok(rendered.into_owned())
}
