//! Per-model token pricing
//!
//! Prices are USD per million tokens. Lookup is by substring of the model id,
//! first match wins, so more specific entries must come first.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::TokenUsage;

/// Price of one model family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    /// Substring matched against the model id
    pub model: String,
    /// USD per million input tokens
    pub input: f64,
    /// USD per million output tokens
    pub output: f64,
}

impl ModelPrice {
    pub fn new(model: impl Into<String>, input: f64, output: f64) -> Self {
        Self {
            model: model.into(),
            input,
            output,
        }
    }
}

/// Ordered price list with a fallback for unknown models
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    entries: Vec<ModelPrice>,
    fallback: ModelPrice,
}

impl Default for PriceTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PriceTable {
    pub fn new(entries: Vec<ModelPrice>, fallback: ModelPrice) -> Self {
        Self { entries, fallback }
    }

    /// Published list prices for the common Gemini, GPT and Claude models
    pub fn builtin() -> Self {
        Self {
            entries: vec![
                ModelPrice::new("gemini-2.5-flash-lite", 0.10, 0.40),
                ModelPrice::new("gemini-2.5-flash", 0.30, 2.50),
                ModelPrice::new("gemini-2.5-pro", 1.25, 10.0),
                ModelPrice::new("gemini-2.0-flash", 0.10, 0.40),
                ModelPrice::new("gpt-4o-mini", 0.15, 0.60),
                ModelPrice::new("gpt-4o", 2.50, 10.0),
                ModelPrice::new("gpt-4.1-mini", 0.40, 1.60),
                ModelPrice::new("gpt-4.1", 2.00, 8.00),
                ModelPrice::new("opus", 15.0, 75.0),
                ModelPrice::new("sonnet", 3.0, 15.0),
                ModelPrice::new("haiku", 0.25, 1.25),
            ],
            fallback: ModelPrice::new("*", 0.30, 2.50),
        }
    }

    /// Put `overrides` ahead of the existing entries
    pub fn with_overrides(mut self, overrides: impl IntoIterator<Item = ModelPrice>) -> Self {
        let mut entries: Vec<ModelPrice> = overrides.into_iter().collect();
        entries.append(&mut self.entries);
        self.entries = entries;
        self
    }

    pub fn price_for(&self, model: &str) -> &ModelPrice {
        match self.entries.iter().find(|p| model.contains(&p.model)) {
            Some(price) => price,
            None => {
                debug!(%model, "PriceTable::price_for: unknown model, using fallback pricing");
                &self.fallback
            }
        }
    }

    /// Estimated cost of `usage` on `model`
    pub fn cost_usd(&self, model: &str, usage: &TokenUsage) -> f64 {
        let price = self.price_for(model);
        debug!(%model, matched = %price.model, %usage.input_tokens, %usage.output_tokens, "PriceTable::cost_usd: called");
        let input_cost = (usage.input_tokens as f64 / 1_000_000.0) * price.input;
        let output_cost = (usage.output_tokens as f64 / 1_000_000.0) * price.output;
        input_cost + output_cost
    }
}
