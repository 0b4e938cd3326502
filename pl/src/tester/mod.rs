//! Live prompt testing
//!
//! A [`Tester`] renders a definition, sends it to the injected [`LlmClient`]
//! exactly once, and turns the response into a scored [`TestResult`].

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use promptcatalog::{MissingParameterError, ParameterValues, PromptDefinition};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::llm::{CompletionRequest, LlmClient, LlmError, PriceTable, TokenUsage};

mod batch;
pub mod scoring;

pub use batch::{BatchFailure, BatchReport};

/// Errors from a single test invocation
#[derive(Debug, Error)]
pub enum TesterError {
    #[error(transparent)]
    MissingParameter(#[from] MissingParameterError),

    #[error("External call failed: {0}")]
    ExternalCall(#[from] LlmError),
}

/// Outcome of one live test
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub prompt_name: String,
    pub model: String,
    pub input: ParameterValues,
    pub output: String,
    pub latency_ms: u64,
    pub usage: TokenUsage,
    /// USD, from the injected price table
    pub estimated_cost: f64,
    pub quality_score: f64,
    pub expected_contains: Vec<String>,
    pub missing_keywords: Vec<String>,
    /// Non-blank output with no expected keyword missing
    pub passed: bool,
    pub raw_model_response: serde_json::Value,
    pub tested_at: DateTime<Utc>,
}

/// Tuning knobs that are not part of a prompt document
#[derive(Debug, Clone, Copy)]
pub struct TesterOptions {
    /// Output cap for prompts without `metadata.max_tokens`
    pub default_max_tokens: u32,
}

impl Default for TesterOptions {
    fn default() -> Self {
        Self {
            default_max_tokens: 1024,
        }
    }
}

/// Runs prompts against a model endpoint
///
/// Holds no per-call state, so one tester can serve concurrent calls.
pub struct Tester {
    client: Arc<dyn LlmClient>,
    pricing: PriceTable,
    options: TesterOptions,
}

impl Tester {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        debug!("Tester::new: called");
        Self {
            client,
            pricing: PriceTable::default(),
            options: TesterOptions::default(),
        }
    }

    pub fn with_pricing(mut self, pricing: PriceTable) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_options(mut self, options: TesterOptions) -> Self {
        self.options = options;
        self
    }

    /// Render `definition` with `values`, call the endpoint once and score the output
    ///
    /// Expected substrings come from the first example whose input equals
    /// `values` exactly. Failures are returned, never retried.
    pub async fn test_prompt(
        &self,
        definition: &PromptDefinition,
        values: &ParameterValues,
        model_override: Option<&str>,
    ) -> Result<TestResult, TesterError> {
        debug!(prompt = %definition.name, ?model_override, "test_prompt: called");
        let rendered = definition.render(values)?;

        let model = model_override.unwrap_or(&definition.metadata.recommended_model).to_string();
        let max_tokens = definition
            .metadata
            .max_tokens
            .unwrap_or(self.options.default_max_tokens);
        let request = CompletionRequest::new(model.clone(), rendered)
            .with_temperature(definition.metadata.temperature)
            .with_max_tokens(max_tokens);

        let start = Instant::now();
        let response = self.client.complete(request).await?;
        let latency_ms = start.elapsed().as_millis() as u64;

        let expected_contains = definition
            .matching_example(values)
            .map(|e| e.expected_output_contains.clone())
            .unwrap_or_default();
        let missing_keywords = scoring::missing_keywords(&response.content, &expected_contains);
        let quality_score = scoring::score_quality(&response.content, &expected_contains, &missing_keywords);
        let passed = missing_keywords.is_empty() && !response.content.trim().is_empty();
        let estimated_cost = self.pricing.cost_usd(&model, &response.usage);

        info!(
            prompt = %definition.name,
            %model,
            latency_ms,
            quality_score,
            passed,
            "test_prompt: completed"
        );

        Ok(TestResult {
            prompt_name: definition.name.clone(),
            model,
            input: values.clone(),
            output: response.content,
            latency_ms,
            usage: response.usage,
            estimated_cost,
            quality_score,
            expected_contains,
            missing_keywords,
            passed,
            raw_model_response: response.raw,
            tested_at: Utc::now(),
        })
    }

    /// Test each definition in turn with its first example's input
    ///
    /// Definitions without examples are tested with no input. A failure is
    /// recorded and the batch carries on.
    pub async fn test_batch<'a, I>(&self, definitions: I, model_override: Option<&str>) -> BatchReport
    where
        I: IntoIterator<Item = &'a PromptDefinition>,
    {
        debug!(?model_override, "test_batch: called");
        let mut report = BatchReport::default();

        for definition in definitions {
            let values = definition
                .examples
                .first()
                .map(|e| e.input.clone())
                .unwrap_or_default();

            match self.test_prompt(definition, &values, model_override).await {
                Ok(result) => report.results.push(result),
                Err(e) => {
                    warn!(prompt = %definition.name, error = %e, "test_batch: prompt failed");
                    report.failures.push(BatchFailure {
                        prompt_name: definition.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(total = report.total(), passed = report.passed(), "test_batch: completed");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::CompletionResponse;
    use crate::llm::client::mock::{EchoLlmClient, MockLlmClient, TimeoutLlmClient};

    const DOC: &str = r#"
name: topic_brief
category: summarization
template: "Write about {topic}"
parameters:
  - name: topic
metadata:
  recommended_model: gemini-2.5-flash
  temperature: 0.2
  max_tokens: 256
examples:
  - input:
      topic: rust
    expected_output_contains: [rust, ownership]
"#;

    fn definition() -> PromptDefinition {
        PromptDefinition::from_yaml_str(DOC, None).unwrap()
    }

    fn values(topic: &str) -> ParameterValues {
        ParameterValues::from([("topic".to_string(), topic.to_string())])
    }

    fn usage(input: u64, output: u64) -> TokenUsage {
        TokenUsage {
            input_tokens: input,
            output_tokens: output,
        }
    }

    #[tokio::test]
    async fn test_request_carries_metadata() {
        let client = Arc::new(MockLlmClient::text("rust ownership explained", usage(10, 3)));
        let tester = Tester::new(client.clone());

        let result = tester.test_prompt(&definition(), &values("rust"), None).await.unwrap();

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "gemini-2.5-flash");
        assert_eq!(requests[0].prompt, "Write about rust");
        assert!((requests[0].temperature - 0.2).abs() < f64::EPSILON);
        assert_eq!(requests[0].max_tokens, 256);

        assert_eq!(result.model, "gemini-2.5-flash");
        assert_eq!(result.output, "rust ownership explained");
        assert!(result.passed);
        assert_eq!(result.expected_contains, vec!["rust", "ownership"]);
        assert!(result.missing_keywords.is_empty());
        assert!(result.estimated_cost > 0.0);
        assert_eq!(result.raw_model_response["text"], "rust ownership explained");
    }

    #[tokio::test]
    async fn test_model_override() {
        let client = Arc::new(MockLlmClient::text("x", usage(1, 1)));
        let tester = Tester::new(client.clone());

        let result = tester
            .test_prompt(&definition(), &values("rust"), Some("gpt-4o"))
            .await
            .unwrap();
        assert_eq!(result.model, "gpt-4o");
        assert_eq!(client.requests()[0].model, "gpt-4o");
    }

    #[tokio::test]
    async fn test_default_max_tokens_applies_without_metadata() {
        let doc = DOC.replace("  max_tokens: 256\n", "");
        let definition = PromptDefinition::from_yaml_str(&doc, None).unwrap();
        let client = Arc::new(MockLlmClient::text("x", usage(1, 1)));
        let tester = Tester::new(client.clone()).with_options(TesterOptions {
            default_max_tokens: 77,
        });

        tester.test_prompt(&definition, &values("rust"), None).await.unwrap();
        assert_eq!(client.requests()[0].max_tokens, 77);
    }

    #[tokio::test]
    async fn test_more_expected_substrings_score_higher() {
        // Echo returns the prompt, so the matched count is controlled by the template text
        let doc = r#"
name: echo_probe
category: analysis
template: "{text}"
parameters:
  - name: text
examples:
  - input: { text: "alpha beta" }
    expected_output_contains: [alpha, beta]
  - input: { text: "gamma delta" }
    expected_output_contains: [alpha, beta]
"#;
        let definition = PromptDefinition::from_yaml_str(doc, None).unwrap();
        let tester = Tester::new(Arc::new(EchoLlmClient));

        let both = ParameterValues::from([("text".to_string(), "alpha beta".to_string())]);
        let neither = ParameterValues::from([("text".to_string(), "gamma delta".to_string())]);

        let hit = tester.test_prompt(&definition, &both, None).await.unwrap();
        let miss = tester.test_prompt(&definition, &neither, None).await.unwrap();

        assert!(hit.passed);
        assert!(!miss.passed);
        assert_eq!(miss.missing_keywords, vec!["alpha", "beta"]);
        assert!(hit.quality_score > miss.quality_score);
    }

    #[tokio::test]
    async fn test_no_matching_example_means_no_expectations() {
        let client = Arc::new(MockLlmClient::text("anything", usage(1, 1)));
        let tester = Tester::new(client);

        let result = tester.test_prompt(&definition(), &values("go"), None).await.unwrap();
        assert!(result.expected_contains.is_empty());
        assert!(result.passed);
        assert_eq!(result.quality_score, 5.0);
    }

    #[tokio::test]
    async fn test_blank_output_fails() {
        let client = Arc::new(MockLlmClient::new(vec![CompletionResponse {
            content: "   ".to_string(),
            usage: TokenUsage::default(),
            raw: serde_json::Value::Null,
        }]));
        let tester = Tester::new(client);

        let result = tester.test_prompt(&definition(), &values("go"), None).await.unwrap();
        assert!(!result.passed);
        assert_eq!(result.quality_score, 0.0);
    }

    #[tokio::test]
    async fn test_missing_parameter_makes_no_call() {
        let client = Arc::new(MockLlmClient::new(vec![]));
        let tester = Tester::new(client.clone());

        let err = tester
            .test_prompt(&definition(), &ParameterValues::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, TesterError::MissingParameter(ref e) if e.missing == vec!["topic"]));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_external_failure_is_surfaced_once() {
        let tester = Tester::new(Arc::new(TimeoutLlmClient));
        let err = tester.test_prompt(&definition(), &values("rust"), None).await.unwrap_err();
        assert!(matches!(err, TesterError::ExternalCall(LlmError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_custom_pricing() {
        let client = Arc::new(MockLlmClient::text("x", usage(1_000_000, 0)));
        let pricing = PriceTable::builtin().with_overrides(vec![crate::llm::ModelPrice::new("gemini", 2.0, 0.0)]);
        let tester = Tester::new(client).with_pricing(pricing);

        let result = tester.test_prompt(&definition(), &values("rust"), None).await.unwrap();
        assert!((result.estimated_cost - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_batch_uses_first_example_and_continues_after_failure() {
        let no_examples = PromptDefinition::from_yaml_str(
            "name: needs_input\ncategory: analysis\ntemplate: \"{x}\"\nparameters:\n  - name: x\n",
            None,
        )
        .unwrap();
        let definitions = vec![definition(), no_examples];
        let tester = Tester::new(Arc::new(EchoLlmClient));

        let report = tester.test_batch(&definitions, None).await;

        assert_eq!(report.total(), 2);
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].input, values("rust"));
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].prompt_name, "needs_input");
        // Echo of "Write about rust" lacks "ownership"
        assert_eq!(report.passed(), 0);
    }
}
