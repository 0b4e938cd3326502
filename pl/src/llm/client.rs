//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless model endpoint - each call is independent
///
/// The tester depends only on this trait, so it can be driven by a stub in
/// tests and by a real provider client in the CLI.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request and wait for the full response
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tracing::debug;

    use crate::llm::TokenUsage;

    /// Mock LLM client returning canned responses in order
    pub struct MockLlmClient {
        responses: Vec<CompletionResponse>,
        call_count: AtomicUsize,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockLlmClient {
        pub fn new(responses: Vec<CompletionResponse>) -> Self {
            debug!(response_count = %responses.len(), "MockLlmClient::new: called");
            Self {
                responses,
                call_count: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Respond once with `text`
        pub fn text(text: &str, usage: TokenUsage) -> Self {
            Self::new(vec![CompletionResponse {
                content: text.to_string(),
                usage,
                raw: serde_json::json!({ "text": text }),
            }])
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            debug!("MockLlmClient::complete: called");
            self.requests.lock().unwrap().push(request);
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            self.responses
                .get(idx)
                .cloned()
                .ok_or_else(|| LlmError::InvalidResponse("No more mock responses".to_string()))
        }
    }

    /// Stub endpoint that answers with the prompt it was sent
    ///
    /// Usage is one token per whitespace-separated word.
    pub struct EchoLlmClient;

    #[async_trait]
    impl LlmClient for EchoLlmClient {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            let words = request.prompt.split_whitespace().count() as u64;
            Ok(CompletionResponse {
                raw: serde_json::json!({ "echo": request.prompt }),
                content: request.prompt,
                usage: TokenUsage {
                    input_tokens: words,
                    output_tokens: words,
                },
            })
        }
    }

    /// Stub endpoint that always times out
    pub struct TimeoutLlmClient;

    #[async_trait]
    impl LlmClient for TimeoutLlmClient {
        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            Err(LlmError::Timeout(Duration::from_millis(50)))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_client_returns_responses_in_order() {
            let client = MockLlmClient::new(vec![
                CompletionResponse {
                    content: "Response 1".to_string(),
                    usage: TokenUsage::default(),
                    raw: serde_json::Value::Null,
                },
                CompletionResponse {
                    content: "Response 2".to_string(),
                    usage: TokenUsage::default(),
                    raw: serde_json::Value::Null,
                },
            ]);

            let req = CompletionRequest::new("test-model", "Test");
            assert_eq!(client.complete(req.clone()).await.unwrap().content, "Response 1");
            assert_eq!(client.complete(req.clone()).await.unwrap().content, "Response 2");
            assert!(client.complete(req).await.is_err());
            assert_eq!(client.call_count(), 3);
            assert_eq!(client.requests().len(), 3);
        }

        #[tokio::test]
        async fn test_echo_client() {
            let response = EchoLlmClient
                .complete(CompletionRequest::new("m", "one two three"))
                .await
                .unwrap();
            assert_eq!(response.content, "one two three");
            assert_eq!(response.usage.input_tokens, 3);
        }
    }
}
