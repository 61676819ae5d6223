//! # Completion client
//!
//! Sends the conversation payload to a remote completion service and hands
//! back the raw response. Shape handling belongs to [`crate::normalize`].
//!
//! - [`CompletionService`] is the seam to the remote endpoint; the default
//!   implementation is [`HttpCompletionService`], which speaks the
//!   OpenAI-compatible `/chat/completions` protocol.
//! - [`CompletionClient`] checks the requested model against the allow-list
//!   before anything leaves the process, then calls the service exactly once:
//!   no retry, no cache.
//!
//! The turn list and the sampling options travel as two separate structured
//! fields of [`CompletionRequest`], never as text glued into a query.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::{
    error::{ChatError, Result},
    history::Turn,
};

/// Sampling options for one completion call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompletionOptions {
    pub temperature: f64,
}

/// Everything the service needs for one call.
///
/// On the wire the options are flattened next to `model` and `messages`:
/// `{"model": ..., "messages": [...], "temperature": 0.2}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Turn>,
    #[serde(flatten)]
    pub options: CompletionOptions,
}

/// A remote completion endpoint.
///
/// Returns the raw response value, or `None` when the service answered with
/// nothing at all.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Option<JsonValue>>;
}

/// OpenAI-compatible HTTP completion service.
#[derive(Debug, Clone)]
pub struct HttpCompletionService {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpCompletionService {
    /// Create a service posting to `<api_base>/chat/completions`.
    ///
    /// An empty `api_key` sends no `Authorization` header, which suits local
    /// unsecured backends.
    pub fn new(api_base: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ChatError::Config(format!("failed to create HTTP client: {e}")))?;
        let endpoint = format!("{}/chat/completions", api_base.trim_end_matches('/'));
        debug!("Completion endpoint: {}", endpoint);

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionService for HttpCompletionService {
    async fn complete(&self, request: &CompletionRequest) -> Result<Option<JsonValue>> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ChatError::CompletionFailure(format!(
                "{}: {}",
                status,
                body.trim()
            )));
        }

        if body.trim().is_empty() {
            return Ok(None);
        }

        match serde_json::from_str::<JsonValue>(&body) {
            Ok(JsonValue::Null) => Ok(None),
            Ok(value) => Ok(Some(value)),
            // Plain-text answers are passed through for the normalizer.
            Err(_) => Ok(Some(JsonValue::String(body))),
        }
    }
}

/// Allow-list check in front of a [`CompletionService`].
pub struct CompletionClient {
    service: Box<dyn CompletionService>,
    allowed_models: Vec<String>,
}

impl CompletionClient {
    pub fn new(service: Box<dyn CompletionService>, allowed_models: Vec<String>) -> Self {
        Self {
            service,
            allowed_models,
        }
    }

    pub fn allowed_models(&self) -> &[String] {
        &self.allowed_models
    }

    pub fn is_allowed(&self, model: &str) -> bool {
        self.allowed_models.iter().any(|m| m == model)
    }

    /// Call the service once with `payload` at `temperature`.
    ///
    /// # Errors
    /// - [`ChatError::InvalidModel`] if `model` is not allow-listed; the
    ///   service is not called.
    /// - Whatever the service reports, typically
    ///   [`ChatError::CompletionFailure`].
    pub async fn complete(
        &self,
        model: &str,
        payload: Vec<Turn>,
        temperature: f64,
    ) -> Result<Option<JsonValue>> {
        if !self.is_allowed(model) {
            return Err(ChatError::InvalidModel(model.to_string()));
        }

        let request = CompletionRequest {
            model: model.to_string(),
            messages: payload,
            options: CompletionOptions { temperature },
        };

        info!(
            "Requesting completion from {} ({} messages, temperature {})",
            model,
            request.messages.len(),
            temperature
        );
        self.service.complete(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    struct CountingService {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CompletionService for CountingService {
        async fn complete(&self, _request: &CompletionRequest) -> Result<Option<JsonValue>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(json!({"choices": [{"text": "ok"}]})))
        }
    }

    fn allowed() -> Vec<String> {
        vec!["mistral-large".to_string(), "llama3.1-8b".to_string()]
    }

    #[test]
    fn test_request_serializes_options_next_to_messages() {
        let request = CompletionRequest {
            model: "mistral-large".into(),
            messages: vec![Turn::system("sys"), Turn::user("Bonjour")],
            options: CompletionOptions { temperature: 0.2 },
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "model": "mistral-large",
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "Bonjour"}
                ],
                "temperature": 0.2
            })
        );
    }

    #[test]
    fn test_snapped_temperature_is_sent_as_written() {
        let temperature = crate::config::validate_temperature(0.73).unwrap();
        let request = CompletionRequest {
            model: "llama3.1-8b".into(),
            messages: vec![Turn::user("hi")],
            options: CompletionOptions { temperature },
        };

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["temperature"], json!(0.7));
        assert!(serde_json::to_string(&request).unwrap().contains("\"temperature\":0.7"));
    }

    #[tokio::test]
    async fn test_disallowed_model_never_reaches_the_service() {
        let calls = Arc::new(AtomicUsize::new(0));
        let client = CompletionClient::new(
            Box::new(CountingService {
                calls: calls.clone(),
            }),
            allowed(),
        );

        let result = client
            .complete("gpt-unknown", vec![Turn::user("hi")], 0.2)
            .await;

        assert_eq!(result, Err(ChatError::InvalidModel("gpt-unknown".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_allowed_model_calls_the_service_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let client = CompletionClient::new(
            Box::new(CountingService {
                calls: calls.clone(),
            }),
            allowed(),
        );

        let result = client
            .complete("llama3.1-8b", vec![Turn::user("hi")], 0.7)
            .await
            .unwrap();

        assert_eq!(result, Some(json!({"choices": [{"text": "ok"}]})));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_http_service_posts_payload_and_returns_raw_json() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer secret")
                    .json_body(json!({
                        "model": "mistral-large",
                        "messages": [{"role": "user", "content": "Bonjour"}],
                        "temperature": 0.2
                    }));
                then.status(200)
                    .json_body(json!({"choices": [{"message": {"content": "Salut !"}}]}));
            })
            .await;

        let service = HttpCompletionService::new(&server.url("/v1/"), "secret").unwrap();
        let request = CompletionRequest {
            model: "mistral-large".into(),
            messages: vec![Turn::user("Bonjour")],
            options: CompletionOptions { temperature: 0.2 },
        };

        let response = service.complete(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            response,
            Some(json!({"choices": [{"message": {"content": "Salut !"}}]}))
        );
    }

    #[tokio::test]
    async fn test_http_error_status_is_a_completion_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(429).body("quota exceeded");
            })
            .await;

        let service = HttpCompletionService::new(&server.base_url(), "").unwrap();
        let request = CompletionRequest {
            model: "mistral-large".into(),
            messages: vec![Turn::user("hi")],
            options: CompletionOptions { temperature: 0.0 },
        };

        match service.complete(&request).await {
            Err(ChatError::CompletionFailure(message)) => {
                assert!(message.contains("429"));
                assert!(message.contains("quota exceeded"));
            }
            other => panic!("expected CompletionFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_plain_text_and_empty_bodies() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/text/chat/completions");
                then.status(200).body("just words");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/empty/chat/completions");
                then.status(200).body("null");
            })
            .await;

        let request = CompletionRequest {
            model: "m".into(),
            messages: vec![],
            options: CompletionOptions { temperature: 1.0 },
        };

        let text = HttpCompletionService::new(&server.url("/text"), "")
            .unwrap()
            .complete(&request)
            .await
            .unwrap();
        assert_eq!(text, Some(JsonValue::String("just words".into())));

        let empty = HttpCompletionService::new(&server.url("/empty"), "")
            .unwrap()
            .complete(&request)
            .await
            .unwrap();
        assert_eq!(empty, None);
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let service = HttpCompletionService::new("http://localhost:5001/v1/", "").unwrap();
        assert_eq!(service.endpoint(), "http://localhost:5001/v1/chat/completions");
    }
}
