//! HTTP client for a Gemini-style `generateContent` endpoint.

use std::time::{Duration, Instant};
use axum::http::StatusCode;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;
use crate::generation::retry::{backoff_delay, is_retryable_status};
use crate::generation::{GenerationError, GenerationService};
use crate::observability::metrics;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// One failed attempt, and whether another one may help.
enum Attempt {
    Retry(GenerationError),
    Fail(GenerationError),
}

pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_attempts: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
}

impl GeminiClient {
    pub fn new(config: &GenerationConfig, api_key: String) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: format!(
                "{}/v1beta/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
            api_key,
            model: config.model.clone(),
            max_attempts: config.max_attempts.max(1),
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        })
    }

    async fn attempt(&self, prompt: &str) -> Result<String, Attempt> {
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Generation provider unreachable");
                Attempt::Retry(GenerationError::ProviderUnavailable)
            })?;

        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = match status {
                StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
                    GenerationError::ProviderUnavailable
                }
                _ => GenerationError::ProviderError(format!("status {}: {}", status, text)),
            };
            return Err(if is_retryable_status(status) {
                Attempt::Retry(err)
            } else {
                Attempt::Fail(err)
            });
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            Attempt::Fail(GenerationError::ProviderError(format!("invalid response body: {}", e)))
        })?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Attempt::Fail(GenerationError::ProviderError(
                "response contained no text".into(),
            )));
        }
        Ok(text)
    }
}

impl GenerationService for GeminiClient {
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, GenerationError>> {
        Box::pin(async move {
            let started = Instant::now();
            let mut attempts = 0;

            loop {
                attempts += 1;
                match self.attempt(prompt).await {
                    Ok(text) => {
                        metrics::record_generation("success", started);
                        return Ok(text);
                    }
                    Err(Attempt::Retry(e)) if attempts < self.max_attempts => {
                        let delay = backoff_delay(attempts, self.base_delay_ms, self.max_delay_ms);
                        tracing::info!(attempt = attempts, delay = ?delay, error = %e, "Retrying generation request");
                        tokio::time::sleep(delay).await;
                    }
                    Err(Attempt::Retry(e)) | Err(Attempt::Fail(e)) => {
                        metrics::record_generation("failure", started);
                        return Err(e);
                    }
                }
            }
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{response::IntoResponse, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    async fn spawn_provider(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn config(base_url: String) -> GenerationConfig {
        GenerationConfig {
            base_url,
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 5,
            ..GenerationConfig::default()
        }
    }

    #[tokio::test]
    async fn test_generate_success() {
        let router = Router::new().route(
            "/v1beta/models/{action}",
            post(|Json(body): Json<Value>| async move {
                let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap_or("").to_string();
                Json(json!({
                    "candidates": [{"content": {"parts": [{"text": "echo: "}, {"text": prompt}]}}]
                }))
            }),
        );
        let base = spawn_provider(router).await;
        let client = GeminiClient::new(&config(base), "key".into()).unwrap();

        let text = client.generate("hello").await.unwrap();
        assert_eq!(text, "echo: hello");
        assert_eq!(client.model(), "gemini-2.0-flash-exp");
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let router = Router::new().route(
            "/v1beta/models/{action}",
            post(move || {
                let c = c.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) < 2 {
                        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({}))).into_response()
                    } else {
                        Json(json!({"candidates": [{"content": {"parts": [{"text": "ok"}]}}]}))
                            .into_response()
                    }
                }
            }),
        );
        let base = spawn_provider(router).await;
        let client = GeminiClient::new(&config(base), "key".into()).unwrap();

        assert_eq!(client.generate("q").await.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_unavailable() {
        let router = Router::new().route(
            "/v1beta/models/{action}",
            post(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        );
        let base = spawn_provider(router).await;
        let client = GeminiClient::new(&config(base), "key".into()).unwrap();

        assert!(matches!(
            client.generate("q").await,
            Err(GenerationError::ProviderUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let router = Router::new().route(
            "/v1beta/models/{action}",
            post(move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::BAD_REQUEST, "bad prompt")
                }
            }),
        );
        let base = spawn_provider(router).await;
        let client = GeminiClient::new(&config(base), "key".into()).unwrap();

        assert!(matches!(
            client.generate("q").await,
            Err(GenerationError::ProviderError(_))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreachable_provider() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let base = format!("http://127.0.0.1:{}", port);
        let client = GeminiClient::new(&config(base), "key".into()).unwrap();
        assert!(matches!(
            client.generate("q").await,
            Err(GenerationError::ProviderUnavailable)
        ));
    }
}
