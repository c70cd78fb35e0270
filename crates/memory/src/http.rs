//! REST client for an external long-term memory service.
//!
//! The service keeps one "chat" per session. Turns are posted to it as they
//! happen and relevant memories are fetched back by text similarity.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use palaver_core::error::MemoryError;
use palaver_core::memory::{MemoryFetchRequest, MemoryService, RelatedContext, ScoredMemory};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// A memory service reached over HTTP/JSON.
pub struct HttpMemoryService {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpMemoryService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, MemoryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MemoryError::Unavailable(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, e: reqwest::Error) -> MemoryError {
        if e.is_timeout() {
            MemoryError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            MemoryError::Unavailable(e.to_string())
        }
    }

    /// Join `segments` onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url, MemoryError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| MemoryError::Unavailable(format!("Invalid memory service URL {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| MemoryError::Unavailable(format!("Memory service URL cannot take a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn post<B: Serialize + ?Sized>(&self, url: reqwest::Url, body: &B) -> Result<reqwest::Response, MemoryError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        Ok(response)
    }

    async fn rejected(response: reqwest::Response) -> MemoryError {
        let status_code = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        warn!(status = status_code, body = %message, "Memory service returned error");
        MemoryError::Rejected { status_code, message }
    }
}

#[async_trait]
impl MemoryService for HttpMemoryService {
    fn name(&self) -> &str {
        "http"
    }

    async fn create_session(&self, session_id: &str) -> Result<(), MemoryError> {
        let url = self.endpoint(&["chat"])?;
        let response = self.post(url, &CreateChatBody { chat_id: session_id }).await?;

        // 409: the chat already exists from an earlier run
        if response.status().is_success() || response.status().as_u16() == 409 {
            debug!(session_id, "Memory session ready");
            return Ok(());
        }
        Err(Self::rejected(response).await)
    }

    async fn store_turn(
        &self,
        session_id: &str,
        text: &str,
        related_context: &[RelatedContext],
    ) -> Result<(), MemoryError> {
        let url = self.endpoint(&["chat", session_id, "message"])?;
        let body = StoreMessageBody {
            message: text,
            related_context: related_context.iter().map(ApiRelatedContext::from).collect(),
        };

        let response = self.post(url, &body).await?;
        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }
        Ok(())
    }

    async fn fetch_relevant(
        &self,
        session_id: &str,
        request: &MemoryFetchRequest,
    ) -> Result<Vec<ScoredMemory>, MemoryError> {
        let url = self.endpoint(&["chat", session_id, "memories", "fetch"])?;
        let body = FetchBody::from(request);

        let response = self.post(url, &body).await?;
        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        let memories: Vec<ApiScoredMemory> = response
            .json()
            .await
            .map_err(|e| MemoryError::InvalidResponse(e.to_string()))?;

        debug!(session_id, count = memories.len(), "Fetched memories");
        Ok(memories.into_iter().map(ScoredMemory::from).collect())
    }
}

// --- Memory service API types (internal) ---

#[derive(Debug, Serialize)]
struct CreateChatBody<'a> {
    chat_id: &'a str,
}

#[derive(Debug, Serialize)]
struct StoreMessageBody<'a> {
    message: &'a str,
    related_context: Vec<ApiRelatedContext>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiRelatedContext {
    user: String,
    context: String,
}

impl From<&RelatedContext> for ApiRelatedContext {
    fn from(rc: &RelatedContext) -> Self {
        Self {
            user: rc.speaker.clone(),
            context: rc.text.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct FetchBody<'a> {
    text: &'a str,
    limit: usize,
    vector_search_limit: usize,
    vector_search_threshold: f32,
    long_term_threshold: f32,
}

impl<'a> From<&'a MemoryFetchRequest> for FetchBody<'a> {
    fn from(req: &'a MemoryFetchRequest) -> Self {
        Self {
            text: &req.query_text,
            limit: req.result_limit,
            vector_search_limit: req.vector_search_limit,
            vector_search_threshold: req.vector_search_threshold,
            long_term_threshold: req.long_term_threshold,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiScoredMemory {
    text: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    related_context: Option<Vec<ApiRelatedContext>>,
}

impl From<ApiScoredMemory> for ScoredMemory {
    fn from(m: ApiScoredMemory) -> Self {
        ScoredMemory {
            text: m.text,
            created_at: m.created_at,
            related_context: m
                .related_context
                .unwrap_or_default()
                .into_iter()
                .map(|rc| RelatedContext::new(rc.user, rc.context))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_trimmed() {
        let svc = HttpMemoryService::new("http://localhost:5042/api/v1/", Duration::from_secs(5)).unwrap();
        assert_eq!(svc.base_url(), "http://localhost:5042/api/v1");
        assert_eq!(svc.name(), "http");
    }

    #[test]
    fn endpoints_join_base_path() {
        let svc = HttpMemoryService::new("http://localhost:5042/api/v1", Duration::from_secs(5)).unwrap();
        assert_eq!(
            svc.endpoint(&["chat"]).unwrap().as_str(),
            "http://localhost:5042/api/v1/chat"
        );
        assert_eq!(
            svc.endpoint(&["chat", "work", "memories", "fetch"]).unwrap().as_str(),
            "http://localhost:5042/api/v1/chat/work/memories/fetch"
        );
    }

    #[test]
    fn session_id_cannot_escape_its_path_segment() {
        let svc = HttpMemoryService::new("http://localhost:5042/api/v1", Duration::from_secs(5)).unwrap();
        let url = svc.endpoint(&["chat", "a/b", "message"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5042/api/v1/chat/a%2Fb/message");
        assert_eq!(url.path_segments().unwrap().count(), 5);

        let url = svc.endpoint(&["chat", "x?y#z", "message"]).unwrap();
        assert_eq!(url.path(), "/api/v1/chat/x%3Fy%23z/message");
        assert!(url.query().is_none());
    }

    #[tokio::test]
    async fn invalid_base_url_is_an_error() {
        let svc = HttpMemoryService::new("not a url", Duration::from_secs(1)).unwrap();
        let result = svc.store_turn("s", "hi", &[]).await;
        assert!(matches!(result, Err(MemoryError::Unavailable(_))));
    }

    #[test]
    fn store_body_shape() {
        let ctx = vec![
            RelatedContext::new("user", "what's on tuesday?"),
            RelatedContext::new("assistant", "nothing"),
        ];
        let body = StoreMessageBody {
            message: "and wednesday?",
            related_context: ctx.iter().map(ApiRelatedContext::from).collect(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["message"], "and wednesday?");
        assert_eq!(json["related_context"][0]["user"], "user");
        assert_eq!(json["related_context"][1]["context"], "nothing");
    }

    #[test]
    fn fetch_body_shape() {
        let req = MemoryFetchRequest::new("tea");
        let json = serde_json::to_value(FetchBody::from(&req)).unwrap();
        assert_eq!(json["text"], "tea");
        assert_eq!(json["limit"], 2);
        assert_eq!(json["vector_search_limit"], 10);
        assert!((json["vector_search_threshold"].as_f64().unwrap() - 0.4).abs() < 1e-6);
        assert!((json["long_term_threshold"].as_f64().unwrap() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn parse_fetch_response() {
        let data = r#"[
            {"text":"likes green tea","created_at":"2026-03-01T10:00:00Z",
             "related_context":[{"user":"user","context":"what do I drink?"}]},
            {"text":"lives in Lisbon","created_at":"2026-03-02T11:30:00Z","related_context":null}
        ]"#;
        let parsed: Vec<ApiScoredMemory> = serde_json::from_str(data).unwrap();
        let memories: Vec<ScoredMemory> = parsed.into_iter().map(ScoredMemory::from).collect();
        assert_eq!(memories.len(), 2);
        assert_eq!(memories[0].related_context[0], RelatedContext::new("user", "what do I drink?"));
        assert!(memories[1].related_context.is_empty());
    }

    #[tokio::test]
    async fn unreachable_service_is_an_error() {
        // Port 9 (discard) is not expected to host an HTTP server
        let svc = HttpMemoryService::new("http://127.0.0.1:9/api/v1", Duration::from_secs(2)).unwrap();
        let result = svc.fetch_relevant("s", &MemoryFetchRequest::new("x")).await;
        assert!(matches!(
            result,
            Err(MemoryError::Unavailable(_)) | Err(MemoryError::Timeout { .. })
        ));
    }
}
