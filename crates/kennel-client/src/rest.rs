//! reqwest implementation of [`MessagesApi`].

use std::time::Duration;

use kennel_proto::{AuthToken, ChatMessage, MessageId, ThreadId, ThreadSummary, UserSummary};
use reqwest::{Method, RequestBuilder, header};
use serde::{Deserialize, de::DeserializeOwned};
use url::Url;

use crate::api::{ApiError, MessagesApi, NewMessage, error_message};

/// Per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Deserialize)]
struct ReadAll {
    updated: u32,
}

/// REST client for the messages backend.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base: Url,
    token: AuthToken,
}

impl RestClient {
    /// Client for the API rooted at `api_base`.
    ///
    /// # Errors
    ///
    /// - `ApiError::Url` if `api_base` is not an absolute http(s) URL
    /// - `ApiError::Transport` if the HTTP client cannot be built
    pub fn new(api_base: &str, token: AuthToken) -> Result<Self, ApiError> {
        let base = Url::parse(api_base).map_err(|e| ApiError::Url(format!("{api_base}: {e}")))?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(ApiError::Url(format!("{api_base}: expected an http(s) base URL")));
        }
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self { http, base, token })
    }

    /// Endpoint URL for `segments` below the base path.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|()| ApiError::Url(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(self.token.expose())
            .header(header::CONTENT_TYPE, "application/json")
    }

    async fn execute<R: DeserializeOwned>(&self, request: RequestBuilder) -> Result<R, ApiError> {
        let response = request.send().await.map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| ApiError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message =
                error_message(status.as_u16(), status.canonical_reason().unwrap_or_default(), &body);
            tracing::warn!(status = status.as_u16(), %message, "request rejected");
            return Err(ApiError::Status { status: status.as_u16(), message });
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

impl MessagesApi for RestClient {
    async fn list_messages(&self, thread_id: &ThreadId) -> Result<Vec<ChatMessage>, ApiError> {
        let mut url = self.endpoint(&["messages"])?;
        url.query_pairs_mut().append_pair("thread_id", thread_id.as_str());
        self.execute(self.request(Method::GET, url)).await
    }

    async fn list_threads(&self) -> Result<Vec<ThreadSummary>, ApiError> {
        let url = self.endpoint(&["messages", "threads"])?;
        self.execute(self.request(Method::GET, url)).await
    }

    async fn mark_thread_read(&self, thread_id: &ThreadId) -> Result<u32, ApiError> {
        let url = self.endpoint(&["messages", "thread", thread_id.as_str(), "read-all"])?;
        let ReadAll { updated } = self.execute(self.request(Method::PATCH, url)).await?;
        Ok(updated)
    }

    async fn create_message(&self, message: &NewMessage) -> Result<ChatMessage, ApiError> {
        let url = self.endpoint(&["messages"])?;
        self.execute(self.request(Method::POST, url).json(message)).await
    }

    async fn mark_message_read(&self, message_id: &MessageId) -> Result<ChatMessage, ApiError> {
        let url = self.endpoint(&["messages", message_id.as_str(), "read"])?;
        self.execute(self.request(Method::PATCH, url)).await
    }

    async fn me(&self) -> Result<UserSummary, ApiError> {
        let url = self.endpoint(&["auth", "me"])?;
        self.execute(self.request(Method::GET, url)).await
    }
}
