use super::{DispatchOutcome, Dispatcher};
use crate::config::schema::DirectConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use tempo_common::error::DispatchError;
use tempo_common::request::CapturedRequest;
use tracing::{debug, warn};

/// Headers the HTTP client computes itself. Copying them from a template whose
/// body was rewritten would produce an invalid request.
const SKIPPED_HEADERS: &[&str] = &["content-length", "host"];

/// Sends requests from this process with reqwest.
#[derive(Clone)]
pub struct DirectDispatcher {
    client: Client,
}

impl DirectDispatcher {
    pub fn new() -> Result<Self, DispatchError> {
        Self::with_user_agent(None)
    }

    pub fn from_config(config: &DirectConfig) -> Result<Self, DispatchError> {
        Self::with_user_agent(config.user_agent.as_deref())
    }

    pub fn with_user_agent(user_agent: Option<&str>) -> Result<Self, DispatchError> {
        let mut builder = Client::builder();
        if let Some(ua) = user_agent {
            builder = builder.user_agent(ua);
        }
        let client = builder
            .build()
            .map_err(|e| DispatchError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

fn build_headers(request: &CapturedRequest) -> Result<HeaderMap, DispatchError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &request.headers {
        if SKIPPED_HEADERS
            .iter()
            .any(|skipped| name.eq_ignore_ascii_case(skipped))
        {
            continue;
        }
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| DispatchError::InvalidRequest(format!("header '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| DispatchError::InvalidRequest(format!("header '{}': {}", name, e)))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

#[async_trait]
impl Dispatcher for DirectDispatcher {
    async fn dispatch(&self, request: &CapturedRequest) -> Result<DispatchOutcome, DispatchError> {
        let method = Method::from_bytes(request.method.to_uppercase().as_bytes()).map_err(|e| {
            DispatchError::InvalidRequest(format!("method '{}': {}", request.method, e))
        })?;
        let headers = build_headers(request)?;

        debug!("Dispatching {} {}", method, request.url);
        let mut builder = self.client.request(method, &request.url).headers(headers);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let outcome = DispatchOutcome { status, body };
        if !outcome.is_success() {
            warn!("{} {} returned status {}", request.method, request.url, status);
        }
        Ok(outcome)
    }
}
