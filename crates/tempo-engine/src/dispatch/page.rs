use super::{DispatchOutcome, Dispatcher};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tempo_common::error::DispatchError;
use tempo_common::protocol::TabHandle;
use tempo_common::request::CapturedRequest;
use tracing::{debug, warn};

/// The serialized form of a request handed to a page for execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRequest {
    pub url: String,
    pub method: String,
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl From<&CapturedRequest> for PageRequest {
    fn from(request: &CapturedRequest) -> Self {
        Self {
            url: request.url.clone(),
            method: request.method.clone(),
            headers: request
                .headers
                .iter()
                .filter(|(name, _)| !name.eq_ignore_ascii_case("content-length"))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            body: request.body.clone(),
        }
    }
}

/// A browser able to run requests inside one of its tabs.
#[async_trait]
pub trait PageContext: Send + Sync {
    /// The tab the user is currently working in.
    async fn active_tab(&self) -> Result<TabHandle, DispatchError>;

    /// URL currently loaded in `tab`.
    async fn tab_url(&self, tab: &TabHandle) -> Result<String, DispatchError>;

    /// Issue `request` from within `tab`'s security context.
    async fn execute_in_tab(
        &self,
        tab: &TabHandle,
        request: &PageRequest,
    ) -> Result<DispatchOutcome, DispatchError>;
}

/// Dispatches through the active tab so the server sees the page's origin.
pub struct PageDispatcher<P> {
    context: P,
}

impl<P: PageContext> PageDispatcher<P> {
    pub fn new(context: P) -> Self {
        Self { context }
    }
}

#[async_trait]
impl<P: PageContext> Dispatcher for PageDispatcher<P> {
    async fn dispatch(&self, request: &CapturedRequest) -> Result<DispatchOutcome, DispatchError> {
        let tab = self.context.active_tab().await?;
        debug!("Dispatching {} {} via tab {}", request.method, request.url, tab);
        let outcome = self
            .context
            .execute_in_tab(&tab, &PageRequest::from(request))
            .await?;
        if !outcome.is_success() {
            warn!(
                "{} {} returned status {} via tab {}",
                request.method, request.url, outcome.status, tab
            );
        }
        Ok(outcome)
    }
}

#[async_trait]
impl<P: PageContext + ?Sized> PageContext for std::sync::Arc<P> {
    async fn active_tab(&self) -> Result<TabHandle, DispatchError> {
        (**self).active_tab().await
    }

    async fn tab_url(&self, tab: &TabHandle) -> Result<String, DispatchError> {
        (**self).tab_url(tab).await
    }

    async fn execute_in_tab(
        &self,
        tab: &TabHandle,
        request: &PageRequest,
    ) -> Result<DispatchOutcome, DispatchError> {
        (**self).execute_in_tab(tab, request).await
    }
}
