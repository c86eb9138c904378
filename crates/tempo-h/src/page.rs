//! Running captured requests inside a Chromium tab.

use crate::cdp::CdpClient;
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use serde::Deserialize;
use tempo_engine::dispatch::{DispatchOutcome, PageContext, PageRequest};
use tempo_engine::error::DispatchError;
use tempo_engine::protocol::TabHandle;
use tracing::debug;

/// Issues the request with the page's own `fetch`, so cookies and the
/// `Origin` header are the page's.
const FETCH_SCRIPT: &str = r#"(async (req) => {
    const init = { method: req.method, headers: req.headers, credentials: 'include' };
    if (req.body !== undefined && req.body !== null) {
        init.body = req.body;
    }
    const response = await fetch(req.url, init);
    return { status: response.status, body: await response.text() };
})"#;

#[derive(Debug, Deserialize)]
struct FetchResult {
    status: u16,
    #[serde(default)]
    body: String,
}

pub fn fetch_expression(request: &PageRequest) -> Result<String, serde_json::Error> {
    Ok(format!("{}({})", FETCH_SCRIPT, serde_json::to_string(request)?))
}

fn is_blank(url: &str) -> bool {
    url.is_empty() || url == "about:blank" || url.starts_with("chrome://")
}

/// [`PageContext`] over the tabs of a Chromium session.
pub struct CdpPageContext {
    client: CdpClient,
}

impl CdpPageContext {
    pub fn new(client: CdpClient) -> Self {
        Self { client }
    }

    pub fn into_client(self) -> CdpClient {
        self.client
    }

    async fn pages(&self) -> Result<Vec<Page>, DispatchError> {
        self.client
            .browser
            .pages()
            .await
            .map_err(|e| DispatchError::Page(format!("Failed to list pages: {}", e)))
    }

    async fn find_page(&self, tab: &TabHandle) -> Result<Page, DispatchError> {
        self.pages()
            .await?
            .into_iter()
            .find(|page| page.target_id().inner() == &tab.0)
            .ok_or(DispatchError::NoActiveTab)
    }
}

async fn page_url(page: &Page) -> String {
    page.url().await.ok().flatten().unwrap_or_default()
}

#[async_trait]
impl PageContext for CdpPageContext {
    /// The most recently opened tab showing real content, falling back to the
    /// client's own page.
    async fn active_tab(&self) -> Result<TabHandle, DispatchError> {
        let mut active = None;
        for page in self.pages().await? {
            if !is_blank(&page_url(&page).await) {
                active = Some(page);
            }
        }
        let page = active.unwrap_or_else(|| self.client.page.clone());
        Ok(TabHandle(page.target_id().inner().clone()))
    }

    async fn tab_url(&self, tab: &TabHandle) -> Result<String, DispatchError> {
        let page = self.find_page(tab).await?;
        Ok(page_url(&page).await)
    }

    async fn execute_in_tab(
        &self,
        tab: &TabHandle,
        request: &PageRequest,
    ) -> Result<DispatchOutcome, DispatchError> {
        let page = self.find_page(tab).await?;
        let expression = fetch_expression(request)
            .map_err(|e| DispatchError::InvalidRequest(e.to_string()))?;
        let params = EvaluateParams::builder()
            .expression(expression)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(|e| DispatchError::InvalidRequest(e.to_string()))?;

        debug!("Running {} {} in tab {}", request.method, request.url, tab);
        let result: FetchResult = page
            .evaluate_expression(params)
            .await
            .map_err(|e| DispatchError::Page(e.to_string()))?
            .into_value()
            .map_err(|e| DispatchError::Page(format!("Unexpected fetch result: {}", e)))?;

        Ok(DispatchOutcome {
            status: result.status,
            body: result.body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_fetch_expression_embeds_request_as_json() {
        let request = PageRequest {
            url: "https://api.example.com/graphql".into(),
            method: "POST".into(),
            headers: HashMap::from([("Content-Type".to_string(), "application/json".to_string())]),
            body: Some(r#"{"q":"it's \"quoted\""}"#.into()),
        };
        let expression = fetch_expression(&request).unwrap();
        assert!(expression.starts_with(FETCH_SCRIPT));
        assert!(expression.contains("credentials: 'include'"));

        let argument = &expression[FETCH_SCRIPT.len() + 1..expression.len() - 1];
        let parsed: PageRequest = serde_json::from_str(argument).unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn test_blank_pages_are_not_active() {
        assert!(is_blank("about:blank"));
        assert!(is_blank(""));
        assert!(is_blank("chrome://newtab/"));
        assert!(!is_blank("https://learn.example.com/"));
    }
}
