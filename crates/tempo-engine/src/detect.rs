//! Active product detection.

use crate::config::schema::DetectConfig;
use crate::dispatch::PageContext;
use async_trait::async_trait;
use std::sync::Arc;
use tempo_common::protocol::Product;
use tracing::debug;

#[async_trait]
pub trait ProductDetector: Send + Sync {
    /// `None` when the active page belongs to neither product.
    async fn detect(&self) -> Option<Product>;
}

/// Always reports the same product.
#[derive(Debug, Clone, Copy)]
pub struct FixedDetector(pub Product);

#[async_trait]
impl ProductDetector for FixedDetector {
    async fn detect(&self) -> Option<Product> {
        Some(self.0)
    }
}

/// Detects the product from the host of the active tab's URL.
pub struct HostDetector {
    page: Arc<dyn PageContext>,
    config: DetectConfig,
}

impl HostDetector {
    pub fn new(page: Arc<dyn PageContext>, config: DetectConfig) -> Self {
        Self { page, config }
    }

    pub fn classify(&self, page_url: &str) -> Option<Product> {
        let parsed = url::Url::parse(page_url).ok()?;
        let host = parsed.host_str()?.to_ascii_lowercase();
        if matches_any(&host, &self.config.fluency_hosts) {
            Some(Product::FluencyBuilder)
        } else if matches_any(&host, &self.config.foundations_hosts) {
            Some(Product::Foundations)
        } else {
            None
        }
    }
}

fn matches_any(host: &str, suffixes: &[String]) -> bool {
    suffixes.iter().any(|suffix| {
        let suffix = suffix.trim_start_matches('.').to_ascii_lowercase();
        host == suffix || host.ends_with(&format!(".{}", suffix))
    })
}

#[async_trait]
impl ProductDetector for HostDetector {
    async fn detect(&self) -> Option<Product> {
        let tab = self.page.active_tab().await.ok()?;
        let page_url = self.page.tab_url(&tab).await.ok()?;
        let product = self.classify(&page_url);
        debug!("Detected {:?} for {}", product, page_url);
        product
    }
}
