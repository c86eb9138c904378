//! The per-product service contract.
//!
//! Each product exposes the same three operations over different wire formats
//! and trust checks. [`ServiceFactory`] resolves the active product once and
//! returns the matching [`ProductService`] variant.

pub mod factory;
pub mod fluency;
pub mod foundations;

use crate::clock::Clock;
use crate::config::schema::StoreKeys;
use crate::ids::IdGenerator;
use crate::store::SessionStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tempo_common::error::ServiceError;
use tempo_common::protocol::{Feature, Product};
use tempo_common::request::CapturedRequest;

pub use factory::ServiceFactory;
pub use fluency::FluencyService;
pub use foundations::FoundationsService;

#[async_trait]
pub trait Service: Send + Sync {
    fn product(&self) -> Product;

    /// Whether the template `feature` needs has been captured and is usable.
    async fn is_feature_ready(&self, feature: Feature) -> bool;

    /// Report `time` of additional study time.
    async fn add_time(&self, time: Duration) -> Result<(), ServiceError>;

    /// Mark the current lesson as completed.
    async fn validate_lesson(&self) -> Result<(), ServiceError>;
}

/// Collaborators shared by every service variant.
#[derive(Clone)]
pub struct ServiceContext {
    pub store: Arc<dyn SessionStore>,
    pub keys: StoreKeys,
    pub ids: Arc<dyn IdGenerator>,
    pub clock: Arc<dyn Clock>,
}

impl ServiceContext {
    pub async fn template(&self, product: Product, feature: Feature) -> Option<CapturedRequest> {
        self.store.get(self.keys.key(product, feature)).await
    }
}

/// The service for whichever product is active.
pub enum ProductService {
    Fluency(FluencyService),
    Foundations(FoundationsService),
}

#[async_trait]
impl Service for ProductService {
    fn product(&self) -> Product {
        match self {
            ProductService::Fluency(s) => s.product(),
            ProductService::Foundations(s) => s.product(),
        }
    }

    async fn is_feature_ready(&self, feature: Feature) -> bool {
        match self {
            ProductService::Fluency(s) => s.is_feature_ready(feature).await,
            ProductService::Foundations(s) => s.is_feature_ready(feature).await,
        }
    }

    async fn add_time(&self, time: Duration) -> Result<(), ServiceError> {
        match self {
            ProductService::Fluency(s) => s.add_time(time).await,
            ProductService::Foundations(s) => s.add_time(time).await,
        }
    }

    async fn validate_lesson(&self) -> Result<(), ServiceError> {
        match self {
            ProductService::Fluency(s) => s.validate_lesson().await,
            ProductService::Foundations(s) => s.validate_lesson().await,
        }
    }
}

/// Duration in whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn duration_ms(time: Duration) -> u64 {
    u64::try_from(time.as_millis()).unwrap_or(u64::MAX)
}
