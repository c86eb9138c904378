use super::fluency::ValidationLedger;
use super::{FluencyService, FoundationsService, ProductService, ServiceContext};
use crate::clock::{Clock, SystemClock};
use crate::config::schema::TempoConfig;
use crate::detect::ProductDetector;
use crate::dispatch::Dispatcher;
use crate::ids::{IdGenerator, UuidV7Generator};
use crate::store::SessionStore;
use std::sync::Arc;
use tempo_common::error::ServiceError;
use tempo_common::protocol::Product;
use tracing::info;

/// Builds the service for the active product.
pub struct ServiceFactory {
    config: TempoConfig,
    store: Arc<dyn SessionStore>,
    detector: Arc<dyn ProductDetector>,
    direct: Arc<dyn Dispatcher>,
    page: Arc<dyn Dispatcher>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    ledger: ValidationLedger,
}

impl ServiceFactory {
    pub fn new(
        config: TempoConfig,
        store: Arc<dyn SessionStore>,
        detector: Arc<dyn ProductDetector>,
        direct: Arc<dyn Dispatcher>,
        page: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            config,
            store,
            detector,
            direct,
            page,
            ids: Arc::new(UuidV7Generator),
            clock: Arc::new(SystemClock),
            ledger: ValidationLedger::default(),
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &TempoConfig {
        &self.config
    }

    /// Detect the active product and build its service.
    pub async fn resolve(&self) -> Result<ProductService, ServiceError> {
        let product = self
            .detector
            .detect()
            .await
            .ok_or(ServiceError::UnknownProduct)?;
        info!("Resolved service for {}", product);
        Ok(self.build(product))
    }

    pub fn build(&self, product: Product) -> ProductService {
        let context = ServiceContext {
            store: Arc::clone(&self.store),
            keys: self.config.keys.clone(),
            ids: Arc::clone(&self.ids),
            clock: Arc::clone(&self.clock),
        };
        match product {
            Product::FluencyBuilder => {
                let service = FluencyService::new(context, Arc::clone(&self.page));
                if self.config.fluency.guard_validation {
                    ProductService::Fluency(
                        service.with_validation_guard(Arc::clone(&self.ledger)),
                    )
                } else {
                    ProductService::Fluency(service)
                }
            }
            Product::Foundations => ProductService::Foundations(FoundationsService::new(
                context,
                Arc::clone(&self.direct),
                self.config.foundations.max_chunk_ms,
            )),
        }
    }
}
