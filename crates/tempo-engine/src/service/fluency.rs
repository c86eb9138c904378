use super::{Service, ServiceContext, duration_ms};
use crate::dispatch::Dispatcher;
use crate::payload::fluency::TimePayload;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempo_common::error::ServiceError;
use tempo_common::protocol::{Feature, Product};
use tempo_common::request::CapturedRequest;
use tracing::{debug, info};

/// Validation requests already submitted, keyed by [`ledger_key`].
pub type ValidationLedger = Arc<Mutex<HashSet<String>>>;

/// FluencyBuilder speaks JSON and checks the request origin, so every request
/// goes out through the page dispatcher.
pub struct FluencyService {
    context: ServiceContext,
    dispatcher: Arc<dyn Dispatcher>,
    guard: Option<ValidationLedger>,
}

impl FluencyService {
    pub fn new(context: ServiceContext, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            context,
            dispatcher,
            guard: None,
        }
    }

    /// Skip validation templates whose content is already in `ledger`.
    pub fn with_validation_guard(mut self, ledger: ValidationLedger) -> Self {
        self.guard = Some(ledger);
        self
    }

    async fn template(&self, feature: Feature) -> Option<CapturedRequest> {
        self.context.template(Product::FluencyBuilder, feature).await
    }

    fn already_validated(&self, key: &str) -> bool {
        match &self.guard {
            Some(ledger) => ledger
                .lock()
                .map(|sent| sent.contains(key))
                .unwrap_or(false),
            None => false,
        }
    }

    fn record_validated(&self, key: String) {
        if let Some(ledger) = &self.guard {
            if let Ok(mut sent) = ledger.lock() {
                sent.insert(key);
            }
        }
    }
}

/// Identifies a validation request by what it sends. Capture ids are not
/// used since exports may omit them.
pub fn ledger_key(request: &CapturedRequest) -> String {
    format!(
        "{} {}\n{}",
        request.method.to_uppercase(),
        request.url,
        request.body.as_deref().unwrap_or_default()
    )
}

#[async_trait]
impl Service for FluencyService {
    fn product(&self) -> Product {
        Product::FluencyBuilder
    }

    async fn is_feature_ready(&self, feature: Feature) -> bool {
        let Some(template) = self.template(feature).await else {
            return false;
        };
        match feature {
            Feature::ValidateLesson => true,
            Feature::AddTime => {
                let Some(body) = template.body.as_deref() else {
                    return false;
                };
                match TimePayload::parse(body) {
                    Ok(payload) => payload.is_injectable(),
                    Err(e) => {
                        debug!("Captured time request is not parseable: {}", e);
                        false
                    }
                }
            }
        }
    }

    async fn add_time(&self, time: Duration) -> Result<(), ServiceError> {
        let template = self.template(Feature::AddTime).await;
        let Some((template, body)) = template.and_then(|t| t.body.clone().map(|b| (t, b))) else {
            return Err(ServiceError::MissingTemplate(
                "Cannot add time: no time request captured".into(),
            ));
        };

        let mut payload = TimePayload::parse(&body)?;
        if payload.message_count() == 0 {
            return Err(ServiceError::MalformedPayload(
                "time request carries no messages".into(),
            ));
        }

        let total = duration_ms(time);
        payload.apply_duration(total, self.context.ids.as_ref());
        info!(
            "Adding {} ms across {} message(s)",
            total,
            payload.message_count()
        );

        let request = template.with_body(payload.to_body()?);
        self.dispatcher.dispatch(&request).await?;
        Ok(())
    }

    async fn validate_lesson(&self) -> Result<(), ServiceError> {
        let template = self
            .template(Feature::ValidateLesson)
            .await
            .filter(|t| t.body.is_some())
            .ok_or_else(|| {
                ServiceError::MissingTemplate(
                    "Cannot validate lesson: no validation request captured".into(),
                )
            })?;

        let key = ledger_key(&template);
        if self.already_validated(&key) {
            info!("Validation request to {} already submitted, skipping", template.url);
            return Ok(());
        }

        info!("Submitting lesson validation");
        self.dispatcher.dispatch(&template).await?;
        self.record_validated(key);
        Ok(())
    }
}
