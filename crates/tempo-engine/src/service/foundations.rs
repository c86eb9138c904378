use super::{Service, ServiceContext, duration_ms};
use crate::dispatch::{Dispatcher, dispatch_all};
use crate::payload::markup::{self, ScoreStep};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tempo_common::error::{DispatchError, ServiceError};
use tempo_common::protocol::{Feature, Product};
use tempo_common::request::CapturedRequest;
use tracing::{debug, info};
use url::Url;

/// Foundations speaks markup and does not check origins, so requests go out
/// directly. Time is reported in chunks no larger than `max_chunk_ms`.
pub struct FoundationsService {
    context: ServiceContext,
    dispatcher: Arc<dyn Dispatcher>,
    max_chunk_ms: u64,
}

impl FoundationsService {
    pub fn new(context: ServiceContext, dispatcher: Arc<dyn Dispatcher>, max_chunk_ms: u64) -> Self {
        Self {
            context,
            dispatcher,
            max_chunk_ms,
        }
    }

    async fn template(&self, feature: Feature) -> Option<CapturedRequest> {
        self.context.template(Product::Foundations, feature).await
    }

    /// One copy of `template` per chunk of `total`, each with its own
    /// `delta_time` and the current time as `updated_at`.
    pub fn get_time_requests(
        &self,
        template: &CapturedRequest,
        total: Duration,
    ) -> Result<Vec<CapturedRequest>, ServiceError> {
        let body = template.body.as_deref().ok_or_else(|| {
            ServiceError::MissingTemplate("Cannot add time: captured time request has no body".into())
        })?;

        time_chunks(duration_ms(total), self.max_chunk_ms)?
            .into_iter()
            .map(|chunk| -> Result<CapturedRequest, ServiceError> {
                let updated_at = self.context.clock.now_millis().to_string();
                let rewritten = markup::rewrite_time_document(body, chunk, &updated_at)?;
                Ok(template.with_body(rewritten))
            })
            .collect()
    }

    /// Requests raising every unfinished step of `document` to a full score.
    /// Steps already complete or without a media id produce nothing.
    pub fn generate_validate_requests(
        &self,
        template: &CapturedRequest,
        document: &str,
    ) -> Result<Vec<CapturedRequest>, ServiceError> {
        let mut requests = Vec::new();
        for step in markup::score_steps(document)? {
            if step.is_satisfied() {
                continue;
            }
            if step.media_id.is_empty() {
                debug!("Skipping score step without media id");
                continue;
            }
            requests.push(score_update_request(template, &step)?);
        }
        Ok(requests)
    }
}

fn score_update_request(
    template: &CapturedRequest,
    step: &ScoreStep,
) -> Result<CapturedRequest, ServiceError> {
    let mut url = Url::parse(&template.url).map_err(|e| {
        DispatchError::InvalidRequest(format!("score url '{}': {}", template.url, e))
    })?;
    url.query_pairs_mut()
        .append_pair("_method", "put")
        .append_pair("path_step_media_id", &step.media_id);

    Ok(template
        .with_body(step.render_completed()?)
        .with_url(url.to_string())
        .with_method("POST"))
}

/// Upper bound on the number of requests a single `add_time` may produce.
pub const MAX_TIME_CHUNKS: u64 = 10_000;

/// Split `total_ms` into full `max_chunk_ms` chunks followed by the remainder.
/// A `max_chunk_ms` of zero disables chunking.
pub fn time_chunks(total_ms: u64, max_chunk_ms: u64) -> Result<Vec<u64>, ServiceError> {
    if total_ms == 0 {
        return Ok(Vec::new());
    }
    if max_chunk_ms == 0 {
        return Ok(vec![total_ms]);
    }
    let count = total_ms.div_ceil(max_chunk_ms);
    if count > MAX_TIME_CHUNKS {
        return Err(ServiceError::InvalidDuration(format!(
            "{} ms would need {} requests of {} ms, limit is {}",
            total_ms, count, max_chunk_ms, MAX_TIME_CHUNKS
        )));
    }
    let full = total_ms / max_chunk_ms;
    let mut chunks = vec![max_chunk_ms; full as usize];
    let remainder = total_ms % max_chunk_ms;
    if remainder > 0 {
        chunks.push(remainder);
    }
    Ok(chunks)
}

#[async_trait]
impl Service for FoundationsService {
    fn product(&self) -> Product {
        Product::Foundations
    }

    async fn is_feature_ready(&self, feature: Feature) -> bool {
        self.template(feature).await.is_some()
    }

    async fn add_time(&self, time: Duration) -> Result<(), ServiceError> {
        let template = self.template(Feature::AddTime).await.ok_or_else(|| {
            ServiceError::MissingTemplate("Cannot add time: no time request captured".into())
        })?;

        let requests = self.get_time_requests(&template, time)?;
        info!(
            "Adding {} ms in {} chunk(s)",
            duration_ms(time),
            requests.len()
        );
        dispatch_all(Arc::clone(&self.dispatcher), requests).await?;
        Ok(())
    }

    async fn validate_lesson(&self) -> Result<(), ServiceError> {
        let template = self.template(Feature::ValidateLesson).await.ok_or_else(|| {
            ServiceError::MissingTemplate(
                "Cannot validate lesson: no course score request captured".into(),
            )
        })?;

        let fetch = template.clone().with_method("GET").without_body();
        let current = self.dispatcher.dispatch(&fetch).await?;
        if !current.is_success() {
            return Err(DispatchError::Status {
                status: current.status,
                url: fetch.url,
            }
            .into());
        }

        let requests = self.generate_validate_requests(&template, &current.body)?;
        info!("Completing {} score step(s)", requests.len());
        dispatch_all(Arc::clone(&self.dispatcher), requests).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{MAX_TIME_CHUNKS, time_chunks};
    use tempo_common::error::ServiceError;

    #[test]
    fn test_time_chunks() {
        assert_eq!(time_chunks(1_000_000, 480_000).unwrap(), vec![480_000, 480_000, 40_000]);
        assert_eq!(time_chunks(480_000, 480_000).unwrap(), vec![480_000]);
        assert_eq!(time_chunks(0, 480_000).unwrap(), Vec::<u64>::new());
        assert_eq!(time_chunks(480_001, 480_000).unwrap(), vec![480_000, 1]);
    }

    #[test]
    fn test_time_chunks_without_limit() {
        assert_eq!(time_chunks(5, 0).unwrap(), vec![5]);
        assert!(time_chunks(0, 0).unwrap().is_empty());
        assert_eq!(time_chunks(u64::MAX, 0).unwrap(), vec![u64::MAX]);
    }

    #[test]
    fn test_time_chunks_rejects_excessive_totals() {
        let at_limit = time_chunks(MAX_TIME_CHUNKS * 1_000, 1_000).unwrap();
        assert_eq!(at_limit.len() as u64, MAX_TIME_CHUNKS);

        let err = time_chunks(MAX_TIME_CHUNKS * 1_000 + 1, 1_000).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidDuration(_)));
        assert!(matches!(
            time_chunks(u64::MAX, 480_000),
            Err(ServiceError::InvalidDuration(_))
        ));
    }
}
