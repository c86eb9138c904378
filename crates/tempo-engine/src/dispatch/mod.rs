//! Outbound request dispatch.
//!
//! Two strategies exist: [`DirectDispatcher`] sends from this process, while
//! [`PageDispatcher`] asks the active browser tab to issue the call so the
//! server sees the page's own origin. Services receive one of them at
//! construction and never choose at call time.

pub mod direct;
pub mod page;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::sync::Arc;
use tempo_common::error::DispatchError;
use tempo_common::request::CapturedRequest;

pub use direct::DirectDispatcher;
pub use page::{PageContext, PageDispatcher, PageRequest};

/// What came back from a dispatched request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchOutcome {
    pub status: u16,
    pub body: String,
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Send the request. Only transport failures are errors; any HTTP status
    /// counts as a completed dispatch.
    async fn dispatch(&self, request: &CapturedRequest) -> Result<DispatchOutcome, DispatchError>;
}

/// Dispatch every request concurrently and wait for all of them.
///
/// All requests are spawned before any is awaited. The first failure observed
/// is returned immediately; siblings already in flight keep running in the
/// background and their results are dropped. Returns the number of requests
/// sent when every one succeeds.
pub async fn dispatch_all(
    dispatcher: Arc<dyn Dispatcher>,
    requests: Vec<CapturedRequest>,
) -> Result<usize, DispatchError> {
    let mut pending: FuturesUnordered<_> = requests
        .into_iter()
        .map(|request| {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move { dispatcher.dispatch(&request).await })
        })
        .collect();

    let mut completed = 0;
    while let Some(joined) = pending.next().await {
        let outcome = joined.map_err(|e| DispatchError::Task(e.to_string()))??;
        tracing::debug!("Batch member finished with status {}", outcome.status);
        completed += 1;
    }
    Ok(completed)
}
