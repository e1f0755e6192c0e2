use crate::paapi::error::LookupError;
use crate::paapi::ProductLookup;
use crate::storage::{PriceSink, Recorded, StoreError};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    Tracked(Recorded),
    NotFound,
}

#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("lookup failed: {0}")]
    Lookup(#[from] LookupError),

    #[error("persist failed: {0}")]
    Store(#[from] StoreError),
}

/// Looks up ASINs one at a time and records what comes back.
#[derive(Clone)]
pub struct PriceTracker {
    lookup: Arc<dyn ProductLookup>,
    sink: Arc<dyn PriceSink>,
}

impl PriceTracker {
    pub fn new(lookup: Arc<dyn ProductLookup>, sink: Arc<dyn PriceSink>) -> Self {
        Self { lookup, sink }
    }

    pub async fn track_one(&self, asin: &str) -> Result<TrackOutcome, TrackError> {
        let Some(record) = self.lookup.lookup(asin).await? else {
            return Ok(TrackOutcome::NotFound);
        };
        let recorded = self.sink.record(&record).await?;
        Ok(TrackOutcome::Tracked(recorded))
    }

    /// One failing ASIN is logged and reported as `false`; the rest still run.
    pub async fn track(&self, asins: &[String]) -> BTreeMap<String, bool> {
        let mut results = BTreeMap::new();
        let mut failures: usize = 0;

        for asin in asins {
            let ok = match self.track_one(asin).await {
                Ok(TrackOutcome::Tracked(recorded)) => {
                    tracing::debug!(%asin, observation_id = %recorded.observation_id, "tracked");
                    true
                }
                Ok(TrackOutcome::NotFound) => {
                    tracing::info!(%asin, provider = self.lookup.provider_name(), "no item returned; skipping");
                    false
                }
                Err(err) => {
                    tracing::warn!(%asin, error = %err, "tracking failed; skipping asin");
                    false
                }
            };
            if !ok {
                failures += 1;
            }
            results.insert(asin.clone(), ok);
        }

        tracing::info!(requested = asins.len(), failures, "tracking run finished");
        results
    }
}
