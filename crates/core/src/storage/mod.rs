pub mod observations;
pub mod products;
pub mod watchlist;

use crate::domain::product::ProductRecord;
use anyhow::Context;
use chrono::{DateTime, TimeDelta, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Trailing window used by the trending query.
pub const TRENDING_WINDOW_DAYS: i64 = 7;

pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("sqlx migrations failed")?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recorded {
    pub product_id: Uuid,
    pub observation_id: Uuid,
}

/// Write side of the store, as seen by the tracker.
#[async_trait::async_trait]
pub trait PriceSink: Send + Sync {
    /// Creates the product if needed and appends one observation, atomically.
    async fn record(&self, record: &ProductRecord) -> Result<Recorded, StoreError>;
}

#[derive(Debug, Clone)]
pub struct PriceStore {
    pool: PgPool,
}

impl PriceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PriceSink for PriceStore {
    async fn record(&self, record: &ProductRecord) -> Result<Recorded, StoreError> {
        let mut tx = self.pool.begin().await?;

        let product_id = products::upsert_product(&mut tx, record).await?;
        let observation_id =
            observations::append_observation(&mut tx, product_id, &record.asin, &record.price_info)
                .await?;

        tx.commit().await?;

        tracing::debug!(asin = %record.asin, %product_id, %observation_id, "recorded price observation");
        Ok(Recorded {
            product_id,
            observation_id,
        })
    }
}

/// Inclusive `[now - days, now]`. Negative windows collapse to `now`; windows reaching
/// past the epoch start at the epoch.
pub fn window_bounds(now: DateTime<Utc>, days: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = TimeDelta::try_days(days.max(0))
        .and_then(|span| now.checked_sub_signed(span))
        .map_or(DateTime::<Utc>::UNIX_EPOCH, |start| start.max(DateTime::<Utc>::UNIX_EPOCH));
    (start.min(now), now)
}
