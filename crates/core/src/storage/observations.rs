use crate::domain::product::{HistoryPoint, PriceInfo, PriceObservation, TrendingItem};
use crate::storage::products::{product_from_row, ProductRow, PRODUCT_COLUMNS};
use crate::storage::{window_bounds, PriceStore, StoreError, TRENDING_WINDOW_DAYS};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub(crate) type ObservationRow = (Uuid, Uuid, String, f64, f64, String, String, DateTime<Utc>);

pub(crate) const OBSERVATION_COLUMNS: &str = "o.id, o.product_id, o.asin, o.current_price, \
     o.original_price, o.currency, o.availability, o.tracked_at";

pub(crate) fn observation_from_row(row: ObservationRow) -> PriceObservation {
    let (id, product_id, asin, current_price, original_price, currency, availability, tracked_at) =
        row;
    PriceObservation {
        id,
        product_id,
        asin,
        current_price,
        original_price,
        currency,
        availability,
        tracked_at,
    }
}

pub async fn append_observation(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    product_id: Uuid,
    asin: &str,
    price: &PriceInfo,
) -> Result<Uuid, StoreError> {
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO price_observations \
           (product_id, asin, current_price, original_price, currency, availability, tracked_at) \
         VALUES ($1, $2, $3, $4, $5, $6, now()) \
         RETURNING id",
    )
    .bind(product_id)
    .bind(asin)
    .bind(price.current_price)
    .bind(price.original_price)
    .bind(&price.currency)
    .bind(&price.availability)
    .fetch_one(&mut **tx)
    .await?;

    Ok(id)
}

impl PriceStore {
    pub async fn append_observation(
        &self,
        product_id: Uuid,
        asin: &str,
        price: &PriceInfo,
    ) -> Result<Uuid, StoreError> {
        let mut tx = self.pool.begin().await?;
        let id = append_observation(&mut tx, product_id, asin, price).await?;
        tx.commit().await?;
        Ok(id)
    }

    /// Ascending by time. Unknown ASINs yield an empty history.
    pub async fn history(&self, asin: &str, window_days: i64) -> Result<Vec<HistoryPoint>, StoreError> {
        let (start, end) = window_bounds(Utc::now(), window_days);

        let rows = sqlx::query_as::<_, (DateTime<Utc>, f64, f64, String)>(
            "SELECT o.tracked_at, o.current_price, o.original_price, o.availability \
             FROM price_observations o \
             JOIN products p ON p.id = o.product_id \
             WHERE p.asin = $1 AND o.tracked_at >= $2 AND o.tracked_at <= $3 \
             ORDER BY o.tracked_at ASC",
        )
        .bind(asin)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(date, price, original_price, availability)| HistoryPoint {
                date,
                price,
                original_price,
                availability,
            })
            .collect())
    }

    /// Most recent observations of the last week with their price drop, newest first.
    pub async fn trending(&self, limit: i64) -> Result<Vec<TrendingItem>, StoreError> {
        let (start, _) = window_bounds(Utc::now(), TRENDING_WINDOW_DAYS);

        let rows = sqlx::query_as::<_, (Uuid, Uuid, String, f64, f64, String, String, DateTime<Utc>, Uuid, String, String, String, String, String, DateTime<Utc>, DateTime<Utc>)>(
            &format!(
                "SELECT {OBSERVATION_COLUMNS}, {PRODUCT_COLUMNS} \
                 FROM price_observations o \
                 JOIN products p ON p.id = o.product_id \
                 WHERE o.tracked_at >= $1 \
                 ORDER BY o.tracked_at DESC \
                 LIMIT $2"
            ),
        )
        .bind(start)
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            let observation = observation_from_row((r.0, r.1, r.2, r.3, r.4, r.5, r.6, r.7));
            let product: ProductRow = (r.8, r.9, r.10, r.11, r.12, r.13, r.14, r.15);
            out.push(TrendingItem::from_observation(&product_from_row(product), &observation));
        }
        Ok(out)
    }
}
