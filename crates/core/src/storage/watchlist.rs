use crate::domain::watchlist::{TriggeredAlert, WatchlistEntry, WatchlistItem};
use crate::storage::{PriceStore, StoreError};
use chrono::{DateTime, Utc};
use uuid::Uuid;

impl PriceStore {
    /// Re-adding an ASIN for the same user replaces its alert price.
    pub async fn add_watch(
        &self,
        user_id: &str,
        asin: &str,
        alert_price: Option<f64>,
    ) -> Result<WatchlistEntry, StoreError> {
        let (id, user_id, asin, alert_price, created_at) =
            sqlx::query_as::<_, (Uuid, String, String, Option<f64>, DateTime<Utc>)>(
                "INSERT INTO watchlist_entries (user_id, asin, alert_price) \
                 VALUES ($1, $2, $3) \
                 ON CONFLICT (user_id, asin) DO UPDATE SET alert_price = EXCLUDED.alert_price \
                 RETURNING id, user_id, asin, alert_price, created_at",
            )
            .bind(user_id)
            .bind(asin)
            .bind(alert_price)
            .fetch_one(&self.pool)
            .await?;

        Ok(WatchlistEntry {
            id,
            user_id,
            asin,
            alert_price,
            created_at,
        })
    }

    pub async fn list_watch(&self, user_id: &str) -> Result<Vec<WatchlistItem>, StoreError> {
        let rows = sqlx::query_as::<_, (Uuid, String, Option<f64>, String, String, String, Option<f64>)>(
            "SELECT w.id, w.asin, w.alert_price, \
                    COALESCE(p.title, ''), COALESCE(p.image_url, ''), COALESCE(p.affiliate_url, ''), \
                    latest.current_price \
             FROM watchlist_entries w \
             LEFT JOIN products p ON p.asin = w.asin \
             LEFT JOIN LATERAL ( \
               SELECT o.current_price FROM price_observations o \
               WHERE o.asin = w.asin \
               ORDER BY o.tracked_at DESC \
               LIMIT 1 \
             ) latest ON true \
             WHERE w.user_id = $1 \
             ORDER BY w.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, asin, target_price, title, image_url, product_url, last_price)| WatchlistItem {
                    id,
                    asin,
                    target_price,
                    title,
                    image_url,
                    product_url,
                    last_price,
                },
            )
            .collect())
    }

    /// Returns whether a row was removed.
    pub async fn remove_watch(&self, user_id: &str, asin: &str) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM watchlist_entries WHERE user_id = $1 AND asin = $2")
            .bind(user_id)
            .bind(asin)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Distinct watched ASINs, oldest interest first.
    pub async fn watched_asins(&self) -> Result<Vec<String>, StoreError> {
        let asins: Vec<String> = sqlx::query_scalar(
            "SELECT asin FROM watchlist_entries \
             GROUP BY asin \
             ORDER BY MIN(created_at) ASC, asin ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(asins)
    }

    pub async fn triggered_alerts(&self) -> Result<Vec<TriggeredAlert>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String, f64, f64, DateTime<Utc>)>(
            "SELECT w.user_id, w.asin, w.alert_price, latest.current_price, latest.tracked_at \
             FROM watchlist_entries w \
             JOIN LATERAL ( \
               SELECT o.current_price, o.tracked_at FROM price_observations o \
               WHERE o.asin = w.asin \
               ORDER BY o.tracked_at DESC \
               LIMIT 1 \
             ) latest ON true \
             WHERE w.alert_price IS NOT NULL \
             ORDER BY w.user_id ASC, w.asin ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter(|(_, _, alert_price, current_price, _)| {
                TriggeredAlert::is_triggered(*alert_price, *current_price)
            })
            .map(
                |(user_id, asin, alert_price, current_price, tracked_at)| TriggeredAlert {
                    user_id,
                    asin,
                    alert_price,
                    current_price,
                    tracked_at,
                },
            )
            .collect())
    }
}
