use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's interest in an ASIN. Linked to products by ASIN only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub id: Uuid,
    pub user_id: String,
    pub asin: String,
    pub alert_price: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Watchlist row joined with whatever is known about the product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistItem {
    pub id: Uuid,
    pub asin: String,
    pub target_price: Option<f64>,
    pub title: String,
    pub image_url: String,
    pub product_url: String,
    pub last_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggeredAlert {
    pub user_id: String,
    pub asin: String,
    pub alert_price: f64,
    pub current_price: f64,
    pub tracked_at: DateTime<Utc>,
}

impl TriggeredAlert {
    /// A zero price means no offer (out of stock or a degraded lookup), never a deal.
    pub fn is_triggered(alert_price: f64, current_price: f64) -> bool {
        current_price > 0.0 && current_price <= alert_price
    }
}
