use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_CURRENCY: &str = "USD";
pub const AVAILABILITY_IN_STOCK: &str = "InStock";
pub const AVAILABILITY_OUT_OF_STOCK: &str = "OutOfStock";
pub const AVAILABILITY_ERROR: &str = "Error";
pub const AVAILABILITY_UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceInfo {
    pub current_price: f64,
    pub original_price: f64,
    pub currency: String,
    pub availability: String,
}

impl PriceInfo {
    pub fn new(current_price: f64, original_price: f64, availability: impl Into<String>) -> Self {
        Self {
            current_price,
            original_price,
            currency: DEFAULT_CURRENCY.to_string(),
            availability: availability.into(),
        }
    }

    pub fn out_of_stock() -> Self {
        Self::new(0.0, 0.0, AVAILABILITY_OUT_OF_STOCK)
    }

    /// Placeholder for an offers block that could not be read.
    pub fn degraded() -> Self {
        Self::new(0.0, 0.0, AVAILABILITY_ERROR)
    }

    pub fn unknown() -> Self {
        Self::new(0.0, 0.0, AVAILABILITY_UNKNOWN)
    }
}

/// One product as returned by a PA-API lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub asin: String,
    pub title: String,
    pub brand: String,
    pub image_url: String,
    pub affiliate_url: String,
    pub price_info: PriceInfo,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub asin: String,
    pub title: String,
    pub brand: String,
    pub image_url: String,
    pub affiliate_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceObservation {
    pub id: Uuid,
    pub product_id: Uuid,
    pub asin: String,
    pub current_price: f64,
    pub original_price: f64,
    pub currency: String,
    pub availability: String,
    pub tracked_at: DateTime<Utc>,
}

impl PriceObservation {
    pub fn price_info(&self) -> PriceInfo {
        PriceInfo {
            current_price: self.current_price,
            original_price: self.original_price,
            currency: self.currency.clone(),
            availability: self.availability.clone(),
        }
    }
}

/// Product payload served by the product endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDetail {
    pub asin: String,
    pub title: String,
    pub brand: String,
    pub image_url: String,
    pub affiliate_url: String,
    pub price_info: PriceInfo,
}

impl ProductDetail {
    pub fn from_stored(product: Product, latest: Option<PriceObservation>) -> Self {
        let price_info = latest
            .as_ref()
            .map(PriceObservation::price_info)
            .unwrap_or_else(PriceInfo::unknown);
        Self {
            asin: product.asin,
            title: product.title,
            brand: product.brand,
            image_url: product.image_url,
            affiliate_url: product.affiliate_url,
            price_info,
        }
    }

    pub fn from_record(record: ProductRecord, affiliate_url: String) -> Self {
        Self {
            asin: record.asin,
            title: record.title,
            brand: record.brand,
            image_url: record.image_url,
            affiliate_url,
            price_info: record.price_info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub date: DateTime<Utc>,
    pub price: f64,
    pub original_price: f64,
    pub availability: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub points: usize,
    pub lowest: f64,
    pub highest: f64,
    pub average: f64,
}

impl HistorySummary {
    pub fn from_points(points: &[HistoryPoint]) -> Self {
        if points.is_empty() {
            return Self {
                points: 0,
                lowest: 0.0,
                highest: 0.0,
                average: 0.0,
            };
        }

        let mut lowest = f64::INFINITY;
        let mut highest = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for p in points {
            lowest = lowest.min(p.price);
            highest = highest.max(p.price);
            sum += p.price;
        }

        Self {
            points: points.len(),
            lowest,
            highest,
            average: sum / points.len() as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceDrop {
    pub amount: f64,
    pub percent: f64,
}

impl PriceDrop {
    /// Percent is 0 whenever the original price is not positive.
    pub fn between(original_price: f64, current_price: f64) -> Self {
        let amount = original_price - current_price;
        let percent = if original_price > 0.0 {
            amount / original_price * 100.0
        } else {
            0.0
        };
        Self { amount, percent }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingItem {
    pub asin: String,
    pub title: String,
    pub brand: String,
    pub image_url: String,
    pub affiliate_url: String,
    pub current_price: f64,
    pub original_price: f64,
    pub price_drop: f64,
    pub price_drop_percent: f64,
    pub tracked_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign: Option<String>,
}

impl TrendingItem {
    pub fn from_observation(product: &Product, observation: &PriceObservation) -> Self {
        let drop = PriceDrop::between(observation.original_price, observation.current_price);
        Self {
            asin: product.asin.clone(),
            title: product.title.clone(),
            brand: product.brand.clone(),
            image_url: product.image_url.clone(),
            affiliate_url: product.affiliate_url.clone(),
            current_price: observation.current_price,
            original_price: observation.original_price,
            price_drop: drop.amount,
            price_drop_percent: drop.percent,
            tracked_at: observation.tracked_at,
            campaign: None,
        }
    }
}
