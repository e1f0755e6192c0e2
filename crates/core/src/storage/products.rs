use crate::domain::product::{PriceObservation, Product, ProductRecord};
use crate::storage::observations::{observation_from_row, ObservationRow, OBSERVATION_COLUMNS};
use crate::storage::{PriceStore, StoreError};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub(crate) type ProductRow = (
    Uuid,
    String,
    String,
    String,
    String,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
);

pub(crate) const PRODUCT_COLUMNS: &str =
    "p.id, p.asin, p.title, p.brand, p.image_url, p.affiliate_url, p.created_at, p.updated_at";

pub(crate) fn product_from_row(row: ProductRow) -> Product {
    let (id, asin, title, brand, image_url, affiliate_url, created_at, updated_at) = row;
    Product {
        id,
        asin,
        title,
        brand,
        image_url,
        affiliate_url,
        created_at,
        updated_at,
    }
}

// The no-op assignment makes RETURNING see a row inserted concurrently by another writer.
const UPSERT_PRODUCT: &str =
    "INSERT INTO products (asin, title, brand, image_url, affiliate_url, created_at, updated_at) \
     VALUES ($1, $2, $3, $4, $5, $6, $6) \
     ON CONFLICT (asin) DO UPDATE SET asin = EXCLUDED.asin \
     RETURNING id";

/// Inserts the product on first sight; an existing row keeps its fields. Returns its id.
pub async fn upsert_product(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    record: &ProductRecord,
) -> Result<Uuid, StoreError> {
    let id: Uuid = sqlx::query_scalar(UPSERT_PRODUCT)
        .bind(&record.asin)
        .bind(&record.title)
        .bind(&record.brand)
        .bind(&record.image_url)
        .bind(&record.affiliate_url)
        .bind(record.last_updated)
        .fetch_one(&mut **tx)
        .await?;

    Ok(id)
}

impl PriceStore {
    pub async fn upsert_product(&self, record: &ProductRecord) -> Result<Uuid, StoreError> {
        let mut tx = self.pool.begin().await?;
        let id = upsert_product(&mut tx, record).await?;
        tx.commit().await?;
        Ok(id)
    }

    pub async fn find_product(
        &self,
        asin: &str,
    ) -> Result<Option<(Product, Option<PriceObservation>)>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.asin = $1"
        ))
        .bind(asin)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let product = product_from_row(row);

        let latest = sqlx::query_as::<_, ObservationRow>(&format!(
            "SELECT {OBSERVATION_COLUMNS} FROM price_observations o \
             WHERE o.product_id = $1 \
             ORDER BY o.tracked_at DESC \
             LIMIT 1"
        ))
        .bind(product.id)
        .fetch_optional(&self.pool)
        .await?
        .map(observation_from_row);

        Ok(Some((product, latest)))
    }
}
