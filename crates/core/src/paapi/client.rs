use crate::affiliate::{AffiliateLinkBuilder, DEFAULT_CAMPAIGN};
use crate::config::Settings;
use crate::domain::product::{PriceInfo, ProductRecord, AVAILABILITY_IN_STOCK, DEFAULT_CURRENCY};
use crate::paapi::error::LookupError;
use crate::paapi::signer::{SignedHeaders, Signer, SigningRequest};
use crate::paapi::types::{GetItemsRequest, GetItemsResponse, Item, Offers, GET_ITEMS_RESOURCES, PARTNER_TYPE};
use crate::paapi::ProductLookup;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;

const SERVICE: &str = "ProductAdvertisingAPI";
const GET_ITEMS_PATH: &str = "/paapi5/getitems";
const GET_ITEMS_TARGET: &str = "com.amazon.paapi5.v1.ProductAdvertisingAPIv1.GetItems";
const CONTENT_TYPE: &str = "application/json; charset=UTF-8";
const CONTENT_ENCODING: &str = "amz-1.0";

/// Affiliate link source stamped on records produced by lookups.
const LINK_SOURCE: &str = "tracker";

#[derive(Debug, Clone)]
pub struct PaapiClient {
    http: reqwest::Client,
    host: String,
    partner_tag: String,
    marketplace: String,
    signer: Signer,
    links: AffiliateLinkBuilder,
}

impl PaapiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        for (name, value) in [
            ("AMAZON_ACCESS_KEY", &settings.amazon_access_key),
            ("AMAZON_SECRET_KEY", &settings.amazon_secret_key),
            ("AMAZON_PARTNER_TAG", &settings.amazon_partner_tag),
        ] {
            if value.is_none() {
                tracing::warn!(var = name, "PA-API credential missing; requests will be signed with an empty value");
            }
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.amazon_timeout_secs))
            .build()
            .context("failed to build PA-API http client")?;

        let signer = Signer::new(
            settings.amazon_access_key.clone().unwrap_or_default(),
            settings.amazon_secret_key.clone().unwrap_or_default(),
            settings.amazon_region.clone(),
            SERVICE,
        );

        Ok(Self {
            http,
            host: settings.amazon_host(),
            partner_tag: settings.amazon_partner_tag.clone().unwrap_or_default(),
            marketplace: settings.amazon_marketplace.clone(),
            signer,
            links: AffiliateLinkBuilder::from_settings(settings),
        })
    }

    fn url(&self) -> String {
        format!("https://{}{}", self.host, GET_ITEMS_PATH)
    }

    /// Serialised body plus the headers that sign exactly those bytes.
    fn signed_payload(&self, asin: &str, at: DateTime<Utc>) -> Result<(String, SignedHeaders), LookupError> {
        let req = GetItemsRequest {
            partner_tag: &self.partner_tag,
            partner_type: PARTNER_TYPE,
            marketplace: &self.marketplace,
            item_ids: vec![asin],
            resources: GET_ITEMS_RESOURCES,
        };
        let payload = serde_json::to_string(&req)?;

        let signed = self.signer.sign(
            &SigningRequest {
                method: "POST",
                uri: GET_ITEMS_PATH,
                query: "",
                host: &self.host,
                payload: &payload,
            },
            at,
        );
        Ok((payload, signed))
    }
}

#[async_trait::async_trait]
impl ProductLookup for PaapiClient {
    fn provider_name(&self) -> &'static str {
        "amazon_paapi5"
    }

    async fn lookup(&self, asin: &str) -> Result<Option<ProductRecord>, LookupError> {
        let now = Utc::now();
        let (payload, signed) = self.signed_payload(asin, now)?;

        let res = self
            .http
            .post(self.url())
            .header("content-type", CONTENT_TYPE)
            .header("content-encoding", CONTENT_ENCODING)
            .header("x-amz-target", GET_ITEMS_TARGET)
            .header("x-amz-date", signed.amz_date)
            .header("authorization", signed.authorization)
            .body(payload)
            .send()
            .await?;

        let status = res.status();
        let text = res.text().await?;

        if !status.is_success() {
            tracing::warn!(%asin, http_status = %status, body = %text, "PA-API GetItems failed");
            return Err(LookupError::Http { status, body: text });
        }

        parse_get_items(&text, asin, &self.links, now)
    }
}

pub fn parse_get_items(
    body: &str,
    asin: &str,
    links: &AffiliateLinkBuilder,
    now: DateTime<Utc>,
) -> Result<Option<ProductRecord>, LookupError> {
    let parsed = serde_json::from_str::<GetItemsResponse>(body)?;

    let Some(item) = parsed
        .items_result
        .and_then(|r| r.items)
        .and_then(|items| items.into_iter().next())
    else {
        tracing::debug!(%asin, "PA-API response has no ItemsResult.Items");
        return Ok(None);
    };

    Ok(Some(record_from_item(item, asin, links, now)))
}

fn record_from_item(
    item: Item,
    asin: &str,
    links: &AffiliateLinkBuilder,
    now: DateTime<Utc>,
) -> ProductRecord {
    let title = item
        .item_info
        .title
        .map(|t| t.display_value)
        .unwrap_or_default();
    let brand = item
        .item_info
        .by_line_info
        .and_then(|b| b.brand)
        .map(|b| b.display_value)
        .unwrap_or_default();
    let image_url = item
        .images
        .primary
        .and_then(|p| p.large)
        .map(|l| l.url)
        .unwrap_or_default();

    ProductRecord {
        asin: asin.to_string(),
        title,
        brand,
        image_url,
        affiliate_url: links.build(asin, LINK_SOURCE, DEFAULT_CAMPAIGN),
        price_info: extract_price_info(asin, item.offers),
        last_updated: now,
    }
}

/// Original price is the current price unless the offer summary reports a higher one.
pub fn extract_price_info(asin: &str, offers: Option<Value>) -> PriceInfo {
    let offers = match offers {
        None | Some(Value::Null) => Offers::default(),
        Some(v) => match serde_json::from_value::<Offers>(v) {
            Ok(o) => o,
            Err(err) => {
                tracing::warn!(%asin, error = %err, "failed to decode PA-API offers; degrading price");
                return PriceInfo::degraded();
            }
        },
    };

    let Some(listing) = offers.listings.into_iter().next() else {
        return PriceInfo::out_of_stock();
    };

    let (current_price, currency) = match listing.price {
        Some(p) => (p.amount.unwrap_or(0.0), p.currency),
        None => (0.0, None),
    };

    let mut original_price = current_price;
    let highest = offers
        .summaries
        .first()
        .and_then(|s| s.highest_price.as_ref())
        .and_then(|m| m.amount);
    if let Some(highest) = highest {
        if highest > current_price {
            original_price = highest;
        }
    }

    let availability = listing
        .availability
        .and_then(|a| a.message)
        .unwrap_or_else(|| AVAILABILITY_IN_STOCK.to_string());

    PriceInfo {
        current_price,
        original_price,
        currency: currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        availability,
    }
}
