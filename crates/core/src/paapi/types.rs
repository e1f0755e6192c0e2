use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PARTNER_TYPE: &str = "Associates";

pub const GET_ITEMS_RESOURCES: &[&str] = &[
    "ItemInfo.Title",
    "ItemInfo.ByLineInfo",
    "ItemInfo.Classifications",
    "ItemInfo.ExternalIds",
    "ItemInfo.Features",
    "ItemInfo.ManufactureInfo",
    "ItemInfo.ProductInfo",
    "ItemInfo.TechnicalInfo",
    "Images.Primary.Large",
    "Images.Variants",
    "Offers.Listings.Price",
    "Offers.Listings.Availability",
    "Offers.Listings.Condition",
    "Offers.Listings.DeliveryInfo",
    "Offers.Listings.MerchantInfo",
    "Offers.Summaries.HighestPrice",
    "Offers.Summaries.LowestPrice",
    "Offers.Summaries.OfferCount",
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemsRequest<'a> {
    pub partner_tag: &'a str,
    pub partner_type: &'a str,
    pub marketplace: &'a str,
    pub item_ids: Vec<&'a str>,
    pub resources: &'a [&'a str],
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemsResponse {
    #[serde(default)]
    pub items_result: Option<ItemsResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemsResult {
    #[serde(default)]
    pub items: Option<Vec<Item>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Item {
    #[serde(default, rename = "ASIN")]
    pub asin: Option<String>,
    #[serde(default)]
    pub item_info: ItemInfo,
    #[serde(default)]
    pub images: Images,

    // Decoded separately so a malformed offers block only degrades the price.
    #[serde(default)]
    pub offers: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemInfo {
    #[serde(default)]
    pub title: Option<DisplayValue>,
    #[serde(default)]
    pub by_line_info: Option<ByLineInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ByLineInfo {
    #[serde(default)]
    pub brand: Option<DisplayValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DisplayValue {
    #[serde(default)]
    pub display_value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Images {
    #[serde(default)]
    pub primary: Option<ImageSet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageSet {
    #[serde(default)]
    pub large: Option<Image>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Image {
    #[serde(default, rename = "URL")]
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Offers {
    #[serde(default)]
    pub listings: Vec<Listing>,
    #[serde(default)]
    pub summaries: Vec<OfferSummary>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Listing {
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub availability: Option<Availability>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Money {
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Availability {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OfferSummary {
    #[serde(default)]
    pub highest_price: Option<Money>,
}
