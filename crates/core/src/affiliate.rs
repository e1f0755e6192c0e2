use crate::domain::product::TrendingItem;
use serde::{Deserialize, Serialize};

const PRODUCT_BASE_URL: &str = "https://www.amazon.com/dp";
const LINK_PREFIX: &str = "zobda";
const LINK_CODE: &str = "ur2";
const REF_CODE: &str = "as_li_ss_tl";
const CREATIVE_ID: &str = "9325";

pub const DEFAULT_CAMPAIGN: &str = "default";

/// Anything that carries an ASIN and can take an affiliate link.
pub trait AffiliateLinked {
    fn asin(&self) -> &str;

    fn campaign(&self) -> Option<&str> {
        None
    }

    fn set_affiliate_url(&mut self, url: String);
}

impl AffiliateLinked for TrendingItem {
    fn asin(&self) -> &str {
        &self.asin
    }

    fn campaign(&self) -> Option<&str> {
        self.campaign.as_deref()
    }

    fn set_affiliate_url(&mut self, url: String) {
        self.affiliate_url = url;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffiliateStats {
    pub associate_tag: String,
    pub commission_rate: String,
    pub cookie_duration: String,
    pub tracking_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct AffiliateLinkBuilder {
    associate_tag: String,
}

impl AffiliateLinkBuilder {
    pub fn new(associate_tag: impl Into<String>) -> Self {
        Self {
            associate_tag: associate_tag.into(),
        }
    }

    pub fn from_settings(settings: &crate::config::Settings) -> Self {
        if settings.amazon_associate_tag.is_none() {
            tracing::warn!("AMAZON_ASSOCIATE_TAG is not set; affiliate links carry an empty tag");
        }
        Self::new(settings.associate_tag())
    }

    pub fn associate_tag(&self) -> &str {
        &self.associate_tag
    }

    /// Renders the tracking URL. Values are inserted verbatim, without percent-encoding.
    pub fn build(&self, asin: &str, source: &str, campaign: &str) -> String {
        let link_id = format!("{LINK_PREFIX}-{source}-{campaign}");
        let params = [
            ("tag", self.associate_tag.clone()),
            ("linkCode", LINK_CODE.to_string()),
            ("linkId", link_id.clone()),
            ("ref_", REF_CODE.to_string()),
            ("ascsubtag", format!("{link_id}-{asin}")),
            ("creative", CREATIVE_ID.to_string()),
            ("creativeASIN", asin.to_string()),
        ];

        let query = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        format!("{PRODUCT_BASE_URL}/{asin}?{query}")
    }

    pub fn build_batch<T: AffiliateLinked>(&self, mut items: Vec<T>, source: &str) -> Vec<T> {
        for item in &mut items {
            let campaign = item.campaign().unwrap_or(DEFAULT_CAMPAIGN).to_string();
            let url = self.build(item.asin(), source, &campaign);
            item.set_affiliate_url(url);
        }
        items
    }

    pub fn stats(&self) -> AffiliateStats {
        AffiliateStats {
            associate_tag: self.associate_tag.clone(),
            commission_rate: "1-4%".to_string(),
            cookie_duration: "24 hours".to_string(),
            tracking_enabled: true,
        }
    }
}
