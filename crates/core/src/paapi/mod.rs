pub mod client;
pub mod error;
pub mod signer;
pub mod types;

use crate::domain::product::ProductRecord;
use error::LookupError;

#[async_trait::async_trait]
pub trait ProductLookup: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// `Ok(None)` means the API answered but returned no item for the ASIN.
    async fn lookup(&self, asin: &str) -> Result<Option<ProductRecord>, LookupError>;
}
