pub mod affiliate;
pub mod domain;
pub mod paapi;
pub mod storage;
pub mod tracker;

pub mod config {
    use anyhow::Context;

    const DEFAULT_REGION: &str = "us-east-1";
    const DEFAULT_MARKETPLACE: &str = "www.amazon.com";
    const DEFAULT_AMAZON_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_PORT: u16 = 8000;
    const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub db_max_connections: u32,
        pub sentry_dsn: Option<String>,
        pub amazon_access_key: Option<String>,
        pub amazon_secret_key: Option<String>,
        pub amazon_partner_tag: Option<String>,
        pub amazon_associate_tag: Option<String>,
        pub amazon_region: String,
        pub amazon_host: Option<String>,
        pub amazon_marketplace: String,
        pub amazon_timeout_secs: u64,
        pub port: u16,
        pub cors_allowed_origins: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_vars(|name| std::env::var(name).ok())
        }

        /// Blank values count as unset; unparsable numbers fall back to their defaults.
        pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
            let non_blank = |name: &str| var(name).filter(|s| !s.trim().is_empty());
            let number = |name: &str| non_blank(name).and_then(|s| s.trim().parse::<u64>().ok());

            Ok(Self {
                database_url: var("DATABASE_URL"),
                db_max_connections: number("DB_MAX_CONNECTIONS")
                    .and_then(|n| u32::try_from(n).ok())
                    .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
                sentry_dsn: var("SENTRY_DSN"),
                amazon_access_key: var("AMAZON_ACCESS_KEY"),
                amazon_secret_key: var("AMAZON_SECRET_KEY"),
                amazon_partner_tag: var("AMAZON_PARTNER_TAG"),
                amazon_associate_tag: var("AMAZON_ASSOCIATE_TAG"),
                amazon_region: non_blank("AMAZON_REGION")
                    .unwrap_or_else(|| DEFAULT_REGION.to_string()),
                amazon_host: non_blank("AMAZON_HOST"),
                amazon_marketplace: non_blank("AMAZON_MARKETPLACE")
                    .unwrap_or_else(|| DEFAULT_MARKETPLACE.to_string()),
                amazon_timeout_secs: number("AMAZON_TIMEOUT_SECS")
                    .unwrap_or(DEFAULT_AMAZON_TIMEOUT_SECS),
                port: number("PORT")
                    .and_then(|n| u16::try_from(n).ok())
                    .unwrap_or(DEFAULT_PORT),
                cors_allowed_origins: var("CORS_ALLOWED_ORIGINS"),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        /// PA-API endpoint host. The default is derived from the region.
        pub fn amazon_host(&self) -> String {
            self.amazon_host
                .clone()
                .unwrap_or_else(|| format!("webservices.amazon.{}.amazon.com", self.amazon_region))
        }

        /// Associate tag embedded in affiliate links. Missing config yields an empty tag.
        pub fn associate_tag(&self) -> String {
            self.amazon_associate_tag.clone().unwrap_or_default()
        }
    }

}
