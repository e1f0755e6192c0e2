use anyhow::Context;
use clap::Parser;
use std::collections::HashSet;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zobda_core::paapi::client::PaapiClient;
use zobda_core::storage::PriceStore;
use zobda_core::tracker::PriceTracker;

#[derive(Debug, Parser)]
#[command(name = "zobda_worker")]
struct Args {
    /// ASIN to track. Repeatable.
    #[arg(long = "asin")]
    asins: Vec<String>,

    /// Also track every ASIN on any user's watchlist.
    #[arg(long)]
    watchlist: bool,

    /// Log the resolved ASIN list and exit without calling PA-API or recording prices.
    /// Combined with --watchlist the database is still opened and migrated to read it.
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn needs_store(&self) -> bool {
        self.watchlist || !self.dry_run
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = zobda_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    anyhow::ensure!(
        !args.asins.is_empty() || args.watchlist,
        "nothing to track: pass --asin and/or --watchlist"
    );

    if !args.needs_store() {
        log_plan(&args, &[], &merge_asins(&args.asins, &[]));
        return Ok(());
    }

    let db_url = settings.require_database_url()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    zobda_core::storage::migrate(&pool).await?;
    let store = PriceStore::new(pool);

    let watched = if args.watchlist {
        store
            .watched_asins()
            .await
            .context("load watched asins failed")?
    } else {
        Vec::new()
    };
    let asins = merge_asins(&args.asins, &watched);

    if args.dry_run {
        log_plan(&args, &watched, &asins);
        return Ok(());
    }

    let client = PaapiClient::from_settings(&settings)?;
    let tracker = PriceTracker::new(Arc::new(client), Arc::new(store.clone()));

    let started = chrono::Utc::now();
    let results = tracker.track(&asins).await;
    let tracked = results.values().filter(|ok| **ok).count();

    tracing::info!(
        requested = asins.len(),
        tracked,
        failed = results.len() - tracked,
        elapsed_ms = (chrono::Utc::now() - started).num_milliseconds(),
        results = %serde_json::to_string(&results).unwrap_or_default(),
        "tracking run complete"
    );

    match store.triggered_alerts().await {
        Ok(alerts) => {
            for alert in &alerts {
                tracing::info!(
                    user_id = %alert.user_id,
                    asin = %alert.asin,
                    alert_price = alert.alert_price,
                    current_price = alert.current_price,
                    tracked_at = %alert.tracked_at,
                    "price alert triggered"
                );
            }
        }
        Err(err) => {
            let err = anyhow::Error::new(err);
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "failed to evaluate watchlist alerts");
        }
    }

    Ok(())
}

fn log_plan(args: &Args, watched: &[String], asins: &[String]) {
    tracing::info!(
        dry_run = true,
        explicit = args.asins.len(),
        watched = watched.len(),
        asins = ?asins,
        "tracking plan"
    );
}

/// Explicit ASINs first, then watched ones; trimmed, blanks and repeats dropped.
fn merge_asins(explicit: &[String], watched: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    explicit
        .iter()
        .chain(watched)
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty() && seen.insert(a.clone()))
        .collect()
}

fn init_sentry(settings: &zobda_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
