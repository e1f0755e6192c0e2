use crate::error::ApiError;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;
use zobda_core::affiliate::{AffiliateLinkBuilder, AffiliateStats};
use zobda_core::domain::product::{HistoryPoint, HistorySummary, ProductDetail, TrendingItem};
use zobda_core::domain::watchlist::{WatchlistEntry, WatchlistItem};
use zobda_core::paapi::ProductLookup;
use zobda_core::storage::PriceStore;
use zobda_core::tracker::PriceTracker;

const DEFAULT_HISTORY_DAYS: i64 = 30;
const DEFAULT_TRENDING_LIMIT: i64 = 10;

#[derive(Clone)]
pub struct AppState {
    pub store: Option<PriceStore>,
    pub lookup: Arc<dyn ProductLookup>,
    pub links: AffiliateLinkBuilder,
}

impl AppState {
    fn store(&self) -> Result<&PriceStore, ApiError> {
        self.store.as_ref().ok_or(ApiError::Unavailable)
    }

    fn tracker(&self) -> Result<PriceTracker, ApiError> {
        let store = self.store()?.clone();
        Ok(PriceTracker::new(self.lookup.clone(), Arc::new(store)))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/api/products/:asin", get(get_product))
        .route("/api/products/:asin/history", get(get_price_history))
        .route("/api/trending", get(get_trending))
        .route("/api/track", axum::routing::post(track_products))
        .route("/api/affiliate/stats", get(get_affiliate_stats))
        .route(
            "/api/watchlist",
            get(list_watchlist)
                .post(add_to_watchlist)
                .delete(remove_from_watchlist),
        )
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Zobda API is running" }))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn get_product(
    State(state): State<AppState>,
    Path(asin): Path<String>,
) -> Result<Json<ProductDetail>, ApiError> {
    if let Some(store) = &state.store {
        if let Some((product, latest)) = store.find_product(&asin).await? {
            return Ok(Json(ProductDetail::from_stored(product, latest)));
        }
    }

    // Unknown locally: answer from a live lookup without persisting it.
    match state.lookup.lookup(&asin).await {
        Ok(Some(record)) => {
            let affiliate_url = state.links.build(&asin, "api", "product-detail");
            Ok(Json(ProductDetail::from_record(record, affiliate_url)))
        }
        Ok(None) => Err(ApiError::NotFound("Product not found".to_string())),
        Err(err) => {
            tracing::warn!(%asin, error = %err, "live product lookup failed");
            Err(ApiError::NotFound("Product not found".to_string()))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    asin: String,
    history: Vec<HistoryPoint>,
    summary: HistorySummary,
}

async fn get_price_history(
    State(state): State<AppState>,
    Path(asin): Path<String>,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let days = q.days.unwrap_or(DEFAULT_HISTORY_DAYS);
    let history = state.store()?.history(&asin, days).await?;
    let summary = HistorySummary::from_points(&history);
    Ok(Json(HistoryResponse {
        asin,
        history,
        summary,
    }))
}

#[derive(Debug, Deserialize)]
pub struct TrendingQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
struct TrendingResponse {
    products: Vec<TrendingItem>,
}

async fn get_trending(
    State(state): State<AppState>,
    Query(q): Query<TrendingQuery>,
) -> Result<Json<TrendingResponse>, ApiError> {
    let limit = q.limit.unwrap_or(DEFAULT_TRENDING_LIMIT);
    let trending = state.store()?.trending(limit).await?;
    Ok(Json(TrendingResponse {
        products: state.links.build_batch(trending, "trending"),
    }))
}

#[derive(Debug, Serialize)]
struct TrackResponse {
    results: BTreeMap<String, bool>,
}

async fn track_products(
    State(state): State<AppState>,
    Json(asins): Json<Vec<String>>,
) -> Result<Json<TrackResponse>, ApiError> {
    let asins = normalize_asins(asins);
    let results = state.tracker()?.track(&asins).await;
    Ok(Json(TrackResponse { results }))
}

async fn get_affiliate_stats(State(state): State<AppState>) -> Json<AffiliateStats> {
    Json(state.links.stats())
}

#[derive(Debug, Deserialize)]
pub struct AddWatchRequest {
    pub user_id: String,
    pub asin: String,
    #[serde(default)]
    pub target_price: Option<f64>,
}

#[derive(Debug, Serialize)]
struct AddWatchResponse {
    id: Uuid,
}

impl From<WatchlistEntry> for AddWatchResponse {
    fn from(entry: WatchlistEntry) -> Self {
        Self { id: entry.id }
    }
}

async fn add_to_watchlist(
    State(state): State<AppState>,
    Json(req): Json<AddWatchRequest>,
) -> Result<Json<AddWatchResponse>, ApiError> {
    let (user_id, asin) = validate_watch_key(&req.user_id, &req.asin)?;
    if let Some(p) = req.target_price {
        if !p.is_finite() || p < 0.0 {
            return Err(ApiError::BadRequest(
                "target_price must be a non-negative number".to_string(),
            ));
        }
    }

    let entry = state
        .store()?
        .add_watch(user_id, asin, req.target_price)
        .await?;
    tracing::debug!(user_id = %entry.user_id, asin = %entry.asin, alert_price = ?entry.alert_price, "watch saved");
    Ok(Json(AddWatchResponse::from(entry)))
}

#[derive(Debug, Deserialize)]
pub struct WatchlistQuery {
    pub user_id: String,
}

async fn list_watchlist(
    State(state): State<AppState>,
    Query(q): Query<WatchlistQuery>,
) -> Result<Json<Vec<WatchlistItem>>, ApiError> {
    let user_id = q.user_id.trim();
    if user_id.is_empty() {
        return Err(ApiError::BadRequest("user_id is required".to_string()));
    }
    Ok(Json(state.store()?.list_watch(user_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct RemoveWatchRequest {
    pub user_id: String,
    pub asin: String,
}

async fn remove_from_watchlist(
    State(state): State<AppState>,
    Json(req): Json<RemoveWatchRequest>,
) -> Result<StatusCode, ApiError> {
    let (user_id, asin) = validate_watch_key(&req.user_id, &req.asin)?;
    let removed = state.store()?.remove_watch(user_id, asin).await?;
    removal_status(removed)
}

fn removal_status(removed: bool) -> Result<StatusCode, ApiError> {
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Watchlist entry not found".to_string()))
    }
}

fn validate_watch_key<'a>(user_id: &'a str, asin: &'a str) -> Result<(&'a str, &'a str), ApiError> {
    let user_id = user_id.trim();
    let asin = asin.trim();
    if user_id.is_empty() {
        return Err(ApiError::BadRequest("user_id is required".to_string()));
    }
    if asin.is_empty() {
        return Err(ApiError::BadRequest("asin is required".to_string()));
    }
    Ok((user_id, asin))
}

/// Trims and drops blank entries; order and duplicates are kept.
fn normalize_asins(asins: Vec<String>) -> Vec<String> {
    asins
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, Uri};
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tower::ServiceExt;
    use zobda_core::domain::product::{PriceInfo, ProductRecord};
    use zobda_core::paapi::error::LookupError;

    enum Canned {
        Found(ProductRecord),
        Missing,
        Fails,
    }

    struct FakeLookup {
        answers: HashMap<String, Canned>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeLookup {
        fn new(answers: Vec<(&str, Canned)>) -> Arc<Self> {
            Arc::new(Self {
                answers: answers
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl ProductLookup for FakeLookup {
        fn provider_name(&self) -> &'static str {
            "fake"
        }

        async fn lookup(&self, asin: &str) -> Result<Option<ProductRecord>, LookupError> {
            self.calls.lock().unwrap().push(asin.to_string());
            match self.answers.get(asin) {
                Some(Canned::Found(r)) => Ok(Some(r.clone())),
                Some(Canned::Missing) | None => Ok(None),
                Some(Canned::Fails) => Err(LookupError::Http {
                    status: StatusCode::TOO_MANY_REQUESTS,
                    body: "throttled".to_string(),
                }),
            }
        }
    }

    fn record(asin: &str) -> ProductRecord {
        ProductRecord {
            asin: asin.to_string(),
            title: "Kettle".to_string(),
            brand: "Acme".to_string(),
            image_url: "https://img.example/k.jpg".to_string(),
            affiliate_url: "https://www.amazon.com/dp/ignored".to_string(),
            price_info: PriceInfo::new(19.99, 24.99, "InStock"),
            last_updated: Utc.with_ymd_and_hms(2026, 10, 14, 9, 0, 0).unwrap(),
        }
    }

    fn app(store: Option<PriceStore>, lookup: Arc<FakeLookup>) -> Router {
        router(AppState {
            store,
            lookup,
            links: AffiliateLinkBuilder::new("zobda-20"),
        })
    }

    // Never connects; only usable while no query reaches the database.
    fn unreachable_store() -> PriceStore {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://zobda@127.0.0.1:1/zobda")
            .unwrap();
        PriceStore::new(pool)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn database_endpoints_are_unavailable_without_a_store() {
        let requests = vec![
            get("/api/products/B000123ABC/history?days=7"),
            get("/api/trending"),
            json_request("POST", "/api/track", json!(["B000123ABC"])),
            get("/api/watchlist?user_id=user_1"),
            json_request("POST", "/api/watchlist", json!({"user_id": "user_1", "asin": "B1"})),
            json_request("DELETE", "/api/watchlist", json!({"user_id": "user_1", "asin": "B1"})),
        ];

        for req in requests {
            let uri = req.uri().clone();
            let (status, body) = send(app(None, FakeLookup::new(vec![])), req).await;
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{uri}");
            assert_eq!(body, json!({"detail": "database unavailable"}), "{uri}");
        }
    }

    #[tokio::test]
    async fn unknown_product_is_answered_from_live_lookup() {
        let lookup = FakeLookup::new(vec![("B000123ABC", Canned::Found(record("B000123ABC")))]);
        let (status, body) = send(app(None, lookup.clone()), get("/api/products/B000123ABC")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["asin"], "B000123ABC");
        assert_eq!(body["title"], "Kettle");
        assert_eq!(
            body["affiliate_url"],
            AffiliateLinkBuilder::new("zobda-20").build("B000123ABC", "api", "product-detail")
        );
        assert_eq!(*lookup.calls.lock().unwrap(), vec!["B000123ABC".to_string()]);
    }

    #[tokio::test]
    async fn missing_or_failed_live_lookup_is_not_found() {
        let lookup = FakeLookup::new(vec![
            ("B000000001", Canned::Missing),
            ("B000000002", Canned::Fails),
        ]);
        for asin in ["B000000001", "B000000002"] {
            let (status, body) =
                send(app(None, lookup.clone()), get(&format!("/api/products/{asin}"))).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{asin}");
            assert_eq!(body, json!({"detail": "Product not found"}));
        }
    }

    #[tokio::test]
    async fn track_reports_result_per_asin() {
        let lookup = FakeLookup::new(vec![
            ("B000000001", Canned::Missing),
            ("B000000002", Canned::Fails),
        ]);
        let req = json_request("POST", "/api/track", json!([" B000000001 ", "", "B000000002"]));
        let (status, body) = send(app(Some(unreachable_store()), lookup.clone()), req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"results": {"B000000001": false, "B000000002": false}})
        );
        assert_eq!(
            *lookup.calls.lock().unwrap(),
            vec!["B000000001".to_string(), "B000000002".to_string()]
        );
    }

    #[tokio::test]
    async fn blank_watch_key_is_rejected_before_the_store() {
        let req = json_request("DELETE", "/api/watchlist", json!({"user_id": " ", "asin": "B1"}));
        let (status, body) = send(app(None, FakeLookup::new(vec![])), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"detail": "user_id is required"}));

        let (status, _) =
            send(app(None, FakeLookup::new(vec![])), get("/api/watchlist?user_id=")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn stats_and_root_need_no_database() {
        let (status, body) =
            send(app(None, FakeLookup::new(vec![])), get("/api/affiliate/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["associate_tag"], "zobda-20");
        assert_eq!(body["tracking_enabled"], true);

        let (status, body) = send(app(None, FakeLookup::new(vec![])), get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Zobda API is running");
    }

    #[test]
    fn removing_nothing_is_not_found() {
        assert_eq!(removal_status(true).unwrap(), StatusCode::NO_CONTENT);
        let err = removal_status(false).unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn add_response_carries_entry_id() {
        let entry = WatchlistEntry {
            id: Uuid::new_v4(),
            user_id: "user_1".to_string(),
            asin: "B000123ABC".to_string(),
            alert_price: Some(18.0),
            created_at: Utc.with_ymd_and_hms(2026, 10, 14, 9, 0, 0).unwrap(),
        };
        let id = entry.id;
        let body = serde_json::to_value(AddWatchResponse::from(entry)).unwrap();
        assert_eq!(body, json!({"id": id}));
    }

    #[test]
    fn history_and_trending_queries_are_optional() {
        let uri: Uri = "/api/products/B1/history".parse().unwrap();
        let Query(q) = Query::<HistoryQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(q.days.unwrap_or(DEFAULT_HISTORY_DAYS), 30);

        let uri: Uri = "/api/trending?limit=3".parse().unwrap();
        let Query(q) = Query::<TrendingQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(q.limit, Some(3));
    }

    #[test]
    fn watchlist_key_must_be_present() {
        assert!(validate_watch_key(" ", "B1").is_err());
        assert!(validate_watch_key("user_1", "").is_err());
        assert_eq!(
            validate_watch_key(" user_1 ", " B1 ").unwrap(),
            ("user_1", "B1")
        );
    }

    #[test]
    fn add_request_accepts_extra_client_fields() {
        let req: AddWatchRequest = serde_json::from_value(json!({
            "user_id": "user_1",
            "asin": "B000123ABC",
            "title": "Kettle",
            "image_url": "https://img.example/k.jpg"
        }))
        .unwrap();
        assert_eq!(req.asin, "B000123ABC");
        assert_eq!(req.target_price, None);
    }

    #[test]
    fn normalizes_track_input() {
        let out = normalize_asins(vec![
            " B000000001 ".to_string(),
            "".to_string(),
            "B000000001".to_string(),
        ]);
        assert_eq!(out, vec!["B000000001", "B000000001"]);
    }
}
