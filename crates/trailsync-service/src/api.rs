//! HTTP endpoints for ingest and synchronization.
//!
//! | Method | Path            | Purpose                                      |
//! |--------|-----------------|----------------------------------------------|
//! | POST   | `/send`         | Ingest a batch of coordinates for a client   |
//! | POST   | `/sync`         | Everything logged at or after a watermark    |
//! | GET    | `/viewtoday`    | Today's samples for a client                 |
//! | GET    | `/sync_all`     | Full history, optionally for one client      |
//! | GET    | `/history`      | Days on which a client has samples           |
//! | GET    | `/serverstatus` | Liveness probe                               |
//! | POST   | `/track`        | Switch live tracking on or off               |
//!
//! Every handler reads the clock once and holds the store lock for the
//! whole operation.
//!
//! ## Error Handling
//!
//! Errors are returned as `{"status": "error", "message": ...}` via
//! [`AppError`]. Malformed requests are 400 and never reach the store.
//! Store errors are 500 and no partial result is returned.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

use trailsync_store::SyncEngine;
use trailsync_types::{Clock, LocationSample, PartitionKey, parse_watermark};

use crate::ingest::IngestError;
use crate::state::AppState;

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/send", post(send))
        .route("/sync", post(sync))
        .route("/viewtoday", get(view_today))
        .route("/sync_all", get(sync_all))
        .route("/history", get(history))
        .route("/serverstatus", get(server_status))
        .route("/track", post(set_tracking))
}

/// A sample as returned to clients.
///
/// `firebaseid` is present only when the read was not filtered by client.
#[derive(Debug, Clone, Serialize)]
pub struct SampleView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firebaseid: Option<String>,
    pub x_cord: Number,
    pub y_cord: Number,
    #[serde(with = "time::serde::rfc3339")]
    pub logged_time: OffsetDateTime,
}

impl SampleView {
    fn from_sample(sample: LocationSample, include_client: bool) -> Self {
        Self {
            firebaseid: include_client.then_some(sample.client_id),
            x_cord: sample.coordinates.x,
            y_cord: sample.coordinates.y,
            logged_time: sample.logged_at,
        }
    }

    fn from_samples(samples: Vec<LocationSample>, client_id: Option<&str>) -> Vec<Self> {
        let include_client = client_id.is_none();
        samples
            .into_iter()
            .map(|s| Self::from_sample(s, include_client))
            .collect()
    }
}

/// Optional `firebaseid` query parameter.
#[derive(Debug, Default, Deserialize)]
pub struct ClientQuery {
    pub firebaseid: Option<String>,
}

impl ClientQuery {
    /// The client filter, treating an empty value as absent.
    fn filter(&self) -> Option<&str> {
        non_empty(self.firebaseid.as_deref())
    }

    /// The client id, required.
    fn required(&self) -> Result<&str, AppError> {
        self.filter()
            .ok_or_else(|| AppError::BadRequest("Missing firebaseid".to_string()))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Ingest request body.
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    #[serde(default)]
    pub firebaseid: Option<String>,
    pub coords: Vec<Value>,
}

/// Ingest response.
#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub status: &'static str,
    pub inserted: usize,
    pub track_active: bool,
}

async fn send(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SendRequest>, JsonRejection>,
) -> Result<Json<SendResponse>, AppError> {
    let Json(request) = payload?;
    let now = state.clock.now();

    let store = state.store.lock().await;
    let outcome = state.ingest.ingest(
        &*store,
        now,
        request.firebaseid.as_deref(),
        &request.coords,
    )?;

    debug!(
        "Ingested {} of {} entries",
        outcome.inserted,
        request.coords.len()
    );

    Ok(Json(SendResponse {
        status: "success",
        inserted: outcome.inserted,
        track_active: outcome.track_active,
    }))
}

/// Resume request body.
///
/// The watermark is taken as raw JSON so a missing value and a value of the
/// wrong type produce different messages.
#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    #[serde(default)]
    pub firebaseid: Option<String>,
    #[serde(default)]
    pub last_synced_timestamp: Option<Value>,
}

/// Response carrying a list of samples.
#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub status: &'static str,
    pub synced_data: Vec<SampleView>,
}

impl SyncResponse {
    fn success(synced_data: Vec<SampleView>) -> Self {
        Self {
            status: "success",
            synced_data,
        }
    }
}

async fn sync(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SyncRequest>, JsonRejection>,
) -> Result<Json<SyncResponse>, AppError> {
    let Json(request) = payload?;

    let raw = request
        .last_synced_timestamp
        .ok_or_else(|| AppError::BadRequest("Missing 'last_synced_timestamp'".to_string()))?;
    let watermark = raw
        .as_str()
        .and_then(|s| parse_watermark(s).ok())
        .ok_or_else(|| AppError::BadRequest("Invalid timestamp format".to_string()))?;

    let client_id = non_empty(request.firebaseid.as_deref());
    let now = state.clock.now();

    let store = state.store.lock().await;
    let samples = SyncEngine::new(&*store).resume_sync(now, watermark, client_id)?;

    debug!("Resume from {} returned {} samples", watermark, samples.len());

    Ok(Json(SyncResponse::success(SampleView::from_samples(
        samples, client_id,
    ))))
}

async fn view_today(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ClientQuery>,
) -> Result<Json<Vec<SampleView>>, AppError> {
    let client_id = query.required()?;
    let now = state.clock.now();

    let store = state.store.lock().await;
    let samples = SyncEngine::new(&*store).today_view(now, Some(client_id))?;

    Ok(Json(SampleView::from_samples(samples, Some(client_id))))
}

async fn sync_all(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ClientQuery>,
) -> Result<Json<SyncResponse>, AppError> {
    let client_id = query.filter();
    let now = state.clock.now();

    let store = state.store.lock().await;
    let samples = SyncEngine::new(&*store).full_sync(now, client_id)?;

    Ok(Json(SyncResponse::success(SampleView::from_samples(
        samples, client_id,
    ))))
}

/// Days holding data for a client.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub available_dates: Vec<PartitionKey>,
}

async fn history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ClientQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let client_id = query.required()?;

    let store = state.store.lock().await;
    let available_dates = SyncEngine::new(&*store).list_history_dates(Some(client_id))?;

    Ok(Json(HistoryResponse { available_dates }))
}

/// Liveness response.
#[derive(Debug, Serialize)]
pub struct ServerStatus {
    pub server: bool,
}

async fn server_status() -> Json<ServerStatus> {
    Json(ServerStatus { server: true })
}

/// Tracking toggle request body.
#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    pub active: bool,
}

/// Tracking toggle response.
#[derive(Debug, Serialize)]
pub struct TrackResponse {
    pub status: &'static str,
    pub track_active: bool,
}

async fn set_tracking(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TrackRequest>, JsonRejection>,
) -> Result<Json<TrackResponse>, AppError> {
    let Json(request) = payload?;
    let track_active = state.ingest.set_tracking(request.active);

    info!(
        "Live tracking {} ({} subscribers)",
        if track_active { "enabled" } else { "disabled" },
        state.live().subscriber_count()
    );

    Ok(Json(TrackResponse {
        status: "success",
        track_active,
    }))
}

/// API error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Store(trailsync_store::Error),
}

impl From<trailsync_store::Error> for AppError {
    fn from(e: trailsync_store::Error) -> Self {
        AppError::Store(e)
    }
}

impl From<IngestError> for AppError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::MissingClientId => AppError::BadRequest(e.to_string()),
            IngestError::Store(e) => AppError::Store(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(format!("Invalid payload: {}", rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => {
                warn!("Rejected request: {}", msg);
                (StatusCode::BAD_REQUEST, msg)
            }
            AppError::Store(e) => {
                error!("Store error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };

        let body = serde_json::json!({
            "status": "error",
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use serde_json::json;
    use time::Duration;
    use time::macros::datetime;
    use tower::ServiceExt;
    use trailsync_store::Store;
    use trailsync_types::ManualClock;

    use crate::config::Config;

    const DAY_D: OffsetDateTime = datetime!(2024-01-15 10:00 UTC);

    fn create_test_app() -> (Router, Arc<ManualClock>) {
        let store = Store::open_in_memory().unwrap();
        let clock = Arc::new(ManualClock::new(DAY_D));
        let state = AppState::with_clock(store, Config::default(), clock.clone());
        (router().with_state(state), clock)
    }

    async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap();
        (status, json)
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        call(
            app,
            Request::builder().uri(uri).body(Body::empty()).unwrap(),
        )
        .await
    }

    async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        call(
            app,
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn send_coords(app: &Router, client: &str, coords: Value) -> Value {
        let (status, json) =
            post_json(app, "/send", json!({"firebaseid": client, "coords": coords})).await;
        assert_eq!(status, StatusCode::OK);
        json
    }

    #[tokio::test]
    async fn test_server_status() {
        let (app, _) = create_test_app();
        let (status, json) = get_json(&app, "/serverstatus").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"server": true}));
    }

    #[tokio::test]
    async fn test_send_then_view_today() {
        let (app, _) = create_test_app();

        let json = send_coords(&app, "u1", json!([{"x_cord": 1, "y_cord": 2}])).await;
        assert_eq!(
            json,
            json!({"status": "success", "inserted": 1, "track_active": false})
        );

        let (status, json) = get_json(&app, "/viewtoday?firebaseid=u1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            json!([{"x_cord": 1, "y_cord": 2, "logged_time": "2024-01-15T10:00:00Z"}])
        );

        let (_, json) = get_json(&app, "/viewtoday?firebaseid=u2").await;
        assert_eq!(json, json!([]));
    }

    #[tokio::test]
    async fn test_send_keeps_number_kinds() {
        let (app, _) = create_test_app();
        send_coords(&app, "u1", json!([{"x_cord": 1.5, "y_cord": 2}])).await;

        let (_, json) = get_json(&app, "/viewtoday?firebaseid=u1").await;
        assert_eq!(json[0]["x_cord"], 1.5);
        assert!(json[0]["y_cord"].is_u64());
    }

    #[tokio::test]
    async fn test_send_drops_incomplete_entries() {
        let (app, _) = create_test_app();

        let json = send_coords(
            &app,
            "u1",
            json!([{"x_cord": 1, "y_cord": 1}, {"y_cord": 2}, {"x_cord": 3, "y_cord": 3}]),
        )
        .await;
        assert_eq!(json["inserted"], 2);

        let (_, json) = get_json(&app, "/viewtoday?firebaseid=u1").await;
        let xs: Vec<i64> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["x_cord"].as_i64().unwrap())
            .collect();
        assert_eq!(xs, [1, 3]);
    }

    #[tokio::test]
    async fn test_send_rejects_missing_client() {
        let (app, _) = create_test_app();

        for body in [
            json!({"coords": [{"x_cord": 1, "y_cord": 2}]}),
            json!({"firebaseid": "", "coords": [{"x_cord": 1, "y_cord": 2}]}),
        ] {
            let (status, json) = post_json(&app, "/send", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json, json!({"status": "error", "message": "Missing firebaseid"}));
        }

        let (_, json) = get_json(&app, "/sync_all").await;
        assert_eq!(json["synced_data"], json!([]));
    }

    #[tokio::test]
    async fn test_send_rejects_malformed_payload() {
        let (app, _) = create_test_app();

        for body in [
            json!({"firebaseid": "u1"}),
            json!({"firebaseid": "u1", "coords": "nope"}),
            json!([1, 2, 3]),
        ] {
            let (status, json) = post_json(&app, "/send", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["status"], "error");
            assert!(json["message"].as_str().unwrap().starts_with("Invalid payload"));
        }

        let (status, _) = call(
            &app,
            Request::builder()
                .method("POST")
                .uri("/send")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sync_across_two_days() {
        let (app, clock) = create_test_app();

        send_coords(&app, "u1", json!([{"x_cord": 1, "y_cord": 1}])).await;
        let (_, today) = get_json(&app, "/viewtoday?firebaseid=u1").await;
        let watermark = today[0]["logged_time"].as_str().unwrap().to_string();

        clock.advance(Duration::DAY);
        send_coords(&app, "u1", json!([{"x_cord": 2, "y_cord": 2}])).await;
        send_coords(&app, "u2", json!([{"x_cord": 99, "y_cord": 99}])).await;

        let (status, json) = post_json(
            &app,
            "/sync",
            json!({"firebaseid": "u1", "last_synced_timestamp": watermark}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "success");

        let synced = json["synced_data"].as_array().unwrap();
        assert_eq!(synced.len(), 2);
        assert_eq!(synced[0]["x_cord"], 1);
        assert_eq!(synced[0]["logged_time"], "2024-01-15T10:00:00Z");
        assert_eq!(synced[1]["x_cord"], 2);
        assert_eq!(synced[1]["logged_time"], "2024-01-16T10:00:00Z");
        assert!(synced[0].get("firebaseid").is_none());
    }

    #[tokio::test]
    async fn test_sync_accepts_naive_and_offset_timestamps() {
        let (app, _) = create_test_app();
        send_coords(&app, "u1", json!([{"x_cord": 1, "y_cord": 1}])).await;

        for watermark in [
            "2024-01-15T09:00:00",
            "2024-01-15T11:00:00+02:00",
            "2024-01-15T09:59:59.5Z",
        ] {
            let (status, json) = post_json(
                &app,
                "/sync",
                json!({"firebaseid": "u1", "last_synced_timestamp": watermark}),
            )
            .await;
            assert_eq!(status, StatusCode::OK, "watermark {}", watermark);
            assert_eq!(json["synced_data"].as_array().unwrap().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_sync_with_future_watermark_is_empty() {
        let (app, _) = create_test_app();
        send_coords(&app, "u1", json!([{"x_cord": 1, "y_cord": 1}])).await;

        let (status, json) = post_json(
            &app,
            "/sync",
            json!({"firebaseid": "u1", "last_synced_timestamp": "2099-01-01T00:00:00Z"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"status": "success", "synced_data": []}));
    }

    #[tokio::test]
    async fn test_sync_without_client_returns_all_with_ids() {
        let (app, _) = create_test_app();
        send_coords(&app, "u1", json!([{"x_cord": 1, "y_cord": 1}])).await;
        send_coords(&app, "u2", json!([{"x_cord": 2, "y_cord": 2}])).await;

        let (_, json) = post_json(
            &app,
            "/sync",
            json!({"last_synced_timestamp": "2024-01-15T00:00:00Z"}),
        )
        .await;
        let synced = json["synced_data"].as_array().unwrap();
        assert_eq!(synced.len(), 2);
        assert_eq!(synced[0]["firebaseid"], "u1");
        assert_eq!(synced[1]["firebaseid"], "u2");
    }

    #[tokio::test]
    async fn test_sync_timestamp_errors() {
        let (app, _) = create_test_app();

        let (status, json) = post_json(&app, "/sync", json!({"firebaseid": "u1"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Missing 'last_synced_timestamp'");

        for bad in [json!("yesterday"), json!(1705314600), json!("2024-13-45T00:00:00Z")] {
            let (status, json) = post_json(
                &app,
                "/sync",
                json!({"firebaseid": "u1", "last_synced_timestamp": bad}),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(
                json,
                json!({"status": "error", "message": "Invalid timestamp format"})
            );
        }
    }

    #[tokio::test]
    async fn test_view_today_rolls_over_at_midnight() {
        let (app, clock) = create_test_app();
        send_coords(&app, "u1", json!([{"x_cord": 1, "y_cord": 1}])).await;

        clock.set(datetime!(2024-01-16 00:00 UTC));
        let (_, json) = get_json(&app, "/viewtoday?firebaseid=u1").await;
        assert_eq!(json, json!([]));
    }

    #[tokio::test]
    async fn test_view_today_requires_client() {
        let (app, _) = create_test_app();

        for uri in ["/viewtoday", "/viewtoday?firebaseid="] {
            let (status, json) = get_json(&app, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["message"], "Missing firebaseid");
        }
    }

    #[tokio::test]
    async fn test_sync_all() {
        let (app, clock) = create_test_app();
        send_coords(&app, "u1", json!([{"x_cord": 1, "y_cord": 1}])).await;
        clock.advance(Duration::days(3));
        send_coords(&app, "u2", json!([{"x_cord": 2, "y_cord": 2}])).await;
        send_coords(&app, "u1", json!([{"x_cord": 3, "y_cord": 3}])).await;

        let (status, json) = get_json(&app, "/sync_all?firebaseid=u1").await;
        assert_eq!(status, StatusCode::OK);
        let synced = json["synced_data"].as_array().unwrap();
        let xs: Vec<i64> = synced.iter().map(|s| s["x_cord"].as_i64().unwrap()).collect();
        assert_eq!(xs, [1, 3]);
        assert!(synced.iter().all(|s| s.get("firebaseid").is_none()));

        let (_, json) = get_json(&app, "/sync_all").await;
        let synced = json["synced_data"].as_array().unwrap();
        assert_eq!(synced.len(), 3);
        assert_eq!(synced[1]["firebaseid"], "u2");
    }

    #[tokio::test]
    async fn test_history_dates() {
        let (app, clock) = create_test_app();

        // Later day written first
        clock.set(DAY_D + Duration::days(2));
        send_coords(&app, "u1", json!([{"x_cord": 1, "y_cord": 1}])).await;
        clock.set(DAY_D + Duration::DAY);
        send_coords(&app, "u2", json!([{"x_cord": 2, "y_cord": 2}])).await;
        clock.set(DAY_D);
        send_coords(&app, "u1", json!([{"x_cord": 3, "y_cord": 3}])).await;

        let (status, json) = get_json(&app, "/history?firebaseid=u1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"available_dates": ["2024_01_15", "2024_01_17"]}));

        let (_, json) = get_json(&app, "/history?firebaseid=u3").await;
        assert_eq!(json, json!({"available_dates": []}));

        let (status, _) = get_json(&app, "/history").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_track_toggle() {
        let (app, _) = create_test_app();

        let (status, json) = post_json(&app, "/track", json!({"active": true})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"status": "success", "track_active": true}));

        let json = send_coords(&app, "u1", json!([{"x_cord": 1, "y_cord": 1}])).await;
        assert_eq!(json["track_active"], true);

        let (_, json) = post_json(&app, "/track", json!({"active": false})).await;
        assert_eq!(json["track_active"], false);

        let (status, _) = post_json(&app, "/track", json!({"active": "yes"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_store_error_response() {
        let error = AppError::from(trailsync_store::Error::InvalidTimestamp("bad".to_string()));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "Invalid timestamp: bad");
    }
}
