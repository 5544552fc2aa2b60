use crate::alerts;
use crate::state::{AppState, SimSession};
use axum::{
    extract::{Query, State},
    http::{Method, StatusCode},
    response::{
        sse::{Event, Sse},
        Json,
    },
    routing::{get, post},
    Router,
};
use bot_core::{ComponentId, RunError, RunPhase, SlotId, WorldConfig};
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[cfg(test)]
pub fn make_router(state: AppState) -> Router {
    make_router_with_cors(state, "http://localhost:5173")
}

pub fn make_router_with_cors(state: AppState, cors_origin: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors_origin.parse::<axum::http::HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/meta", get(meta_handler))
        .route("/api/v1/snapshot", get(snapshot_handler))
        .route("/api/v1/log", get(log_handler))
        .route("/api/v1/overlay", get(overlay_handler))
        .route("/api/v1/alerts", get(alerts_handler))
        .route("/api/v1/stream", get(stream_handler))
        .route("/api/v1/run", post(run_handler))
        .route("/api/v1/stop", post(stop_handler))
        .route("/api/v1/reset", post(reset_handler))
        .route("/api/v1/grid/toggle", post(toggle_handler))
        .route("/api/v1/grid/clear", post(clear_grid_handler))
        .route("/api/v1/config", post(config_handler))
        .route("/api/v1/chassis/place", post(place_handler))
        .route("/api/v1/chassis/remove", post(remove_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Read endpoints
// ---------------------------------------------------------------------------

async fn meta_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let sim = app_state.sim.lock();
    Json(serde_json::json!({
        "step": sim.session.meta.step,
        "seed": sim.session.meta.seed,
        "phase": sim.session.phase,
        "run_id": sim.session.run_id,
        "content_version": sim.session.meta.content_version,
    }))
}

async fn snapshot_handler(
    State(app_state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    let sim = app_state.sim.lock();
    match serde_json::to_value(&sim.session) {
        Ok(json) => (StatusCode::OK, Json(json)),
        Err(err) => {
            tracing::error!("snapshot serialization failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "serialization failed"})),
            )
        }
    }
}

#[derive(Deserialize)]
struct LogQuery {
    limit: Option<usize>,
}

async fn log_handler(
    State(app_state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> Json<serde_json::Value> {
    let sim = app_state.sim.lock();
    let limit = query.limit.unwrap_or(sim.content.constants.log_view_entries);
    let entries = bot_session::stamp_entries(sim.session.log.recent(limit));
    Json(serde_json::json!({
        "total": sim.session.log.len(),
        "entries": entries,
    }))
}

async fn overlay_handler(
    State(app_state): State<AppState>,
) -> Json<Option<bot_session::SlotOverlay>> {
    let sim = app_state.sim.lock();
    Json(sim.current_overlay().cloned())
}

async fn alerts_handler(State(app_state): State<AppState>) -> Json<Vec<alerts::Alert>> {
    let sim = app_state.sim.lock();
    Json(alerts::evaluate(&sim.session.robot, &sim.content.constants))
}

async fn stream_handler(
    State(app_state): State<AppState>,
) -> Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>> {
    let mut rx = app_state.event_tx.subscribe();
    let sim = app_state.sim.clone();

    let stream = async_stream::stream! {
        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok(outcome) => {
                            let data = serde_json::to_string(&outcome).unwrap_or_default();
                            yield Ok(Event::default().data(data));
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => {}
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = tokio::time::sleep(Duration::from_secs(5)) => {
                    let step = sim.lock().session.meta.step;
                    let heartbeat = serde_json::json!({"heartbeat": true, "step": step});
                    yield Ok(Event::default().data(heartbeat.to_string()));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}

// ---------------------------------------------------------------------------
// Run control
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RunRequest {
    #[serde(default)]
    source: Option<String>,
}

async fn run_handler(
    State(app_state): State<AppState>,
    body: Option<Json<RunRequest>>,
) -> (StatusCode, Json<serde_json::Value>) {
    let mut sim = app_state.sim.lock();
    let SimSession {
        ref mut session,
        ref mut rng,
        ..
    } = *sim;
    if let Some(Json(request)) = body {
        if let Some(source) = request.source {
            bot_core::set_program(session, source);
        }
    }
    match bot_core::start_run(session, rng) {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({"run_id": session.run_id})),
        ),
        Err(err @ RunError::AlreadyRunning) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({"error": err.to_string()})),
        ),
        Err(err) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({"error": err.to_string()})),
        ),
    }
}

async fn stop_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let mut sim = app_state.sim.lock();
    let was_running = sim.session.phase == RunPhase::Running;
    bot_core::cancel_run(&mut sim.session);
    Json(serde_json::json!({"stopped": was_running}))
}

async fn reset_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let mut sim = app_state.sim.lock();
    let SimSession {
        ref mut session,
        ref content,
        ..
    } = *sim;
    bot_core::reset(session, content);
    Json(serde_json::json!({"phase": session.phase}))
}

// ---------------------------------------------------------------------------
// World and chassis editing
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ToggleRequest {
    x: i32,
    y: i32,
}

async fn toggle_handler(
    State(app_state): State<AppState>,
    Json(request): Json<ToggleRequest>,
) -> Json<serde_json::Value> {
    let mut sim = app_state.sim.lock();
    let toggled = bot_core::toggle_cell(&mut sim.session, request.x, request.y);
    Json(serde_json::json!({"toggled": toggled}))
}

async fn clear_grid_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let mut sim = app_state.sim.lock();
    bot_core::clear_grid(&mut sim.session);
    Json(serde_json::json!({"cleared": true}))
}

async fn config_handler(
    State(app_state): State<AppState>,
    Json(new_config): Json<WorldConfig>,
) -> (StatusCode, Json<serde_json::Value>) {
    let mut sim = app_state.sim.lock();
    let SimSession {
        ref mut session,
        ref content,
        ..
    } = *sim;
    match bot_core::apply_config(session, content, &new_config) {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({"config": session.config})),
        ),
        Err(err) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({"error": err.to_string()})),
        ),
    }
}

#[derive(Deserialize)]
struct PlaceRequest {
    slot: SlotId,
    component: String,
}

async fn place_handler(
    State(app_state): State<AppState>,
    Json(request): Json<PlaceRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let mut sim = app_state.sim.lock();
    let SimSession {
        ref mut session,
        ref content,
        ..
    } = *sim;
    match bot_core::place_component(
        session,
        content,
        request.slot,
        &ComponentId(request.component),
    ) {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({"installed": true})),
        ),
        Err(err) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({"error": err.to_string()})),
        ),
    }
}

#[derive(Deserialize)]
struct RemoveRequest {
    slot: SlotId,
}

async fn remove_handler(
    State(app_state): State<AppState>,
    Json(request): Json<RemoveRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let mut sim = app_state.sim.lock();
    match bot_core::remove_component(&mut sim.session, request.slot) {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"removed": true}))),
        Err(err) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({"error": err.to_string()})),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use bot_core::test_fixtures::base_content;
    use http_body_util::BodyExt;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn make_test_state() -> AppState {
        let content = base_content();
        let session = bot_world::build_initial_session(&content, 0);
        let (event_tx, _) = tokio::sync::broadcast::channel(64);
        AppState {
            sim: Arc::new(parking_lot::Mutex::new(SimSession {
                session,
                content,
                rng: ChaCha8Rng::seed_from_u64(0),
                overlay: None,
            })),
            event_tx,
        }
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_meta_contains_step_and_phase() {
        let app = make_router(make_test_state());
        let response = app.oneshot(get_request("/api/v1/meta")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["step"], 0);
        assert_eq!(json["phase"], "idle");
    }

    #[tokio::test]
    async fn test_snapshot_is_valid_session_json() {
        let app = make_router(make_test_state());
        let response = app.oneshot(get_request("/api/v1/snapshot")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["robot"]["battery"], 100.0);
        assert_eq!(json["config"]["width"], 10);
    }

    #[tokio::test]
    async fn test_run_then_run_is_a_conflict() {
        let state = make_test_state();
        let response = make_router(state.clone())
            .oneshot(post_json("/api/v1/run", "{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = make_router(state)
            .oneshot(post_json("/api/v1/run", "{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_run_with_malformed_program_is_unprocessable() {
        let app = make_router(make_test_state());
        let response = app
            .oneshot(post_json(
                "/api/v1/run",
                r#"{"source": "FORWARD FORWARD"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_place_disallowed_component_is_unprocessable() {
        let app = make_router(make_test_state());
        // The front slot rejects motors.
        let response = app
            .oneshot(post_json(
                "/api/v1/chassis/place",
                r#"{"slot": "front", "component": "drive_motor"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_place_motor_in_side_slot_succeeds() {
        let state = make_test_state();
        let response = make_router(state.clone())
            .oneshot(post_json(
                "/api/v1/chassis/place",
                r#"{"slot": "left", "component": "drive_motor"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(state
            .sim
            .lock()
            .session
            .chassis
            .has_component_of_type(bot_core::ComponentType::Motor));
    }

    #[tokio::test]
    async fn test_remove_locked_slot_is_unprocessable() {
        let app = make_router(make_test_state());
        let response = app
            .oneshot(post_json("/api/v1/chassis/remove", r#"{"slot": "center"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_toggle_reports_out_of_bounds() {
        let state = make_test_state();
        let response = make_router(state.clone())
            .oneshot(post_json("/api/v1/grid/toggle", r#"{"x": 3, "y": 3}"#))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["toggled"], true);

        let response = make_router(state)
            .oneshot(post_json("/api/v1/grid/toggle", r#"{"x": 50, "y": 50}"#))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["toggled"], false);
    }

    #[tokio::test]
    async fn test_stop_when_idle_reports_not_running() {
        let app = make_router(make_test_state());
        let response = app.oneshot(post_json("/api/v1/stop", "{}")).await.unwrap();
        assert_eq!(body_json(response).await["stopped"], false);
    }

    #[tokio::test]
    async fn test_config_rejected_while_running() {
        let state = make_test_state();
        let response = make_router(state.clone())
            .oneshot(post_json("/api/v1/run", "{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = make_router(state)
            .oneshot(post_json(
                "/api/v1/config",
                r#"{"width": 5, "height": 5, "start_x": 0, "start_y": 0, "start_direction": 0}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_alerts_empty_on_fresh_session() {
        let app = make_router(make_test_state());
        let response = app.oneshot(get_request("/api/v1/alerts")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!([]));
    }
}
