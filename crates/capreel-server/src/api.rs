use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use capreel_store::Error as StoreError;
use capreel_types::{AppendEventsRequest, StartSessionRequest, StartSessionResponse};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/sessions/start", post(api_start_session))
        .route("/api/sessions/{session_id}/events", post(api_append_events))
        .route("/api/sessions/{session_id}/end", post(api_end_session))
        .route("/api/sessions/{session_id}", get(api_get_session))
        .route("/api/users/{user_id}/sessions", get(api_list_user_sessions))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn store_error_response(err: StoreError) -> Response {
    match err {
        StoreError::SessionNotFound(id) => {
            json_error(StatusCode::NOT_FOUND, format!("Session not found: {}", id))
        }
        other => {
            error!(error = %other, "store operation failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

async fn api_start_session(
    State(state): State<AppState>,
    Json(body): Json<StartSessionRequest>,
) -> Response {
    let session_id = Uuid::new_v4().to_string();
    let result = {
        let session_id = session_id.clone();
        state
            .with_store(move |store| {
                store.create_session(&session_id, &body.user_id, &body.metadata, Utc::now())
            })
            .await
    };

    match result {
        Ok(Ok(())) => {
            info!(%session_id, "session started");
            (
                StatusCode::CREATED,
                Json(StartSessionResponse { session_id }),
            )
                .into_response()
        }
        Ok(Err(e)) => store_error_response(e),
        Err(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn api_append_events(
    State(state): State<AppState>,
    AxumPath(session_id): AxumPath<String>,
    Json(body): Json<AppendEventsRequest>,
) -> Response {
    let result = state
        .with_store(move |store| {
            store.append_events(&session_id, body.batch_id.as_deref(), &body.events)
        })
        .await;

    match result {
        Ok(Ok(_outcome)) => Json(json!({ "success": true })).into_response(),
        Ok(Err(e)) => store_error_response(e),
        Err(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn api_end_session(
    State(state): State<AppState>,
    AxumPath(session_id): AxumPath<String>,
) -> Response {
    let result = {
        let session_id = session_id.clone();
        state.with_store(move |store| store.mark_ended(&session_id)).await
    };

    match result {
        Ok(Ok(())) => {
            info!(%session_id, "session ended");
            Json(json!({ "success": true })).into_response()
        }
        Ok(Err(e)) => store_error_response(e),
        Err(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn api_get_session(
    State(state): State<AppState>,
    AxumPath(session_id): AxumPath<String>,
) -> Response {
    let result = {
        let session_id = session_id.clone();
        state
            .with_store(move |store| store.get_session(&session_id))
            .await
    };

    match result {
        Ok(Ok(Some(session))) => Json(session).into_response(),
        Ok(Ok(None)) => json_error(
            StatusCode::NOT_FOUND,
            format!("Session not found: {}", session_id),
        ),
        Ok(Err(e)) => store_error_response(e),
        Err(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn api_list_user_sessions(
    State(state): State<AppState>,
    AxumPath(user_id): AxumPath<String>,
) -> Response {
    let result = state
        .with_store(move |store| store.list_by_user(&user_id))
        .await;

    match result {
        Ok(Ok(summaries)) => Json(summaries).into_response(),
        Ok(Err(e)) => store_error_response(e),
        Err(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}
