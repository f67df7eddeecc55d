use crate::api::{error_response, success_response};
use crate::logging::TraceId;
use crate::middleware::ApiPrincipal;
use crate::monitor::MonitorStatus;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

#[utoipa::path(
    get,
    path = "/v1/monitor/status",
    tag = "Monitor",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Monitor status", body = MonitorStatus),
        (status = 401, description = "Missing or invalid API key", body = crate::api::ApiError)
    )
)]
async fn monitor_status(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    success_response(StatusCode::OK, &trace_id, state.monitor.status())
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MonitorControlRequest {
    /// `start` or `stop`.
    pub action: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MonitorControlResponse {
    /// False when the monitor was already in the requested state.
    pub changed: bool,
    pub status: MonitorStatus,
}

/// Starts or stops the polling loop. Both actions are idempotent. The
/// monitor covers every facility, so only wildcard keys may control it.
#[utoipa::path(
    post,
    path = "/v1/monitor/control",
    tag = "Monitor",
    security(("api_key" = [])),
    request_body = MonitorControlRequest,
    responses(
        (status = 200, description = "Monitor state after the action", body = MonitorControlResponse),
        (status = 400, description = "Unknown action", body = crate::api::ApiError),
        (status = 401, description = "Missing or invalid API key", body = crate::api::ApiError),
        (status = 403, description = "Key is scoped to specific facilities", body = crate::api::ApiError)
    )
)]
async fn monitor_control(
    Extension(trace_id): Extension<TraceId>,
    Extension(principal): Extension<ApiPrincipal>,
    State(state): State<AppState>,
    Json(req): Json<MonitorControlRequest>,
) -> Response {
    if !principal.is_unrestricted() {
        tracing::warn!(trace_id = %trace_id, client = %principal.name, "Monitor control denied");
        return error_response(
            StatusCode::FORBIDDEN,
            &trace_id,
            "forbidden",
            "monitor control requires an unrestricted API key",
        );
    }
    let changed = match req.action.trim().to_ascii_lowercase().as_str() {
        "start" => state.monitor.start(),
        "stop" => state.monitor.stop(),
        other => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &trace_id,
                "bad_request",
                &format!("unknown action '{other}', expected start or stop"),
            );
        }
    };
    tracing::info!(
        trace_id = %trace_id,
        client = %principal.name,
        action = %req.action,
        changed,
        "Monitor control"
    );
    success_response(
        StatusCode::OK,
        &trace_id,
        MonitorControlResponse {
            changed,
            status: state.monitor.status(),
        },
    )
}

pub fn monitor_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(monitor_status))
        .routes(routes!(monitor_control))
}
