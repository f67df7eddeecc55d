use crate::api::{error_response, success_response};
use crate::logging::TraceId;
use crate::middleware::ApiPrincipal;
use crate::state::AppState;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rockwatch_alert::registry::AlertStats;
use rockwatch_common::types::{Alert, RiskAssessment, SensorSnapshot};
use rockwatch_notify::dispatcher::DispatchResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Alerts retained in the registry (any status) for facilities the caller
/// may see. Expired records are purged first.
#[utoipa::path(
    get,
    path = "/v1/alerts/active",
    tag = "Alerts",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Retained alerts", body = Vec<Alert>),
        (status = 401, description = "Missing or invalid API key", body = crate::api::ApiError)
    )
)]
async fn active_alerts(
    Extension(trace_id): Extension<TraceId>,
    Extension(principal): Extension<ApiPrincipal>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let alerts: Vec<Alert> = state
        .registry
        .list_active()
        .into_iter()
        .filter(|a| principal.can_access(&a.facility_id))
        .collect();
    success_response(StatusCode::OK, &trace_id, alerts)
}

#[utoipa::path(
    get,
    path = "/v1/alerts/stats",
    tag = "Alerts",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Counts by severity and status over the caller's facilities", body = AlertStats),
        (status = 401, description = "Missing or invalid API key", body = crate::api::ApiError)
    )
)]
async fn alert_stats(
    Extension(trace_id): Extension<TraceId>,
    Extension(principal): Extension<ApiPrincipal>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let stats = if principal.is_unrestricted() {
        state.registry.stats()
    } else {
        let alerts = state.registry.list_active();
        AlertStats::from_alerts(alerts.iter().filter(|a| principal.can_access(&a.facility_id)))
    };
    success_response(StatusCode::OK, &trace_id, stats)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendAlertRequest {
    pub facility_id: String,
    /// Re-notify for this existing alert, reusing its severity and score.
    #[serde(default)]
    pub alert_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SendAlertResponse {
    #[serde(flatten)]
    pub result: DispatchResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_alert_id: Option<String>,
}

/// Sends an alert now, bypassing the monitor's cooldown and dedup.
///
/// Returns 200 whenever dispatch ran, including when every channel
/// failed; `data.success` carries the outcome.
#[utoipa::path(
    post,
    path = "/v1/alerts/send",
    tag = "Alerts",
    security(("api_key" = [])),
    request_body = SendAlertRequest,
    responses(
        (status = 200, description = "Dispatch result", body = SendAlertResponse),
        (status = 400, description = "Invalid request", body = crate::api::ApiError),
        (status = 401, description = "Missing or invalid API key", body = crate::api::ApiError),
        (status = 403, description = "Facility outside the key's scope", body = crate::api::ApiError),
        (status = 404, description = "Unknown facility or alert", body = crate::api::ApiError),
        (status = 502, description = "Risk predictor unavailable", body = crate::api::ApiError)
    )
)]
async fn send_alert(
    Extension(trace_id): Extension<TraceId>,
    Extension(principal): Extension<ApiPrincipal>,
    State(state): State<AppState>,
    Json(req): Json<SendAlertRequest>,
) -> Response {
    let facility_id = req.facility_id.trim();
    if facility_id.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", "facility_id is required");
    }
    if !principal.can_access(facility_id) {
        tracing::warn!(trace_id = %trace_id, client = %principal.name, facility_id, "Manual send denied");
        return error_response(StatusCode::FORBIDDEN, &trace_id, "forbidden", "access denied for facility");
    }
    let Some(facility) = state.facilities.get(facility_id) else {
        return error_response(StatusCode::NOT_FOUND, &trace_id, "not_found", "facility not found");
    };

    let (severity, assessment) = match &req.alert_id {
        Some(alert_id) => {
            let Some(source) = state.registry.get(alert_id) else {
                return error_response(StatusCode::NOT_FOUND, &trace_id, "not_found", "alert not found");
            };
            if source.facility_id != facility.id {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    &trace_id,
                    "bad_request",
                    "alert does not belong to facility",
                );
            }
            let assessment = RiskAssessment {
                risk_score: source.risk_score,
                risk_level: source.severity,
                confidence: 0.0,
                key_factors: source.key_factors.clone(),
                sensor_snapshot: SensorSnapshot::new(),
            };
            (source.severity, assessment)
        }
        None => match state.predictor.assess(&facility).await {
            Ok(assessment) => (state.thresholds.classify(assessment.risk_score), assessment),
            Err(e) => {
                tracing::error!(trace_id = %trace_id, facility_id, error = %e, "Risk assessment failed");
                return error_response(
                    StatusCode::BAD_GATEWAY,
                    &trace_id,
                    "predictor_error",
                    "risk predictor unavailable",
                );
            }
        },
    };

    tracing::info!(
        trace_id = %trace_id,
        client = %principal.name,
        facility_id,
        severity = %severity,
        source_alert_id = ?req.alert_id,
        "Manual alert send"
    );
    let result = state.dispatcher.send_alert(&facility, severity, &assessment).await;

    success_response(
        StatusCode::OK,
        &trace_id,
        SendAlertResponse {
            result,
            source_alert_id: req.alert_id,
        },
    )
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AcknowledgeRequest {
    pub acknowledged_by: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolveRequest {
    pub resolved_by: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Looks up an alert and checks the caller's facility scope.
fn scoped_alert(state: &AppState, principal: &ApiPrincipal, trace_id: &str, id: &str) -> Result<Alert, Response> {
    let Some(alert) = state.registry.get(id) else {
        return Err(error_response(StatusCode::NOT_FOUND, trace_id, "not_found", "alert not found"));
    };
    if !principal.can_access(&alert.facility_id) {
        return Err(error_response(StatusCode::FORBIDDEN, trace_id, "forbidden", "access denied for facility"));
    }
    Ok(alert)
}

#[utoipa::path(
    post,
    path = "/v1/alerts/{id}/acknowledge",
    tag = "Alerts",
    security(("api_key" = [])),
    params(("id" = String, Path, description = "Alert ID")),
    request_body = AcknowledgeRequest,
    responses(
        (status = 200, description = "Acknowledged alert", body = Alert),
        (status = 400, description = "Invalid request", body = crate::api::ApiError),
        (status = 403, description = "Facility outside the key's scope", body = crate::api::ApiError),
        (status = 404, description = "Alert not found", body = crate::api::ApiError),
        (status = 409, description = "Alert already resolved", body = crate::api::ApiError)
    )
)]
async fn acknowledge_alert(
    Extension(trace_id): Extension<TraceId>,
    Extension(principal): Extension<ApiPrincipal>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AcknowledgeRequest>,
) -> Response {
    if req.acknowledged_by.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", "acknowledged_by is required");
    }
    if let Err(resp) = scoped_alert(&state, &principal, &trace_id, &id) {
        return resp;
    }
    if !state.registry.acknowledge(&id, req.acknowledged_by.trim()) {
        return error_response(StatusCode::CONFLICT, &trace_id, "conflict", "alert already resolved");
    }
    tracing::info!(alert_id = %id, by = %req.acknowledged_by, "Alert acknowledged");
    match state.registry.get(&id) {
        Some(alert) => success_response(StatusCode::OK, &trace_id, alert),
        None => error_response(StatusCode::NOT_FOUND, &trace_id, "not_found", "alert not found"),
    }
}

#[utoipa::path(
    post,
    path = "/v1/alerts/{id}/resolve",
    tag = "Alerts",
    security(("api_key" = [])),
    params(("id" = String, Path, description = "Alert ID")),
    request_body = ResolveRequest,
    responses(
        (status = 200, description = "Resolved alert", body = Alert),
        (status = 400, description = "Invalid request", body = crate::api::ApiError),
        (status = 403, description = "Facility outside the key's scope", body = crate::api::ApiError),
        (status = 404, description = "Alert not found", body = crate::api::ApiError)
    )
)]
async fn resolve_alert(
    Extension(trace_id): Extension<TraceId>,
    Extension(principal): Extension<ApiPrincipal>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ResolveRequest>,
) -> Response {
    if req.resolved_by.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", "resolved_by is required");
    }
    if let Err(resp) = scoped_alert(&state, &principal, &trace_id, &id) {
        return resp;
    }
    let notes = req.notes.as_deref().unwrap_or("");
    if !state.registry.resolve(&id, req.resolved_by.trim(), notes) {
        return error_response(StatusCode::NOT_FOUND, &trace_id, "not_found", "alert not found");
    }
    tracing::info!(alert_id = %id, by = %req.resolved_by, "Alert resolved");
    match state.registry.get(&id) {
        Some(alert) => success_response(StatusCode::OK, &trace_id, alert),
        None => error_response(StatusCode::NOT_FOUND, &trace_id, "not_found", "alert not found"),
    }
}

pub fn alert_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(active_alerts))
        .routes(routes!(alert_stats))
        .routes(routes!(send_alert))
        .routes(routes!(acknowledge_alert))
        .routes(routes!(resolve_alert))
}
