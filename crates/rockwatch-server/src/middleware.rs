use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderName, Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

use crate::api::error_response;
use crate::logging::TraceId;
use crate::state::AppState;

static API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

/// Grants every facility when listed in a key's scope.
pub const ALL_FACILITIES: &str = "*";

/// Caller identity attached to authenticated requests.
#[derive(Debug, Clone)]
pub struct ApiPrincipal {
    pub name: String,
    facilities: Vec<String>,
}

impl ApiPrincipal {
    pub fn new(name: &str, facilities: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            facilities,
        }
    }

    pub fn unrestricted() -> Self {
        Self::new("anonymous", vec![ALL_FACILITIES.to_string()])
    }

    /// Holds the wildcard scope. Required for actions that affect every facility.
    pub fn is_unrestricted(&self) -> bool {
        self.facilities.iter().any(|f| f == ALL_FACILITIES)
    }

    pub fn can_access(&self, facility_id: &str) -> bool {
        self.facilities
            .iter()
            .any(|f| f == ALL_FACILITIES || f == facility_id)
    }
}

/// Key from `X-Api-Key`, or from `Authorization: Bearer <key>`.
fn extract_key(req: &Request<Body>) -> Option<&str> {
    if let Some(key) = req.headers().get(&API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(key.trim());
    }
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Rejects requests without a configured API key (401) and attaches an
/// [`ApiPrincipal`] for handlers that enforce facility scope.
pub async fn api_key_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.api.require_key {
        req.extensions_mut().insert(ApiPrincipal::unrestricted());
        return next.run(req).await;
    }

    let trace_id = req
        .extensions()
        .get::<TraceId>()
        .map(|t| t.0.clone())
        .unwrap_or_default();

    let principal = match extract_key(&req) {
        None | Some("") => {
            tracing::warn!(trace_id = %trace_id, "Request rejected: missing API key");
            return error_response(
                StatusCode::UNAUTHORIZED,
                &trace_id,
                "unauthorized",
                "missing API key",
            );
        }
        Some(key) => match state.config.api.keys.iter().find(|k| k.key == key) {
            Some(entry) => ApiPrincipal::new(&entry.name, entry.facilities.clone()),
            None => {
                tracing::warn!(trace_id = %trace_id, "Request rejected: invalid API key");
                return error_response(
                    StatusCode::UNAUTHORIZED,
                    &trace_id,
                    "unauthorized",
                    "invalid API key",
                );
            }
        },
    };

    tracing::debug!(trace_id = %trace_id, client = %principal.name, "API key validated");
    req.extensions_mut().insert(principal);
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_matching() {
        let scoped = ApiPrincipal::new("ops", vec!["mine_001".into()]);
        assert!(scoped.can_access("mine_001"));
        assert!(!scoped.can_access("mine_002"));
        assert!(ApiPrincipal::unrestricted().can_access("anything"));
        assert!(!ApiPrincipal::new("none", vec![]).can_access("mine_001"));
        assert!(!scoped.is_unrestricted());
        assert!(ApiPrincipal::unrestricted().is_unrestricted());
    }

    #[test]
    fn test_extract_key_prefers_header_then_bearer() {
        let req = Request::builder()
            .header("x-api-key", " k1 ")
            .header("Authorization", "Bearer k2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_key(&req), Some("k1"));

        let req = Request::builder()
            .header("Authorization", "Bearer k2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_key(&req), Some("k2"));

        let req = Request::builder()
            .header("Authorization", "Basic abc")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_key(&req), None);
    }
}
