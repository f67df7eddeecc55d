use crate::state::AppState;
use crate::{api, logging};
use axum::middleware;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "rockwatch API",
        description = "Rockfall risk alert dispatch and monitoring",
    ),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Alerts", description = "Alert registry, lifecycle and manual dispatch"),
        (name = "Monitor", description = "Background risk monitor")
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_key",
            utoipa::openapi::security::SecurityScheme::ApiKey(
                utoipa::openapi::security::ApiKey::Header(
                    utoipa::openapi::security::ApiKeyValue::new("X-Api-Key"),
                ),
            ),
        );
    }
}

pub fn build_http_app(state: AppState) -> Router {
    let (public_router, public_doc) = api::public_routes().split_for_parts();
    let (protected_router, protected_doc) = api::protected_routes().split_for_parts();

    let mut openapi = ApiDoc::openapi();
    openapi.merge(public_doc);
    openapi.merge(protected_doc);
    let openapi = Arc::new(openapi);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public_router
        .merge(protected_router.layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::api_key_middleware,
        )))
        .with_state(state)
        .route(
            "/v1/openapi.json",
            get(move || {
                let openapi = Arc::clone(&openapi);
                async move { Json(openapi.as_ref().clone()) }
            }),
        )
        .layer(cors)
        .layer(middleware::from_fn(logging::request_logging))
}
