use axum::routing::get;
use axum::Router;

use crate::extract::Json;
use crate::{middleware, App};

pub mod v1;

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "app": "Guzo Rideshare" }))
}

/// Builds the full application router with every middleware applied.
pub fn build_axum_router(app: App) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .nest("/api/v1", self::v1::build_axum_router(app.clone()))
        .layer(axum::middleware::from_fn_with_state(
            app,
            middleware::auth::catch_token,
        ));

    middleware::apply(router)
}
