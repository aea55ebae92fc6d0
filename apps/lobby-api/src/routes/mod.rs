pub mod health;
pub mod tables;

use axum::Router;
use utoipa::OpenApi;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(crate::lobby::server::router())
        .nest("/api/v1", tables::router())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        tables::list_tables,
        tables::get_table,
    ),
    components(
        schemas(
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            crate::models::table::TableSummary,
            crate::models::table::Player,
            crate::models::table::Spectator,
            health::HealthResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Tables", description = "Lobby table list"),
    )
)]
pub struct ApiDoc;
