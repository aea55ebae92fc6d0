//! Read-only lobby view of the table registry.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::error::{ApiError, ApiErrorBody};
use crate::models::table::{TableId, TableSummary};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tables", get(list_tables))
        .route("/tables/{table_id}", get(get_table))
}

fn parse_table_id(raw: &str) -> Result<TableId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request("Invalid table ID"))
}

// ---------------------------------------------------------------------------
// GET /api/v1/tables
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/tables",
    tag = "Tables",
    responses((status = 200, description = "Every table, ordered by id", body = Vec<TableSummary>)),
)]
pub async fn list_tables(State(state): State<AppState>) -> Json<Vec<TableSummary>> {
    Json(state.tables.summaries())
}

// ---------------------------------------------------------------------------
// GET /api/v1/tables/:table_id
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/tables/{table_id}",
    tag = "Tables",
    params(("table_id" = u64, Path, description = "Table ID")),
    responses(
        (status = 200, description = "Table found", body = TableSummary),
        (status = 400, description = "Malformed table ID", body = ApiErrorBody),
        (status = 404, description = "Table not found", body = ApiErrorBody),
    ),
)]
pub async fn get_table(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
) -> Result<Json<TableSummary>, ApiError> {
    let table_id = parse_table_id(&table_id)?;
    let table = state
        .tables
        .get(table_id)
        .ok_or_else(|| ApiError::not_found(format!("Table {table_id} does not exist")))?;
    let summary = table.lock().summary();
    Ok(Json(summary))
}
