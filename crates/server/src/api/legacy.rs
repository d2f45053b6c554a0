//! Legacy barcode migration handler.

use axum::{extract::State, Json};
use raffle_core::MigrationReport;
use std::sync::Arc;

use super::error::ApiError;
use crate::state::AppState;

/// Convert all tickets still carrying an 8-digit legacy barcode
pub async fn migrate(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MigrationReport>, ApiError> {
    let orch = state
        .orchestrator()
        .cloned()
        .ok_or_else(ApiError::printing_unavailable)?;

    let report = tokio::task::spawn_blocking(move || orch.migrate_legacy())
        .await
        .map_err(|e| ApiError::internal(e.to_string()))??;
    Ok(Json(report))
}
