//! Point-of-sale API handlers.
//!
//! Rejections are regular `200` responses carrying a `SaleDecision`; only
//! infrastructure failures map to error statuses.

use axum::{extract::State, Json};
use raffle_core::SaleDecision;
use serde::Deserialize;
use std::sync::Arc;

use super::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SaleBody {
    /// Scanned barcode, exactly as read
    pub barcode: String,
}

/// Check whether a barcode may be sold, without selling it
pub async fn validate_sale(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SaleBody>,
) -> Result<Json<SaleDecision>, ApiError> {
    Ok(Json(state.sale_guard().validate_for_sale(&body.barcode)?))
}

/// Sell the ticket for a barcode
pub async fn sell(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SaleBody>,
) -> Result<Json<SaleDecision>, ApiError> {
    Ok(Json(state.sale_guard().sell(&body.barcode)?))
}
