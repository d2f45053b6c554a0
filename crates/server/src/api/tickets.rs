//! Ticket pool API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use raffle_core::{Category, Ticket};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::error::ApiError;
use crate::state::AppState;

/// Request body for pool initialization
#[derive(Debug, Deserialize)]
pub struct CreatePoolBody {
    pub category: Category,
    /// First sequence number, inclusive
    pub first: u32,
    /// Last sequence number, inclusive
    pub last: u32,
}

#[derive(Debug, Serialize)]
pub struct CreatePoolResponse {
    pub category: Category,
    pub first: u32,
    pub last: u32,
    /// Tickets inserted. Existing identifiers are skipped.
    pub created: usize,
}

/// Initialize a range of AVAILABLE tickets
pub async fn create_pool(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreatePoolBody>,
) -> Result<(StatusCode, Json<CreatePoolResponse>), ApiError> {
    if body.first == 0 || body.first > body.last {
        return Err(ApiError::bad_request(format!(
            "invalid range {}..={}",
            body.first, body.last
        )));
    }
    match state.codec().max_sequence(body.category) {
        Some(max) if body.last <= max => {}
        Some(max) => {
            return Err(ApiError::bad_request(format!(
                "sequence {} exceeds category {} maximum {}",
                body.last, body.category, max
            )))
        }
        None => {
            return Err(ApiError::bad_request(format!(
                "category {} is not configured",
                body.category
            )))
        }
    }

    let created = state
        .ticket_store()
        .create_pool(body.category, body.first, body.last)?;
    info!(
        category = %body.category,
        first = body.first,
        last = body.last,
        created,
        "Ticket pool initialized"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreatePoolResponse {
            category: body.category,
            first: body.first,
            last: body.last,
            created,
        }),
    ))
}

/// Get a ticket by canonical barcode
pub async fn get_by_barcode(
    State(state): State<Arc<AppState>>,
    Path(barcode): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    let identifier = state
        .codec()
        .decode(&barcode)
        .ok_or_else(|| ApiError::bad_request(format!("invalid barcode: {}", barcode)))?;

    state
        .ticket_store()
        .find_by_identifier(&identifier)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Ticket not found: {}", barcode)))
}
