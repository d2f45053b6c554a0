//! Paper template API handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use raffle_core::PaperTemplate;
use serde::Serialize;
use std::sync::Arc;

use super::error::ApiError;
use crate::state::AppState;

/// Template with derived figures.
#[derive(Debug, Serialize)]
pub struct TemplateResponse {
    #[serde(flatten)]
    pub template: PaperTemplate,
    pub tickets_per_page: u32,
    pub pages_per_sheet: u32,
}

impl From<&PaperTemplate> for TemplateResponse {
    fn from(template: &PaperTemplate) -> Self {
        Self {
            template: template.clone(),
            tickets_per_page: template.tickets_per_page(),
            pages_per_sheet: template.pages_per_sheet(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListTemplatesResponse {
    pub templates: Vec<TemplateResponse>,
}

/// List all templates, built-in first.
pub async fn list_templates(State(state): State<Arc<AppState>>) -> Json<ListTemplatesResponse> {
    Json(ListTemplatesResponse {
        templates: state.templates().iter().map(TemplateResponse::from).collect(),
    })
}

/// Get a template by name
pub async fn get_template(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<TemplateResponse>, ApiError> {
    state
        .templates()
        .get(&name)
        .map(|t| Json(TemplateResponse::from(t)))
        .map_err(|e| ApiError::not_found(e.to_string()))
}
