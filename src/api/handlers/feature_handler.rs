use axum::{Json, extract::State, http::Uri, response::IntoResponse};
use tracing::{debug, error};

use crate::{api::app_state::AppState, error::AppError};

/// Export every user's traits and coordinates for the grouping process
pub async fn export_features(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    debug!("Exporting user features");

    let records = state.feature_exporter.export_all().await.map_err(|e| {
        error!(error = %e, "Feature export failed");
        e
    })?;
    state.metrics.record_feature_export();

    Ok(Json(records))
}

/// Fallback for unknown paths, answered with the JSON error body
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}
