use axum::{
    extract::State,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;
use validator::Validate;

use crate::{
    dto::sheet_dto::SheetSettingsPayload, error::Result, middleware::auth::CurrentUser, AppState,
};

#[axum::debug_handler]
pub async fn sync_now(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse> {
    user.require_manager()?;
    let report = state.sheet_sync_service.sync(Some(&user)).await?;
    Ok(Json(report))
}

#[axum::debug_handler]
pub async fn sync_status(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let sync_state = state.sheet_sync_service.state().await?;
    Ok(Json(json!({
        "configured": state.sheet_sync_service.is_configured(),
        "auto_sync": sync_state.auto_sync,
        "interval_seconds": sync_state.interval_seconds,
        "last_synced_at": sync_state.last_synced_at,
        "last_result": sync_state.last_result,
        "updated_at": sync_state.updated_at,
    })))
}

#[axum::debug_handler]
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<SheetSettingsPayload>,
) -> Result<impl IntoResponse> {
    user.require_manager()?;
    payload.validate()?;
    let sync_state = state.sheet_sync_service.update_settings(&payload).await?;
    tracing::info!(
        auto_sync = sync_state.auto_sync,
        interval_seconds = sync_state.interval_seconds,
        "sheet sync settings changed"
    );
    Ok(Json(sync_state))
}
