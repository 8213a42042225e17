use axum::{
    extract::State,
    response::{IntoResponse, Json},
    Extension,
};

use crate::{
    dto::activation_dto::ActivationPayload,
    error::Result,
    middleware::auth::CurrentUser,
    models::activity_log::{ActivityType, TargetType},
    services::{activation_service::ActivationOutcome, activity_service::NewActivity},
    AppState,
};

#[axum::debug_handler]
pub async fn activation_status(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.get(current.id).await?;
    Ok(Json(state.activation_service.status(&user)))
}

#[axum::debug_handler]
pub async fn activate(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<ActivationPayload>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.get(current.id).await?;
    let outcome = state.activation_service.activate(&user, &payload.code).await?;

    if outcome == ActivationOutcome::Activated {
        tracing::info!(user_id = %user.id, "dashboard activated");
        state
            .activity_service
            .record(
                Some(&current),
                NewActivity::new(ActivityType::SystemActivated, format!("{} activated the system", user.email))
                    .target(TargetType::System, "activation"),
            )
            .await;
    }

    let user = state.user_service.get(current.id).await?;
    Ok(Json(state.activation_service.status(&user)))
}
