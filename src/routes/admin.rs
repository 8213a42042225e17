use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use validator::Validate;

use crate::{
    dto::{auth_dto::CreateSuperAdminPayload, user_dto::UserResponse},
    error::Result,
    models::activity_log::{ActivityType, TargetType},
    services::activity_service::NewActivity,
    AppState,
};

/// Bootstraps the first ADMIN. Public, and only usable while no admin exists.
#[utoipa::path(
    post,
    path = "/api/admin/create-super-admin",
    request_body = CreateSuperAdminPayload,
    responses(
        (status = 201, description = "Admin created", body = Json<UserResponse>),
        (status = 409, description = "An admin account already exists")
    )
)]
#[axum::debug_handler]
pub async fn create_super_admin(
    State(state): State<AppState>,
    Json(payload): Json<CreateSuperAdminPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = state.user_service.create_super_admin(payload).await?;
    tracing::info!(email = %user.email, "super admin created");

    state
        .activity_service
        .record(
            None,
            NewActivity::new(ActivityType::UserCreated, format!("Bootstrapped admin {}", user.email))
                .target(TargetType::User, user.id),
        )
        .await;

    Ok((StatusCode::CREATED, Json(UserResponse { user })))
}
