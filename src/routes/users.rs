use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::user_dto::{CreateUserPayload, UpdateUserPayload, UserListResponse, UserResponse},
    error::Result,
    middleware::auth::CurrentUser,
    models::activity_log::{ActivityType, TargetType},
    services::activity_service::NewActivity,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All users", body = Json<UserListResponse>),
        (status = 403, description = "Insufficient permissions")
    )
)]
#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse> {
    current.require_admin()?;
    let users = state.user_service.list().await?;
    Ok(Json(UserListResponse { users }))
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserPayload,
    responses(
        (status = 201, description = "User created", body = Json<UserResponse>),
        (status = 403, description = "Insufficient permissions"),
        (status = 409, description = "User with this email already exists")
    )
)]
#[axum::debug_handler]
pub async fn create_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<CreateUserPayload>,
) -> Result<impl IntoResponse> {
    current.require_admin()?;
    payload.validate()?;
    let user = state.user_service.create(payload).await?;

    state
        .activity_service
        .record(
            Some(&current),
            NewActivity::new(ActivityType::UserCreated, format!("Created user {}", user.email))
                .target(TargetType::User, user.id)
                .metadata(json!({ "email": user.email, "role": user.role })),
        )
        .await;

    Ok((StatusCode::CREATED, Json(UserResponse { user })))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User ID")),
    request_body = UpdateUserPayload,
    responses(
        (status = 200, description = "User updated", body = Json<UserResponse>),
        (status = 403, description = "Insufficient permissions"),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<impl IntoResponse> {
    current.require_admin()?;
    payload.validate()?;
    let password_changed = payload.new_password().is_some();
    let user = state.user_service.update(id, payload).await?;

    state
        .activity_service
        .record(
            Some(&current),
            NewActivity::new(ActivityType::UserUpdated, format!("Updated user {}", user.email))
                .target(TargetType::User, user.id)
                .metadata(json!({
                    "role": user.role,
                    "is_active": user.is_active,
                    "password_changed": password_changed,
                })),
        )
        .await;

    Ok(Json(UserResponse { user }))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 400, description = "You cannot delete your own account"),
        (status = 403, description = "Insufficient permissions"),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    current.require_admin()?;
    let user = state.user_service.delete(id, current.id).await?;

    state
        .activity_service
        .record(
            Some(&current),
            NewActivity::new(ActivityType::UserDeleted, format!("Deleted user {}", user.email))
                .target(TargetType::User, user.id)
                .metadata(json!({ "email": user.email })),
        )
        .await;

    Ok(Json(json!({ "message": "User deleted successfully" })))
}
