use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;
use validator::Validate;

use crate::{
    dto::auth_dto::{LoginPayload, LoginResponse, MeResponse},
    error::Result,
    middleware::auth::{CurrentUser, RequestMeta},
    models::activity_log::{ActivityType, TargetType},
    services::activity_service::NewActivity,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Signed in", body = Json<LoginResponse>),
        (status = 401, description = "Invalid email or password")
    )
)]
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let (token, user) = state
        .auth_service
        .login(&payload.email, &payload.password)
        .await?;

    let actor = CurrentUser::from_user(user.clone(), RequestMeta::from_headers(&headers));
    state
        .activity_service
        .record(
            Some(&actor),
            NewActivity::new(ActivityType::UserLogin, format!("{} signed in", user.email))
                .target(TargetType::User, user.id),
        )
        .await;

    Ok(Json(LoginResponse { token, user }))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = Json<MeResponse>),
        (status = 401, description = "Missing or invalid token")
    )
)]
#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.get(current.id).await?;
    Ok(Json(MeResponse { user }))
}

/// Tokens are stateless; logging out only leaves a trace in the activity log.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out"),
        (status = 401, description = "Missing or invalid token")
    )
)]
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse> {
    state
        .activity_service
        .record(
            Some(&current),
            NewActivity::new(ActivityType::UserLogout, format!("{} signed out", current.email))
                .target(TargetType::User, current.id),
        )
        .await;
    Ok(Json(json!({ "message": "Logged out" })))
}
