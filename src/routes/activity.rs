use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};

use crate::{
    dto::activity_dto::{ActivityListQuery, ActivityListResponse, ReportActivityPayload},
    error::{Error, Result},
    middleware::auth::CurrentUser,
    services::activity_service::NewActivity,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/activity-logs",
    params(
        ("action" = Option<String>, Query, description = "Activity type"),
        ("user_id" = Option<String>, Query, description = "Acting user"),
        ("cv_id" = Option<i64>, Query, description = "CV the entry is about"),
        ("since" = Option<String>, Query, description = "RFC 3339 lower bound"),
        ("search" = Option<String>, Query, description = "Search in description"),
        ("page" = Option<i64>, Query, description = "Page number"),
        ("per_page" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "Activity log page", body = Json<ActivityListResponse>),
        (status = 403, description = "Insufficient permissions")
    )
)]
#[axum::debug_handler]
pub async fn list_activity(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ActivityListQuery>,
) -> Result<impl IntoResponse> {
    user.require_manager()?;
    let result = state.activity_service.list(query).await?;
    Ok(Json(ActivityListResponse::from(result)))
}

/// Records an event only the client can observe (a CV opened, a file downloaded).
#[utoipa::path(
    post,
    path = "/api/activity-logs",
    request_body = ReportActivityPayload,
    responses(
        (status = 201, description = "Activity recorded"),
        (status = 400, description = "Action cannot be reported by clients"),
        (status = 404, description = "CV not found")
    )
)]
#[axum::debug_handler]
pub async fn report_activity(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<ReportActivityPayload>,
) -> Result<impl IntoResponse> {
    if !payload.action.is_client_reportable() {
        return Err(Error::BadRequest(format!(
            "{} cannot be reported by clients",
            payload.action.as_str()
        )));
    }

    let mut entry = NewActivity::new(payload.action, payload.description);
    if let Some(cv_id) = payload.cv_id {
        // Unknown CVs would violate the foreign key; 404 instead.
        state.cv_service.get(cv_id).await?;
        entry = entry.for_cv(cv_id);
    }
    if let Some(target_type) = payload.target_type {
        entry = entry.target(target_type, payload.target_id.unwrap_or_default());
    }
    if let Some(metadata) = payload.metadata {
        entry = entry.metadata(metadata);
    }

    let log = state.activity_service.log(Some(&user), entry).await?;
    Ok((StatusCode::CREATED, Json(log)))
}
