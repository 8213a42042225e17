use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::{json, Value as JsonValue};
use validator::Validate;

use crate::{
    dto::cv_dto::{
        BulkAction, BulkCvRequest, BulkCvResponse, CvDetailResponse, CvListQuery, CvListResponse,
        CvPayload, CvResponse, CvStatsResponse, CvVersionsResponse, HireCvPayload,
    },
    error::{Error, Result},
    middleware::auth::CurrentUser,
    models::activity_log::{ActivityType, TargetType},
    services::activity_service::NewActivity,
    AppState,
};

/// CV ids arrive as path strings; anything but an integer is a 400.
pub fn parse_cv_id(raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| Error::BadRequest("Invalid CV ID format".into()))
}

#[utoipa::path(
    get,
    path = "/api/cvs",
    params(
        ("status" = Option<String>, Query, description = "Only this status"),
        ("exclude_status" = Option<String>, Query, description = "Everything but this status"),
        ("skill" = Option<String>, Query, description = "Skill column that must be YES or WILLING"),
        ("search" = Option<String>, Query, description = "Search query"),
        ("page" = Option<i64>, Query, description = "Page number"),
        ("per_page" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "List of CVs", body = Json<CvListResponse>)
    )
)]
#[axum::debug_handler]
pub async fn list_cvs(
    State(state): State<AppState>,
    Query(query): Query<CvListQuery>,
) -> Result<impl IntoResponse> {
    let result = state.cv_service.list(query).await?;
    Ok(Json(CvListResponse::from(result)))
}

#[utoipa::path(
    post,
    path = "/api/cvs",
    request_body = CvPayload,
    responses(
        (status = 201, description = "CV created", body = Json<CvResponse>),
        (status = 400, description = "Missing full name or invalid email")
    )
)]
#[axum::debug_handler]
pub async fn create_cv(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CvPayload>,
) -> Result<impl IntoResponse> {
    let payload = payload.normalized();
    payload.validate()?;
    let cv = state.cv_service.create(payload, Some(user.id)).await?;

    state
        .activity_service
        .record(
            Some(&user),
            NewActivity::new(ActivityType::CvCreated, format!("Created CV for {}", cv.full_name))
                .for_cv(cv.id)
                .metadata(json!({ "full_name": cv.full_name, "source": cv.source })),
        )
        .await;

    Ok((StatusCode::CREATED, Json(CvResponse { cv })))
}

#[utoipa::path(
    get,
    path = "/api/cvs/{id}",
    params(("id" = i64, Path, description = "CV ID")),
    responses(
        (status = 200, description = "CV with its latest versions", body = Json<CvDetailResponse>),
        (status = 400, description = "Invalid CV ID format"),
        (status = 404, description = "CV not found")
    )
)]
#[axum::debug_handler]
pub async fn get_cv(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let detail = state.cv_service.detail(parse_cv_id(&id)?).await?;
    Ok(Json(CvDetailResponse {
        cv: detail.cv,
        created_by: detail.created_by,
        updated_by: detail.updated_by,
        versions: detail.versions,
    }))
}

#[utoipa::path(
    patch,
    path = "/api/cvs/{id}",
    params(("id" = i64, Path, description = "CV ID")),
    request_body = CvPayload,
    responses(
        (status = 200, description = "CV updated", body = Json<CvResponse>),
        (status = 404, description = "CV not found"),
        (status = 409, description = "Status transition not allowed")
    )
)]
#[axum::debug_handler]
pub async fn update_cv(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<JsonValue>,
) -> Result<impl IntoResponse> {
    let id = parse_cv_id(&id)?;
    let payload = CvPayload::from_json(body)?;
    payload.validate()?;
    let update = state.cv_service.update(id, payload, &user).await?;
    let cv = update.cv;

    let entry = if cv.status != update.previous_status {
        NewActivity::new(
            ActivityType::StatusChanged,
            format!(
                "Changed status of {} from {} to {}",
                cv.full_name,
                update.previous_status.as_str(),
                cv.status.as_str()
            ),
        )
        .metadata(json!({ "from": update.previous_status, "to": cv.status }))
    } else {
        NewActivity::new(ActivityType::CvUpdated, format!("Updated CV of {}", cv.full_name))
            .metadata(json!({ "fields": update.changed_fields }))
    };
    state
        .activity_service
        .record(Some(&user), entry.for_cv(cv.id))
        .await;

    Ok(Json(CvResponse { cv }))
}

#[utoipa::path(
    delete,
    path = "/api/cvs/{id}",
    params(("id" = i64, Path, description = "CV ID")),
    responses(
        (status = 200, description = "CV deleted"),
        (status = 403, description = "Insufficient permissions"),
        (status = 404, description = "CV not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_cv(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    user.require_manager()?;
    let cv = state.cv_service.delete(parse_cv_id(&id)?).await?;

    // The row is gone, so the log entry only names it.
    state
        .activity_service
        .record(
            Some(&user),
            NewActivity::new(ActivityType::CvDeleted, format!("Deleted CV of {}", cv.full_name))
                .target(TargetType::Cv, cv.id)
                .metadata(json!({ "cv_id": cv.id, "full_name": cv.full_name })),
        )
        .await;

    Ok(Json(json!({ "message": "CV deleted successfully" })))
}

#[utoipa::path(
    post,
    path = "/api/cvs/{id}/hire",
    params(("id" = i64, Path, description = "CV ID")),
    request_body = HireCvPayload,
    responses(
        (status = 200, description = "CV hired"),
        (status = 404, description = "CV not found"),
        (status = 409, description = "CV is already hired")
    )
)]
#[axum::debug_handler]
pub async fn hire_cv(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(payload): Json<HireCvPayload>,
) -> Result<impl IntoResponse> {
    let id = parse_cv_id(&id)?;
    payload.validate()?;
    let hire = state.cv_service.hire(id, payload, &user).await?;
    let cv = &hire.cv;

    let entry = match &hire.contract {
        Some(contract) => NewActivity::new(
            ActivityType::ContractCreated,
            format!("Hired {} under contract {}", cv.full_name, contract.identity_number),
        )
        .for_cv(cv.id)
        .metadata(json!({
            "contract_id": contract.id,
            "identity_number": contract.identity_number,
            "from": hire.previous_status,
        })),
        None => NewActivity::new(
            ActivityType::StatusChanged,
            format!("Re-hired returned CV of {}", cv.full_name),
        )
        .for_cv(cv.id)
        .metadata(json!({ "from": hire.previous_status, "to": cv.status })),
    };
    state.activity_service.record(Some(&user), entry).await;

    Ok(Json(json!({ "cv": hire.cv, "contract": hire.contract })))
}

#[utoipa::path(
    get,
    path = "/api/cvs/{id}/versions",
    params(("id" = i64, Path, description = "CV ID")),
    responses(
        (status = 200, description = "Version history, newest first", body = Json<CvVersionsResponse>),
        (status = 404, description = "CV not found")
    )
)]
#[axum::debug_handler]
pub async fn list_versions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id = parse_cv_id(&id)?;
    // 404 for unknown CVs rather than an empty history.
    state.cv_service.get(id).await?;
    let versions = state.cv_service.versions(id, None).await?;
    Ok(Json(CvVersionsResponse { versions }))
}

#[utoipa::path(
    get,
    path = "/api/cvs/stats",
    responses(
        (status = 200, description = "CV count per status", body = Json<CvStatsResponse>)
    )
)]
#[axum::debug_handler]
pub async fn cv_stats(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let (total, counts) = state.cv_service.stats().await?;
    Ok(Json(CvStatsResponse { total, counts }))
}

#[utoipa::path(
    post,
    path = "/api/cvs/bulk",
    request_body = BulkCvRequest,
    responses(
        (status = 200, description = "Every listed CV was processed", body = Json<BulkCvResponse>),
        (status = 403, description = "Insufficient permissions"),
        (status = 404, description = "One of the CVs does not exist; nothing was changed")
    )
)]
#[axum::debug_handler]
pub async fn bulk_cvs(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<BulkCvRequest>,
) -> Result<impl IntoResponse> {
    user.require_manager()?;
    payload.validate()?;

    let (processed, entry) = match payload.action {
        BulkAction::Delete => {
            let processed = state.cv_service.bulk_delete(&payload.cv_ids).await?;
            let entry = NewActivity::new(ActivityType::BulkDelete, format!("Deleted {} CVs", processed))
                .metadata(json!({ "cv_ids": payload.cv_ids, "count": processed }));
            (processed, entry)
        }
        BulkAction::Status => {
            let status = payload.status.ok_or_else(|| {
                Error::BadRequest("Status is required for a bulk status change".into())
            })?;
            let processed = state
                .cv_service
                .bulk_status(&payload.cv_ids, status, user.id)
                .await?;
            let entry = NewActivity::new(
                ActivityType::BulkStatusChange,
                format!("Changed status of {} CVs to {}", processed, status.as_str()),
            )
            .metadata(json!({ "cv_ids": payload.cv_ids, "status": status, "count": processed }));
            (processed, entry)
        }
    };
    state
        .activity_service
        .record(Some(&user), entry.target(TargetType::Cv, "bulk"))
        .await;

    Ok(Json(BulkCvResponse { processed }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cv_ids_must_be_integers() {
        assert_eq!(parse_cv_id("42").unwrap(), 42);
        assert_eq!(parse_cv_id(" 7 ").unwrap(), 7);
        for raw in ["abc", "4.5", "", "1e3"] {
            assert!(matches!(
                parse_cv_id(raw),
                Err(Error::BadRequest(msg)) if msg == "Invalid CV ID format"
            ));
        }
    }
}
