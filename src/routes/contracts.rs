use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;

use crate::{
    dto::{
        contract_dto::{ContractListQuery, ContractResponse, CreateContractPayload, HiredListResponse},
        cv_dto::{CvPayload, CvResponse},
    },
    error::{Error, Result},
    middleware::auth::CurrentUser,
    models::{
        activity_log::{ActivityType, TargetType},
        cv::CvStatus,
    },
    routes::cvs::parse_cv_id,
    services::activity_service::NewActivity,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/contracts",
    request_body = CreateContractPayload,
    responses(
        (status = 201, description = "Contract recorded", body = Json<ContractResponse>),
        (status = 400, description = "CV ID and Identity Number are required"),
        (status = 404, description = "CV not found")
    )
)]
#[axum::debug_handler]
pub async fn create_contract(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateContractPayload>,
) -> Result<impl IntoResponse> {
    let (cv_id, identity_number) = payload.required_fields()?;
    let contract = state
        .contract_service
        .create(cv_id, &identity_number, payload.contract_date, Some(user.id))
        .await?;

    state
        .activity_service
        .record(
            Some(&user),
            NewActivity::new(
                ActivityType::ContractCreated,
                format!("Created contract {} for CV #{}", contract.identity_number, cv_id),
            )
            .for_cv(cv_id)
            .metadata(json!({ "contract_id": contract.id, "identity_number": contract.identity_number })),
        )
        .await;

    Ok((StatusCode::CREATED, Json(ContractResponse { contract })))
}

#[utoipa::path(
    get,
    path = "/api/contracts",
    params(("search" = Option<String>, Query, description = "Search by name, reference or identity number")),
    responses(
        (status = 200, description = "Hired CVs with their latest contract", body = Json<HiredListResponse>)
    )
)]
#[axum::debug_handler]
pub async fn list_contracts(
    State(state): State<AppState>,
    Query(query): Query<ContractListQuery>,
) -> Result<impl IntoResponse> {
    let contracts = state.contract_service.list_hired(query.search.as_deref()).await?;
    Ok(Json(HiredListResponse { contracts }))
}

/// Sends a hired CV back to the pool as `RETURNED`.
#[utoipa::path(
    post,
    path = "/api/contracts/{cv_id}/return",
    params(("cv_id" = i64, Path, description = "CV ID")),
    responses(
        (status = 200, description = "CV returned", body = Json<CvResponse>),
        (status = 404, description = "CV not found"),
        (status = 409, description = "CV cannot be returned from its current status")
    )
)]
#[axum::debug_handler]
pub async fn return_cv(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(cv_id): Path<String>,
) -> Result<impl IntoResponse> {
    let cv_id = parse_cv_id(&cv_id)?;
    let payload = CvPayload {
        status: Some(CvStatus::Returned),
        ..Default::default()
    };
    let update = state.cv_service.update(cv_id, payload, &user).await?;
    let cv = update.cv;

    if cv.status != update.previous_status {
        state
            .activity_service
            .record(
                Some(&user),
                NewActivity::new(
                    ActivityType::StatusChanged,
                    format!(
                        "Returned {} (was {})",
                        cv.full_name,
                        update.previous_status.as_str()
                    ),
                )
                .for_cv(cv.id)
                .metadata(json!({ "from": update.previous_status, "to": cv.status })),
            )
            .await;
    }

    Ok(Json(CvResponse { cv }))
}

#[utoipa::path(
    delete,
    path = "/api/contracts/{id}",
    params(("id" = i64, Path, description = "Contract ID")),
    responses(
        (status = 204, description = "Contract deleted"),
        (status = 403, description = "Insufficient permissions"),
        (status = 404, description = "Contract not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_contract(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    user.require_manager()?;
    let id = id
        .trim()
        .parse::<i64>()
        .map_err(|_| Error::BadRequest("Invalid contract ID format".into()))?;
    let contract = state.contract_service.delete(id).await?;

    state
        .activity_service
        .record(
            Some(&user),
            NewActivity::new(
                ActivityType::ContractDeleted,
                format!("Deleted contract {}", contract.identity_number),
            )
            .for_cv(contract.cv_id)
            .target(TargetType::Contract, contract.id)
            .metadata(json!({ "cv_id": contract.cv_id, "identity_number": contract.identity_number })),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}
