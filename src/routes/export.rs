use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;

use crate::{
    dto::cv_dto::ExportCvsRequest,
    error::{Error, Result},
    middleware::auth::CurrentUser,
    models::activity_log::{ActivityType, TargetType},
    routes::cvs::parse_cv_id,
    services::{
        activity_service::NewActivity,
        export_service::{xlsx_file_name, ExportService},
        pdf_service::pdf_file_name,
    },
    AppState,
};

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Internal(format!("Render task failed: {}", e)))?
}

/// Export a single CV as PDF
#[axum::debug_handler]
pub async fn export_cv_pdf(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let detail = state.cv_service.detail(parse_cv_id(&id)?).await?;
    let cv = detail.cv;
    let file_name = pdf_file_name(&cv.full_name);

    let pdf = state.pdf_service.clone();
    let (cv, buffer) = blocking(move || {
        let bytes = pdf.render(&cv, detail.created_by.as_ref())?;
        Ok((cv, bytes))
    })
    .await?;

    state
        .activity_service
        .record(
            Some(&user),
            NewActivity::new(ActivityType::CvExported, format!("Exported CV of {} as PDF", cv.full_name))
                .for_cv(cv.id)
                .metadata(json!({ "format": "PDF", "file_name": file_name })),
        )
        .await;

    let disposition = format!("attachment; filename=\"{}\"", file_name);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        buffer,
    ))
}

/// Export a single CV as a watermarked PNG card
#[axum::debug_handler]
pub async fn export_cv_card(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let cv = state.cv_service.get(parse_cv_id(&id)?).await?;

    let cards = state.card_service.clone();
    let (cv, buffer) = blocking(move || {
        let bytes = cards.render(&cv)?;
        Ok((cv, bytes))
    })
    .await?;

    state
        .activity_service
        .record(
            Some(&user),
            NewActivity::new(ActivityType::CvExported, format!("Exported card of {}", cv.full_name))
                .for_cv(cv.id)
                .metadata(json!({ "format": "PNG" })),
        )
        .await;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        buffer,
    ))
}

/// Export the selected CVs, or all of them, as XLSX
#[axum::debug_handler]
pub async fn export_cvs_xlsx(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<ExportCvsRequest>,
) -> Result<impl IntoResponse> {
    let cvs = state.cv_service.list_by_ids(payload.cv_ids.as_deref()).await?;
    let count = cvs.len();
    let buffer = blocking(move || ExportService::generate_cvs_xlsx(&cvs)).await?;
    let file_name = xlsx_file_name(chrono::Utc::now());

    state
        .activity_service
        .record(
            Some(&user),
            NewActivity::new(ActivityType::BulkDownload, format!("Downloaded {} CVs as XLSX", count))
                .target(TargetType::Cv, "bulk")
                .metadata(json!({ "format": "XLSX", "count": count, "file_name": file_name })),
        )
        .await;

    let disposition = format!("attachment; filename=\"{}\"", file_name);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        buffer,
    ))
}
