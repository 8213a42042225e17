use axum::{
    extract::{Multipart, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde_json::json;

use crate::{
    dto::import_dto::{ImportAction, ImportResultResponse},
    error::{Error, Result},
    middleware::auth::CurrentUser,
    models::activity_log::{ActivityType, TargetType},
    services::{
        activity_service::NewActivity,
        import_service::{detect_kind, parse_rows, parse_table, preview},
    },
    utils::crypto::sha256_hex,
    AppState,
};

struct Upload {
    file_name: String,
    content_type: Option<String>,
    bytes: bytes::Bytes,
}

/// Preview or import a spreadsheet of CVs (multipart `file` + `action`)
#[axum::debug_handler]
pub async fn import_cvs(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<Response> {
    user.require_manager()?;

    let mut upload: Option<Upload> = None;
    let mut action = String::new();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                upload = Some(Upload {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            Some("action") => action = field.text().await?,
            _ => {}
        }
    }

    let upload = upload
        .filter(|u| !u.bytes.is_empty() || !u.file_name.is_empty())
        .ok_or_else(|| Error::BadRequest("No file provided".into()))?;
    let kind = detect_kind(upload.content_type.as_deref(), &upload.file_name).ok_or_else(|| {
        Error::BadRequest("Invalid file type. Please upload Excel (.xlsx, .xls) or CSV file.".into())
    })?;

    let table = parse_table(&upload.bytes, kind)?;
    if table.rows.is_empty() {
        return Err(Error::BadRequest(
            "Excel file is empty or has no valid data".into(),
        ));
    }
    let parsed = parse_rows(&table);
    tracing::info!(
        file = %upload.file_name,
        rows = parsed.len(),
        "parsed spreadsheet upload"
    );

    match action.parse::<ImportAction>().map_err(Error::BadRequest)? {
        ImportAction::Preview => Ok(Json(preview(parsed)).into_response()),
        ImportAction::Import => {
            let total = parsed.len();
            let cvs = state.import_service.import(&parsed, Some(user.id)).await?;
            let imported = cvs.len();

            state
                .activity_service
                .record(
                    Some(&user),
                    NewActivity::new(
                        ActivityType::ExcelImport,
                        format!("Imported {} CVs from {}", imported, upload.file_name),
                    )
                    .target(TargetType::Cv, "import")
                    .metadata(json!({
                        "file_name": upload.file_name,
                        "sha256": sha256_hex(&upload.bytes),
                        "total": total,
                        "imported": imported,
                        "skipped": total - imported,
                    })),
                )
                .await;

            Ok(Json(ImportResultResponse {
                message: format!("Successfully imported {} CVs", imported),
                imported,
                total,
                skipped: total - imported,
                cvs,
            })
            .into_response())
        }
    }
}
