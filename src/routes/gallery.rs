use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json},
};

use crate::{
    dto::cv_dto::{GalleryQuery, GalleryResponse},
    error::Result,
    AppState,
};

#[axum::debug_handler]
pub async fn list_gallery(
    State(state): State<AppState>,
    Query(query): Query<GalleryQuery>,
) -> Result<impl IntoResponse> {
    let cvs = state.cv_service.gallery(query.status).await?;
    Ok(Json(GalleryResponse { cvs }))
}
