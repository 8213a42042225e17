pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

use crate::config::get_config;
use crate::error::Result;
use crate::middleware::{
    auth::require_auth,
    cors::cors_layer,
    rate_limit::{new_rps_state, rps_middleware},
};
use crate::services::{
    activation_service::{ActivationService, AttemptTracker},
    activity_service::ActivityService,
    auth_service::AuthService,
    card_service::CardService,
    contract_service::ContractService,
    cv_service::CvService,
    import_service::ImportService,
    pdf_service::PdfService,
    sheet_sync_service::{HttpSheetSource, SheetSource, SheetSyncService},
    user_service::UserService,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub user_service: UserService,
    pub auth_service: AuthService,
    pub activation_service: ActivationService,
    pub cv_service: CvService,
    pub contract_service: ContractService,
    pub activity_service: ActivityService,
    pub import_service: ImportService,
    pub pdf_service: PdfService,
    pub card_service: CardService,
    pub sheet_sync_service: SheetSyncService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Result<Self> {
        let config = get_config();

        let user_service = UserService::new(pool.clone());
        let auth_service = AuthService::new(user_service.clone());
        let activation_service = ActivationService::new(
            user_service.clone(),
            config.activation_codes.clone(),
            AttemptTracker::new(
                config.activation_max_attempts,
                config.activation_lockout_minutes,
            ),
        );
        let activity_service = ActivityService::new(pool.clone());

        let sheet_source = match &config.sheet_csv_url {
            Some(url) => {
                let source: Arc<dyn SheetSource + Send + Sync> = Arc::new(HttpSheetSource::new(url)?);
                Some(source)
            }
            None => None,
        };
        let sheet_sync_service =
            SheetSyncService::new(pool.clone(), sheet_source, activity_service.clone());

        Ok(Self {
            user_service,
            auth_service,
            activation_service,
            cv_service: CvService::new(pool.clone()),
            contract_service: ContractService::new(pool.clone()),
            activity_service,
            import_service: ImportService::new(pool.clone()),
            pdf_service: PdfService::new(config.pdf_font_path.clone()),
            card_service: CardService::new(&config.uploads_dir),
            sheet_sync_service,
            pool,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let config = get_config();

    let public_api = Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/auth/login", post(routes::auth::login))
        .route(
            "/api/admin/create-super-admin",
            post(routes::admin::create_super_admin),
        )
        .route("/api/gallery", get(routes::gallery::list_gallery))
        .layer(from_fn_with_state(
            new_rps_state(config.public_rps),
            rps_middleware,
        ));

    let protected_api = Router::new()
        .route("/api/auth/me", get(routes::auth::me))
        .route("/api/auth/logout", post(routes::auth::logout))
        .route(
            "/api/activation",
            get(routes::activation::activation_status).post(routes::activation::activate),
        )
        .route(
            "/api/cvs",
            get(routes::cvs::list_cvs).post(routes::cvs::create_cv),
        )
        .route("/api/cvs/stats", get(routes::cvs::cv_stats))
        .route("/api/cvs/bulk", post(routes::cvs::bulk_cvs))
        .route("/api/cvs/import", post(routes::import::import_cvs))
        .route("/api/cvs/export", post(routes::export::export_cvs_xlsx))
        .route(
            "/api/cvs/:id",
            get(routes::cvs::get_cv)
                .patch(routes::cvs::update_cv)
                .delete(routes::cvs::delete_cv),
        )
        .route("/api/cvs/:id/hire", post(routes::cvs::hire_cv))
        .route("/api/cvs/:id/versions", get(routes::cvs::list_versions))
        .route("/api/cvs/:id/export", get(routes::export::export_cv_pdf))
        .route("/api/cvs/:id/card", get(routes::export::export_cv_card))
        .route(
            "/api/contracts",
            get(routes::contracts::list_contracts).post(routes::contracts::create_contract),
        )
        .route(
            "/api/contracts/:id",
            axum::routing::delete(routes::contracts::delete_contract),
        )
        .route("/api/contracts/:id/return", post(routes::contracts::return_cv))
        .route(
            "/api/users",
            get(routes::users::list_users).post(routes::users::create_user),
        )
        .route(
            "/api/users/:id",
            put(routes::users::update_user).delete(routes::users::delete_user),
        )
        .route(
            "/api/activity-logs",
            get(routes::activity::list_activity).post(routes::activity::report_activity),
        )
        .route("/api/sheets/sync", post(routes::sheets::sync_now))
        .route("/api/sheets/status", get(routes::sheets::sync_status))
        .route("/api/sheets/settings", put(routes::sheets::update_settings))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
        .layer(from_fn_with_state(
            new_rps_state(config.api_rps),
            rps_middleware,
        ));

    tracing::info!("Serving uploads from: {}", config.uploads_dir);

    public_api
        .merge(protected_api)
        .nest_service(
            "/uploads",
            tower_http::services::ServeDir::new(&config.uploads_dir),
        )
        .with_state(state)
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(50 * 1024 * 1024))
}
