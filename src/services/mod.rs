pub mod activation_service;
pub mod activity_service;
pub mod auth_service;
pub mod card_service;
pub mod contract_service;
pub mod cv_service;
pub mod export_service;
pub mod import_service;
pub mod pdf_service;
pub mod sheet_sync_service;
pub mod user_service;
