pub mod activation_dto;
pub mod activity_dto;
pub mod auth_dto;
pub mod contract_dto;
pub mod cv_dto;
pub mod import_dto;
pub mod sheet_dto;
pub mod user_dto;
