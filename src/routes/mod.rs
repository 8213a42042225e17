pub mod activation;
pub mod activity;
pub mod admin;
pub mod auth;
pub mod contracts;
pub mod cvs;
pub mod export;
pub mod gallery;
pub mod health;
pub mod import;
pub mod sheets;
pub mod users;
