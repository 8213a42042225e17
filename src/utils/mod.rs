pub mod crypto;
pub mod text;
pub mod time;
pub mod validation;
