use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub api_rps: u32,
    pub public_rps: u32,
    pub activation_codes: Vec<String>,
    pub activation_max_attempts: u32,
    pub activation_lockout_minutes: i64,
    pub sheet_csv_url: Option<String>,
    pub uploads_dir: String,
    pub pdf_font_path: Option<String>,
    pub cors_origins: Vec<String>,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let sheet_csv_url = env::var("SHEET_CSV_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());
        if let Some(raw) = &sheet_csv_url {
            url::Url::parse(raw)
                .map_err(|e| Error::Config(format!("Invalid value for SHEET_CSV_URL: {}", e)))?;
        }

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            jwt_ttl_hours: get_env_parse_or("JWT_TTL_HOURS", 24)?,
            api_rps: get_env_parse_or("API_RPS", 50)?,
            public_rps: get_env_parse_or("PUBLIC_RPS", 20)?,
            activation_codes: parse_list(&env::var("ACTIVATION_CODES").unwrap_or_default()),
            activation_max_attempts: get_env_parse_or("ACTIVATION_MAX_ATTEMPTS", 3)?,
            activation_lockout_minutes: get_env_parse_or("ACTIVATION_LOCKOUT_MINUTES", 60)?,
            sheet_csv_url,
            uploads_dir: env::var("UPLOADS_DIR").unwrap_or_else(|_| "./uploads".to_string()),
            pdf_font_path: env::var("PDF_FONT_PATH").ok().filter(|s| !s.is_empty()),
            cors_origins: parse_list(&env::var("CORS_ORIGINS").unwrap_or_default()),
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        _ => Ok(default),
    }
}

/// Splits a comma separated list, dropping blanks.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_list_drops_blanks() {
        assert_eq!(parse_list(" a, ,b,"), vec!["a".to_string(), "b".to_string()]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn parse_or_falls_back_on_missing_var() {
        let v: u32 = get_env_parse_or("CV_BACKEND_TEST_UNSET_VARIABLE", 7).unwrap();
        assert_eq!(v, 7);
    }
}
