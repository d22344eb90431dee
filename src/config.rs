use std::env;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set. Add it to your .env file")]
    Missing(&'static str),
    #[error("{name} must be a number, got '{value}'")]
    NotANumber { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub jwt_secret: String,
    pub jwt_expire_days: i64,
    /// Pepper mixed into every Argon2 hash when present.
    pub hash_secret: Option<String>,
    pub webhook_secret: Option<String>,
    pub upload_dir: PathBuf,
    pub public_base_url: String,
}

impl Config {
    /// Reads the process environment. Call `dotenv::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Config, ConfigError> {
        let jwt_secret = non_empty("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        Ok(Config {
            host: non_empty("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_number("PORT", 5000)?,
            database_path: non_empty("DATABASE_PATH").unwrap_or_else(|| "campus.db".to_string()),
            jwt_secret,
            jwt_expire_days: parse_number("JWT_EXPIRE_DAYS", 7)?,
            hash_secret: non_empty("HASH_SECRET"),
            webhook_secret: non_empty("RAZORPAY_WEBHOOK_SECRET"),
            upload_dir: PathBuf::from(
                non_empty("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string()),
            ),
            public_base_url: non_empty("PUBLIC_BASE_URL").unwrap_or_default(),
        })
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_number<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty(name) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::NotANumber { name, value }),
    }
}
