use std::env;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub environment: String,
    pub frontend_urls: Vec<String>,
    pub realtime_buffer: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

fn parse_or<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidFormat(format!("{} has an invalid value: {}", var, raw))),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVariable("DATABASE_URL".to_string()))?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| ConfigError::MissingVariable("JWT_SECRET".to_string()))?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let port = parse_or("SERVER_PORT", 8080u16)?;
        let jwt_expiry_hours = parse_or("JWT_EXPIRY_HOURS", 24i64)?;
        if jwt_expiry_hours <= 0 {
            return Err(ConfigError::InvalidFormat("JWT_EXPIRY_HOURS must be positive".to_string()));
        }
        let realtime_buffer = parse_or("REALTIME_BUFFER", 256usize)?;

        // Parse allowed origins
        let frontend_urls = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:8081,http://localhost:19006".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(AppConfig {
            database_url,
            jwt_secret,
            jwt_expiry_hours,
            environment,
            port,
            frontend_urls,
            realtime_buffer,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

#[cfg(test)]
impl AppConfig {
    pub fn for_tests() -> Self {
        AppConfig {
            database_url: "postgres://localhost/hr_portal_test".to_string(),
            port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_expiry_hours: 1,
            environment: "test".to_string(),
            frontend_urls: Vec::new(),
            realtime_buffer: 16,
        }
    }
}
