//! Process configuration, loaded once at startup and shared through DI.

use di::inject;
use di::injectable;
use std::env;

/// Immutable application settings.
///
/// Constructed a single time when the service provider is built and injected
/// into every component that needs it. Business logic never reads the process
/// environment directly.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_address: String,
    pub jwt_secret: String,
    pub jwt_algorithm: String,
    pub jwt_expiration_minutes: i64,
    pub agent_base_url: String,
    pub agent_api_key: Option<String>,
    pub agent_model: String,
}

#[injectable]
impl AppConfig {
    #[inject]
    pub fn from_env() -> AppConfig {
        dotenvy::dotenv().ok();

        AppConfig {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://todo_app.db".to_owned()),
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_owned()),
            jwt_secret: env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set"),
            jwt_algorithm: env::var("JWT_ALGORITHM").unwrap_or_else(|_| "HS256".to_owned()),
            jwt_expiration_minutes: env::var("JWT_EXPIRATION_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            agent_base_url: env::var("AGENT_BASE_URL")
                .unwrap_or_else(|_| "https://openrouter.ai/api/v1".to_owned()),
            agent_api_key: env::var("AGENT_API_KEY").ok(),
            agent_model: env::var("AGENT_MODEL")
                .unwrap_or_else(|_| "mistralai/mistral-small-3.1-24b-instruct:free".to_owned()),
        }
    }
}
