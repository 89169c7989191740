use std::{env, path::PathBuf};
use thiserror::Error;
use uuid::Uuid;

use crate::models::UserId;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("APP_USER must be a UUID, got '{0}'")]
    InvalidUser(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub data_path: PathBuf,
    /// Signed-in user for requests that do not name one.
    pub default_user: Option<UserId>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(8080);

        let data_path = env::var("APP_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/state.json"));

        let default_user = match env::var("APP_USER") {
            Ok(value) if !value.trim().is_empty() => Some(parse_user(&value)?),
            _ => None,
        };

        Ok(Self {
            port,
            data_path,
            default_user,
        })
    }
}

pub fn parse_user(value: &str) -> Result<UserId, ConfigError> {
    Uuid::parse_str(value.trim())
        .map(UserId)
        .map_err(|_| ConfigError::InvalidUser(value.to_string()))
}
