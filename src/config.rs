use once_cell::sync::Lazy;
use regex::Regex;
use std::{collections::HashSet, path::PathBuf};
use thiserror::Error;

pub const DEFAULT_REGION: &str = "IN";
pub const DEFAULT_BRAND: &str = "AllMoviesPro";
pub const DEFAULT_TAGLINE: &str = "Powered by Empire Movies";
pub const DEFAULT_PORT: u16 = 5000;

static ID_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,\s]+").expect("valid regex"));

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is missing. Please set BOT_TOKEN and TMDB_API_KEY environment variables.")]
    Missing(&'static str),
    #[error("PORT must be a number, got {0:?}")]
    Port(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub tmdb_api_key: String,
    pub watch_region: String,
    pub admin_ids: HashSet<u64>,
    pub brand: String,
    pub tagline: String,
    pub known_chats_path: Option<PathBuf>,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Всё, кроме токена и ключа TMDB, необязательно.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bot_token = non_empty("BOT_TOKEN")
            .or_else(|| non_empty("TELOXIDE_TOKEN"))
            .ok_or(ConfigError::Missing("BOT_TOKEN"))?;
        let tmdb_api_key = non_empty("TMDB_API_KEY").ok_or(ConfigError::Missing("TMDB_API_KEY"))?;

        let watch_region = non_empty("WATCH_REGION")
            .map(|r| r.to_ascii_uppercase())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let admin_ids = parse_admin_ids(&get("ADMIN_USER_IDS").unwrap_or_default());

        let port = match non_empty("PORT") {
            Some(p) => p.parse().map_err(|_| ConfigError::Port(p))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            bot_token,
            tmdb_api_key,
            watch_region,
            admin_ids,
            brand: get("APP_BRAND").unwrap_or_else(|| DEFAULT_BRAND.to_string()),
            tagline: get("APP_TAGLINE").unwrap_or_else(|| DEFAULT_TAGLINE.to_string()),
            known_chats_path: non_empty("KNOWN_CHATS_PATH").map(PathBuf::from),
            port,
        })
    }
}

/// "1, 2 3,,x" -> {1, 2, 3}; нечисловые куски молча пропускаем.
pub fn parse_admin_ids(raw: &str) -> HashSet<u64> {
    ID_SEPARATORS
        .split(raw.trim())
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|s| s.parse().ok())
        .collect()
}
