use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

const DEFAULT_PRIMARY_LOCALE: &str = "pt-BR";
const DEFAULT_FALLBACK_LOCALE: &str = "en-US";
const DEFAULT_REGION: &str = "BR";
const DEFAULT_PORT: u16 = 3147;
const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub primary_locale: String,
    pub fallback_locale: String,
    pub region: String,
    pub port: u16,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("TMDB_API_KEY").context("TMDB_API_KEY not set")?;
        let port = match env::var("CINEVERSE_PORT") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("invalid CINEVERSE_PORT '{}'", raw))?,
            Err(_) => DEFAULT_PORT,
        };
        Ok(Self {
            api_key,
            primary_locale: env_or("CINEVERSE_PRIMARY_LOCALE", DEFAULT_PRIMARY_LOCALE),
            fallback_locale: env_or("CINEVERSE_FALLBACK_LOCALE", DEFAULT_FALLBACK_LOCALE),
            region: env_or("CINEVERSE_REGION", DEFAULT_REGION),
            port,
            data_dir: PathBuf::from(env_or("CINEVERSE_DATA_DIR", DEFAULT_DATA_DIR)),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
