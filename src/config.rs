use std::{env, path::PathBuf};

use tracing::info;

/// Runtime configuration, read once at startup from the environment
/// (after dotenvy has loaded `.env`, if present).
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub db_path: PathBuf,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
}

impl Config {
    pub fn load() -> Self {
        let port = env::var("FOREVER_US_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let db_path = env::var("FOREVER_US_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = env::var("HOME").unwrap_or_else(|_| ".".into());
                PathBuf::from(home).join(".forever-us").join("forever-us.db")
            });

        let gemini_api_key = env::var("GEMINI_API_KEY").ok();
        if gemini_api_key.is_none() {
            info!("GEMINI_API_KEY not set, AI generators will be unavailable");
        }

        let gemini_model =
            env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".into());

        Self {
            port,
            db_path,
            gemini_api_key,
            gemini_model,
        }
    }
}
