use std::path::PathBuf;

pub const SERVER_PORT: u16 = 3000;
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_DIST_DIR: &str = "client/dist";

pub fn server_port() -> u16 {
    std::env::var("WORDMAP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(SERVER_PORT)
}

pub fn data_dir() -> PathBuf {
    dir_from_env("WORDMAP_DATA_DIR", DEFAULT_DATA_DIR)
}

pub fn dist_dir() -> PathBuf {
    dir_from_env("WORDMAP_DIST_DIR", DEFAULT_DIST_DIR)
}

fn dir_from_env(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

pub fn validate_data_enabled() -> bool {
    std::env::var("WORDMAP_VALIDATE_DATA")
        .map(|value| {
            let normalized = value.trim().to_ascii_lowercase();
            matches!(normalized.as_str(), "1" | "true" | "yes" | "on")
        })
        .unwrap_or(true)
}
