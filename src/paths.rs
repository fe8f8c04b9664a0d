use std::path::PathBuf;

/// Per-user data directory.
/// Linux: ~/.config/peer-beacon/
/// macOS: ~/Library/Application Support/peer-beacon/
/// Windows: %APPDATA%/peer-beacon/
pub fn data_dir() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
    });
    base.join("peer-beacon")
}

/// {data_dir}/config.json
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// Expand ~ to home directory in paths.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path.starts_with("~/") || path == "~" {
        if let Some(home) = dirs::home_dir() {
            return PathBuf::from(path.replacen('~', &home.to_string_lossy(), 1));
        }
    }
    PathBuf::from(path)
}
