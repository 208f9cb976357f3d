use std::fs;
use std::path::{Path, PathBuf};

use crate::types::Config;

/// Overrides `backend.url`.
pub const BACKEND_URL_ENV: &str = "KPIBOARD_BACKEND_URL";
/// Overrides `backend.apiKey`.
pub const API_KEY_ENV: &str = "KPIBOARD_API_KEY";

/// Get the canonical config file path (~/.kpiboard/config.json)
pub fn config_path() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("Could not find home directory")?;
    Ok(home.join(".kpiboard").join("config.json"))
}

/// Load configuration from ~/.kpiboard/config.json, then apply environment
/// overrides.
pub fn load_config() -> Result<Config, String> {
    load_config_at(&config_path()?)
}

/// Same as [`load_config`] with an explicit file location.
pub fn load_config_at(path: &Path) -> Result<Config, String> {
    let mut config = load_config_from(path)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config)?;
    Ok(config)
}

/// Load configuration from `path`. A missing file yields the defaults; a
/// file that exists but cannot be read or parsed is an error.
pub fn load_config_from(path: &Path) -> Result<Config, String> {
    if !path.exists() {
        log::debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read config: {}", e))?;

    serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))
}

/// Apply backend credentials from the environment. Empty values are ignored.
pub fn apply_env_overrides(config: &mut Config, get: impl Fn(&str) -> Option<String>) {
    let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = non_empty(BACKEND_URL_ENV) {
        config.backend.url = url;
    }
    if let Some(key) = non_empty(API_KEY_ENV) {
        config.backend.api_key = key;
    }
}

/// Reject limits that would make every board empty.
pub fn validate_config(config: &Config) -> Result<(), String> {
    if config.display_cap == 0 {
        return Err("displayCap must be at least 1".to_string());
    }
    if config.per_team_cap == 0 {
        return Err("perTeamCap must be at least 1".to_string());
    }
    if config.fetch_limit == 0 {
        return Err("fetchLimit must be at least 1".to_string());
    }
    if !(1..=9999).contains(&config.target_year) {
        return Err(format!("targetYear out of range: {}", config.target_year));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MonthNaming;
    use std::collections::HashMap;

    #[test]
    fn test_missing_config_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.display_cap, 4);
        assert!(!config.backend.is_configured());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "backend": {"url": "https://db.example.com", "apiKey": "anon"},
                "targetYear": 2026,
                "fetchLimit": 20,
                "monthNaming": "number",
                "seed": 9
            }"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.target_year, 2026);
        assert_eq!(config.fetch_limit, 20);
        assert_eq!(config.per_team_cap, 2);
        assert_eq!(config.month_naming, MonthNaming::Number);
        assert_eq!(config.seed, Some(9));
        assert!(config.backend.is_configured());
    }

    #[test]
    fn test_malformed_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(err.starts_with("Failed to parse config"));
    }

    #[test]
    fn test_env_overrides_replace_backend_credentials() {
        let env: HashMap<&str, &str> = [
            (BACKEND_URL_ENV, "https://env.example.com"),
            (API_KEY_ENV, "  "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.backend.api_key = "from-file".to_string();
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.backend.url, "https://env.example.com");
        assert_eq!(config.backend.api_key, "from-file");
    }

    #[test]
    fn test_validate_rejects_zero_caps() {
        let mut config = Config::default();
        assert!(validate_config(&config).is_ok());

        config.display_cap = 0;
        assert!(validate_config(&config).is_err());

        config.display_cap = 4;
        config.per_team_cap = 0;
        assert!(validate_config(&config).is_err());
    }
}
