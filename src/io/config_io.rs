use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::model::config::ClientConfig;

pub const ENV_API_URL: &str = "PLANK_API_URL";
pub const ENV_API_TOKEN: &str = "PLANK_API_TOKEN";

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Default config file path, respecting XDG_CONFIG_HOME
pub fn config_path() -> PathBuf {
    let config_dir = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_home().join(".config"));
    config_dir.join("plank").join("config.toml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/"))
}

/// Read a config file. A missing file yields the defaults.
pub fn read_config_from(path: &Path) -> Result<ClientConfig, ConfigError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(ClientConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Apply environment overrides. `lookup` is `std::env::var` outside tests.
pub fn apply_env(config: &mut ClientConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
        config.api.base_url = url.trim().trim_end_matches('/').to_string();
    }
    if let Some(token) = lookup(ENV_API_TOKEN).filter(|v| !v.trim().is_empty()) {
        config.api.token = Some(token.trim().to_string());
    }
}

/// Load the config from `explicit` (which must exist) or the default path,
/// then apply environment overrides.
pub fn load_config(explicit: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    let mut config = match explicit {
        Some(path) if !path.exists() => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "file not found"),
            });
        }
        Some(path) => read_config_from(path)?,
        None => read_config_from(&config_path())?,
    };
    apply_env(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = read_config_from(&tmp.path().join("config.toml")).unwrap();
        assert_eq!(config.api.base_url, "http://127.0.0.1:8000/api");
        assert_eq!(config.sync.reorder_debounce_ms, 1000);
        assert_eq!(config.media.page_size, 50);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(
            &path,
            "[api]\nbase_url = \"https://tasks.example.com/api\"\n\n[sync]\nreorder_debounce_ms = 250\n",
        )
        .unwrap();
        let config = read_config_from(&path).unwrap();
        assert_eq!(config.api.base_url, "https://tasks.example.com/api");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.sync.reorder_debounce_ms, 250);
        assert_eq!(config.ui.title_width, 60);
    }

    #[test]
    fn test_invalid_file_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[sync]\nreorder_debounce_ms = \"soon\"\n").unwrap();
        assert!(matches!(
            read_config_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ClientConfig::default();
        apply_env(&mut config, |key| match key {
            ENV_API_URL => Some("http://10.0.0.2:9000/api/".into()),
            ENV_API_TOKEN => Some("secret".into()),
            _ => None,
        });
        assert_eq!(config.api.base_url, "http://10.0.0.2:9000/api");
        assert_eq!(config.api.token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_explicit_missing_path_is_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("absent.toml");
        assert!(matches!(
            load_config(Some(&missing)),
            Err(ConfigError::Read { .. })
        ));
    }
}
