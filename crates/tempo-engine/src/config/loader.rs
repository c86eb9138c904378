use super::schema::{StoreKeys, TempoConfig};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "TEMPO_CONFIG";

const LOCAL_CONFIG: &str = "tempo.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Places a config file is looked for, most specific first: an explicit
/// `override_path`, `./tempo.yaml`, then `<home>/.tempo/config.yaml`.
pub fn candidate_paths(override_path: Option<PathBuf>, home: Option<PathBuf>) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = override_path.into_iter().collect();
    paths.push(PathBuf::from(".").join(LOCAL_CONFIG));
    if let Some(home) = home {
        paths.push(home.join(".tempo").join("config.yaml"));
    }
    paths
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the first config file found among [`candidate_paths`], or the
    /// defaults when there is none. A path named by `TEMPO_CONFIG` must exist.
    pub async fn load_default() -> Result<TempoConfig, ConfigError> {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        if let Some(path) = &explicit {
            return Self::load_from(path).await;
        }

        for path in candidate_paths(None, dirs::home_dir()) {
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Self::load_from(&path).await;
            }
        }

        info!("No config file found, using defaults");
        Ok(TempoConfig::default())
    }

    pub async fn load_from(path: &Path) -> Result<TempoConfig, ConfigError> {
        debug!("Loading config from {}", path.display());
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(&content)
    }

    /// Parse and validate YAML. A blank document yields the defaults.
    pub fn parse(content: &str) -> Result<TempoConfig, ConfigError> {
        let config = if content.trim().is_empty() {
            TempoConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };
        validate(&config)?;
        Ok(config)
    }
}

/// Every template needs its own non-empty store key, otherwise one capture
/// would be replayed as another.
fn validate(config: &TempoConfig) -> Result<(), ConfigError> {
    let StoreKeys {
        fluency_time,
        fluency_validation,
        foundations_time,
        foundations_validation,
    } = &config.keys;
    let keys = [
        fluency_time,
        fluency_validation,
        foundations_time,
        foundations_validation,
    ];

    if keys.iter().any(|key| key.trim().is_empty()) {
        return Err(ConfigError::Invalid("store keys must not be empty".into()));
    }
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "store key '{}' is used for more than one template",
                key
            )));
        }
    }
    Ok(())
}
