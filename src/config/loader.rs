use super::types::*;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Failed to parse config file: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("No {category} backends configured")]
    NoBackendsConfigured { category: BackendCategory },

    #[error("Invalid {category} type selected: '{choice}'")]
    InvalidSelection { category: BackendCategory, choice: String },

    #[error("No {category} configuration found for type: {tag}")]
    NoMatchingConfig { category: BackendCategory, tag: String },

    #[error("{category} configuration is missing required field '{name}'")]
    MissingField { category: BackendCategory, name: &'static str },

    #[error("Failed to construct {category} backend: {cause}")]
    ConstructionFailed { category: BackendCategory, cause: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Load and validate configuration from a JSON (or `.toml`) file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);

    let config: Config = if is_toml {
        toml::from_str(&contents)?
    } else {
        serde_json::from_str(&contents)?
    };

    validate_config(&config)?;
    Ok(config)
}

/// Validate settings that do not depend on backend selection
///
/// Backend entries themselves are checked by the resolver, once the entry
/// that will actually be used is known.
fn validate_config(config: &Config) -> Result<()> {
    let url = &config.notifications.discord_webhook_url;
    if !url.is_empty() && !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(ConfigError::ValidationError(format!(
            "Notifications.DiscordWebhookUrl must be an http(s) URL: {}",
            url
        )));
    }

    let level = config.logging.level.to_lowercase();
    if !matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "warning" | "error") {
        return Err(ConfigError::ValidationError(format!(
            "Logging.Level is not a valid log level: {}",
            config.logging.level
        )));
    }

    if config.logging.max_files == 0 {
        return Err(ConfigError::ValidationError(
            "Logging.MaxFiles must be at least 1".to_string(),
        ));
    }

    Ok(())
}
