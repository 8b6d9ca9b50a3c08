//! Configuration file support for image-finder.
//!
//! # Configuration File Format
//!
//! ```toml
//! [api_keys]
//! giphy = "your-giphy-key"
//! tenor = "your-tenor-key"
//! imgur_client_id = "your-imgur-client-id"
//! serpapi = "your-serpapi-key"
//!
//! [search]
//! mode = "first_success"          # or "concatenate"
//! providers = ["giphy", "duckduckgo", "bing"]
//! limit = 24
//! enhance = true
//! safe_search = "moderate"        # strict | moderate | off
//!
//! [retry]
//! max_retries = 3
//! base_delay_ms = 2000
//!
//! [timeouts]
//! serpapi = 20
//! bing = 8
//!
//! [cache]
//! enabled = true
//! ttl_seconds = 600
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! Every value can be overridden from the environment with the
//! `IMAGE_FINDER_` prefix and `__` between section and key, e.g.
//! `IMAGE_FINDER_SEARCH__LIMIT=10` or
//! `IMAGE_FINDER_SEARCH__PROVIDERS=bing,google`.

use std::path::{Path, PathBuf};

use super::Config;

const APP_DIR: &str = "image-finder";
const LOCAL_CONFIG_FILE: &str = "image-finder.toml";

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Serialize error: {0}")]
    Serialize(String),
}

/// `<config dir>/image-finder/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

/// First existing config file among the user config dir and the working directory
pub fn find_config_file() -> Option<PathBuf> {
    default_config_path()
        .into_iter()
        .chain(std::iter::once(PathBuf::from(LOCAL_CONFIG_FILE)))
        .find(|path| path.is_file())
}

/// Load configuration
///
/// With an explicit `path` the file must exist. Without one, the first file
/// found by [`find_config_file`] is used, and plain defaults if there is none.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let file = match path {
        Some(path) if !path.is_file() => return Err(ConfigError::NotFound(path.to_path_buf())),
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(),
    };

    let mut builder = config::Config::builder();
    if let Some(file) = &file {
        tracing::debug!("Loading config from {}", file.display());
        builder = builder.add_source(config::File::from(file.as_path()));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix("IMAGE_FINDER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("search.providers"),
        )
        .build()?;

    let mut config: Config = settings.try_deserialize()?;
    config.api_keys.fill_from_env();

    Ok(config)
}
