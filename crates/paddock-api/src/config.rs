//! Server configuration, deserialised from `config.toml` and `PADDOCK_*`
//! environment variables.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Runtime server configuration. Every field has a default, so an empty or
/// missing config file yields a usable local setup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:             String,
  pub port:             u16,
  pub database_path:    PathBuf,
  /// Directory uploaded images are written under.
  pub media_root:       PathBuf,
  /// Public URL prefix for files under `media_root`.
  pub media_url:        String,
  pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:             "127.0.0.1".to_string(),
      port:             8000,
      database_path:    PathBuf::from("paddock.sqlite3"),
      media_root:       PathBuf::from("media"),
      media_url:        "/media/".to_string(),
      max_upload_bytes: 5 * 1024 * 1024,
    }
  }
}

impl ServerConfig {
  /// Layer the optional TOML file at `path` under the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    let mut cfg: Self = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("PADDOCK"))
      .build()?
      .try_deserialize()?;
    cfg.database_path = expand_tilde(&cfg.database_path);
    cfg.media_root = expand_tilde(&cfg.media_root);
    Ok(cfg)
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
