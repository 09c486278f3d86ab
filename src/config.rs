use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ShortlistConfig {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub presentation: PresentationConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

/// Where the catalog lives on disk. Relative paths resolve against the
/// working directory.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CatalogConfig {
    pub embeddings_path: String,
    pub metadata_path: String,
    /// Source table for `shortlist build`.
    pub csv_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
    pub batch_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Used when a request does not say how many results it wants.
    pub default_top_k: usize,
    /// Largest `top_k` a request may ask for.
    pub max_top_k: usize,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct PresentationConfig {
    pub style: PresentationStyle,
}

/// How `shortlist recommend` prints results.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PresentationStyle {
    #[default]
    Table,
    Cards,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
            log_level: "info".into(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            embeddings_path: "data/catalog_embeddings.npy".into(),
            metadata_path: "data/catalog_meta.json".into(),
            csv_path: "data/shl_catalog.csv".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_shortlist_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
            batch_size: 32,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            max_top_k: 10,
        }
    }
}

/// Returns `~/.shortlist/`, or `./.shortlist/` when there is no home directory.
pub fn default_shortlist_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".shortlist")
}

/// Returns the default config file path: `~/.shortlist/config.toml`
pub fn default_config_path() -> PathBuf {
    default_shortlist_dir().join("config.toml")
}

impl ShortlistConfig {
    /// Load config from the default TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            ShortlistConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply SHORTLIST_EMBEDDINGS, SHORTLIST_METADATA, SHORTLIST_LOG_LEVEL, SHORTLIST_PORT.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SHORTLIST_EMBEDDINGS") {
            self.catalog.embeddings_path = val;
        }
        if let Ok(val) = std::env::var("SHORTLIST_METADATA") {
            self.catalog.metadata_path = val;
        }
        if let Ok(val) = std::env::var("SHORTLIST_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("SHORTLIST_PORT") {
            match val.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!(value = %val, "ignoring invalid SHORTLIST_PORT"),
            }
        }
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.retrieval.max_top_k >= 1,
            "retrieval.max_top_k must be at least 1"
        );
        anyhow::ensure!(
            (1..=self.retrieval.max_top_k).contains(&self.retrieval.default_top_k),
            "retrieval.default_top_k must be between 1 and {}",
            self.retrieval.max_top_k
        );
        anyhow::ensure!(
            self.embedding.batch_size >= 1,
            "embedding.batch_size must be at least 1"
        );
        Ok(())
    }

    pub fn resolved_embeddings_path(&self) -> PathBuf {
        expand_tilde(&self.catalog.embeddings_path)
    }

    pub fn resolved_metadata_path(&self) -> PathBuf {
        expand_tilde(&self.catalog.metadata_path)
    }

    pub fn resolved_csv_path(&self) -> PathBuf {
        expand_tilde(&self.catalog.csv_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
