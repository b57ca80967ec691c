//! Subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod extract;
pub mod sync;
pub mod validate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use docket_core::models::config::DocketConfig;
use docket_core::models::document::DocumentType;
use docket_core::store::{InMemoryStore, StoreSnapshot};

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docket")
        .join("config.json")
}

/// Load the configuration from `--config`, else the default path when it
/// exists, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<DocketConfig> {
    let config = match config_path {
        Some(path) => DocketConfig::from_file(Path::new(path))?,
        None => {
            let default_path = default_config_path();
            if default_path.exists() {
                DocketConfig::from_file(&default_path)?
            } else {
                DocketConfig::default()
            }
        }
    };
    Ok(config)
}

/// Open a JSON store snapshot.
pub fn open_store(path: &Path) -> anyhow::Result<Arc<InMemoryStore>> {
    if !path.exists() {
        anyhow::bail!("Store file not found: {}", path.display());
    }
    let snapshot = StoreSnapshot::from_file(path)?;
    debug!(
        "Loaded store with {} shipments and {} documents",
        snapshot.shipments.len(),
        snapshot.documents.len()
    );
    Ok(Arc::new(InMemoryStore::from_snapshot(snapshot)))
}

/// Write the store back to its snapshot file.
pub async fn save_store(store: &InMemoryStore, path: &Path) -> anyhow::Result<()> {
    store.snapshot().await.save(path)?;
    debug!("Saved store to {}", path.display());
    Ok(())
}

/// Parse a `--type` argument.
pub fn parse_document_type(value: &str) -> Result<DocumentType, String> {
    DocumentType::from_str(value).ok_or_else(|| {
        let known: Vec<&str> = DocumentType::ALL.iter().map(|t| t.as_str()).collect();
        format!("unknown document type '{}' (expected one of: {})", value, known.join(", "))
    })
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}
