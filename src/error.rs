// Errors surfaced to the host when reading feeds and config files.
// The frame loop itself never fails: bad markers are skipped and logged.
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid location feed: {0}")]
    Feed(#[from] serde_json::Error),
    #[error("invalid map config: {0}")]
    Config(#[from] toml::de::Error),
}

impl MapError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
