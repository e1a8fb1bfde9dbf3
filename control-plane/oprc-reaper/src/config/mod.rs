mod types;

pub use types::*;

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::resource::ResourceDescriptor;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("reading resources file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing resources file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Load the ordered resource list from a YAML file.
pub async fn load_resources(
    path: impl AsRef<Path>,
) -> Result<Vec<ResourceDescriptor>, ConfigError> {
    let path = path.as_ref();
    let content =
        fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
    parse_resources(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse_resources(
    content: &str,
) -> Result<Vec<ResourceDescriptor>, serde_yaml::Error> {
    serde_yaml::from_str(content)
}
