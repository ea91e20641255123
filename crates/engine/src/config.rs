use serde::Deserialize;

use crate::error::SyncError;
use crate::model::PartitionId;

/// Engine configuration.
///
/// All fields have defaults so an empty TOML document is a valid config.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Partition new leads are created in.
    #[serde(default = "default_partition")]
    pub partition_id: PartitionId,
    /// Leads per submitted chunk; the platform responds per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Field used for duplicate lookup and the post-upsert re-fetch.
    #[serde(default = "default_key_field")]
    pub key_field: String,
    /// When true, ambiguous-duplicate skips are resolved by updating the
    /// most recently modified existing match.
    #[serde(default)]
    pub update_most_recent_match: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            partition_id: default_partition(),
            chunk_size: default_chunk_size(),
            key_field: default_key_field(),
            update_most_recent_match: false,
        }
    }
}

fn default_partition() -> PartitionId {
    1
}

fn default_chunk_size() -> usize {
    300
}

fn default_key_field() -> String {
    "email".into()
}

impl SyncConfig {
    pub fn from_toml(input: &str) -> Result<Self, SyncError> {
        let config: SyncConfig =
            toml::from_str(input).map_err(|e| SyncError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        if self.chunk_size == 0 {
            return Err(SyncError::ConfigValidation(
                "chunk_size must be at least 1".into(),
            ));
        }
        if self.key_field.is_empty() {
            return Err(SyncError::ConfigValidation(
                "key_field must not be empty".into(),
            ));
        }
        Ok(())
    }
}
