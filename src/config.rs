use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// What to do with a lease or address entry whose values fail to decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// End the record stream with the decode error.
    #[default]
    Fail,
    /// Drop the entry, log a warning and continue with the next block.
    Skip,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub on_malformed: MalformedPolicy,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn skipping_malformed() -> Self {
        Self {
            on_malformed: MalformedPolicy::Skip,
        }
    }
}
