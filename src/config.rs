//! Run configuration, loaded from a TOML file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConsensusError;
use crate::Result;

fn default_prefix() -> String {
    "vkgl_".to_string()
}

fn default_history_file() -> String {
    "vkgl_history.tsv".to_string()
}

/// Configuration for one consensus run.
///
/// Lab order is significant: it decides single-lab resolution and the column
/// order of the consensus table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Lab identifiers, in resolution and column order.
    pub labs: Vec<String>,
    /// Filename prefix of the per-lab tables.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Prior export tags (`yymm`), oldest first.
    #[serde(default)]
    pub previous: Vec<String>,
    /// Name of the history table file under the input directory.
    #[serde(default = "default_history_file")]
    pub history_file: String,
    /// Directory holding the lab and history tables.
    pub input: PathBuf,
    /// Directory the consensus table and reports are written to.
    pub output: PathBuf,
}

impl RunConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<RunConfig> {
        let text = fs::read_to_string(path).map_err(|err| {
            ConsensusError::config(format!("cannot read {}: {err}", path.display()))
        })?;
        let config: RunConfig = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line directory overrides on top of the file values.
    pub fn with_overrides(mut self, input: Option<PathBuf>, output: Option<PathBuf>) -> Self {
        if let Some(input) = input {
            self.input = input;
        }
        if let Some(output) = output {
            self.output = output;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.labs.is_empty() {
            return Err(ConsensusError::config("at least one lab must be configured"));
        }
        let mut seen = std::collections::HashSet::new();
        for lab in &self.labs {
            if !seen.insert(lab) {
                return Err(ConsensusError::config(format!("duplicate lab '{lab}'")));
            }
        }
        Ok(())
    }
}
