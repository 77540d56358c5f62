//! Audit log configuration from TOML (`[audit]` section)

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAuditConfig {
    pub enabled: bool,
    /// JSONL file; defaults to the user data directory
    pub path: Option<PathBuf>,
}

impl FileAuditConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|d| d.join("toolgate").join("audit.jsonl"))
                .unwrap_or_else(|| PathBuf::from("toolgate-audit.jsonl"))
        })
    }
}
