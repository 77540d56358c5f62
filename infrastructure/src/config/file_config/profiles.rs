//! Profile configuration from TOML (`[profiles]` section)

use serde::{Deserialize, Serialize};
use toolgate_domain::{ProfileDefinition, ProfileFilter};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProfilesConfig {
    /// Profiles whose tools get registered; empty registers everything
    pub enabled: Vec<String>,
    pub definitions: Vec<ProfileDefinition>,
}

impl FileProfilesConfig {
    pub fn to_filter(&self) -> ProfileFilter {
        ProfileFilter::new(self.enabled.clone(), self.definitions.clone())
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.definitions.iter().any(|d| d.name == name)
    }
}
