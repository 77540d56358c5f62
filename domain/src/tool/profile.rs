//! Profile-based tool filtering.
//!
//! With no profile enabled every tool is registered. Otherwise a tool is
//! registered when it is explicitly assigned to an enabled profile, or when
//! an enabled profile's selector matches it.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::entities::ToolDefinition;

/// Matches tools by tag and by annotation.
///
/// A selector with neither tags nor properties matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileSelector {
    /// Any overlap with the tool's tags matches.
    pub tags: Vec<String>,
    /// Every entry must equal the tool's annotation of the same key.
    pub tool_properties: BTreeMap<String, bool>,
}

impl ProfileSelector {
    pub fn matches(&self, tool: &ToolDefinition) -> bool {
        let has_tags = !self.tags.is_empty();
        if has_tags && !self.tags.iter().any(|t| tool.tags.contains(t)) {
            return false;
        }
        let has_props = !self.tool_properties.is_empty();
        if has_props
            && !self
                .tool_properties
                .iter()
                .all(|(key, want)| tool.annotations.get(key) == Some(*want))
        {
            return false;
        }
        has_tags || has_props
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDefinition {
    pub name: String,
    #[serde(default, flatten)]
    pub selector: ProfileSelector,
}

/// Enabled profiles plus their definitions.
#[derive(Debug, Clone, Default)]
pub struct ProfileFilter {
    enabled: Vec<String>,
    definitions: HashMap<String, ProfileDefinition>,
}

impl ProfileFilter {
    pub fn new(enabled: Vec<String>, definitions: Vec<ProfileDefinition>) -> Self {
        Self {
            enabled,
            definitions: definitions
                .into_iter()
                .map(|d| (d.name.clone(), d))
                .collect(),
        }
    }

    pub fn enabled(&self) -> &[String] {
        &self.enabled
    }

    pub fn allows(&self, tool: &ToolDefinition) -> bool {
        if self.enabled.is_empty() {
            return true;
        }
        self.enabled.iter().any(|profile| {
            tool.profiles.contains(profile)
                || self
                    .definitions
                    .get(profile)
                    .is_some_and(|d| d.selector.matches(tool))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::entities::ToolAnnotations;

    fn read_tool() -> ToolDefinition {
        ToolDefinition::new("read", "Read")
            .with_tag("fs")
            .with_annotations(ToolAnnotations {
                read_only: true,
                ..Default::default()
            })
    }

    fn profile(name: &str, tags: &[&str], props: &[(&str, bool)]) -> ProfileDefinition {
        ProfileDefinition {
            name: name.to_string(),
            selector: ProfileSelector {
                tags: tags.iter().map(|t| t.to_string()).collect(),
                tool_properties: props.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            },
        }
    }

    #[test]
    fn test_no_profiles_allows_everything() {
        assert!(ProfileFilter::default().allows(&read_tool()));
    }

    #[test]
    fn test_explicit_assignment() {
        let filter = ProfileFilter::new(vec!["dev".to_string()], vec![]);
        assert!(filter.allows(&read_tool().with_profile("dev")));
        assert!(!filter.allows(&read_tool()));
    }

    #[test]
    fn test_tag_selector() {
        let filter = ProfileFilter::new(vec!["files".to_string()], vec![profile("files", &["fs"], &[])]);
        assert!(filter.allows(&read_tool()));
        assert!(!filter.allows(&ToolDefinition::new("x", "x").with_tag("net")));
    }

    #[test]
    fn test_property_selector() {
        let filter = ProfileFilter::new(
            vec!["safe".to_string()],
            vec![profile("safe", &[], &[("read_only", true)])],
        );
        assert!(filter.allows(&read_tool()));
        assert!(!filter.allows(&ToolDefinition::new("rm", "Remove")));

        let unknown = ProfileFilter::new(
            vec!["odd".to_string()],
            vec![profile("odd", &[], &[("fast", true)])],
        );
        assert!(!unknown.allows(&read_tool()));
    }

    #[test]
    fn test_empty_selector_matches_nothing() {
        let filter = ProfileFilter::new(vec!["p".to_string()], vec![profile("p", &[], &[])]);
        assert!(!filter.allows(&read_tool()));
    }
}
