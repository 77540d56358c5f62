//! Argument templates.
//!
//! A template is literal text with `{{name}}` placeholders. Each template
//! fills exactly one argv slot or one environment value no matter what is
//! substituted into it. Parsing happens once, at configuration time.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;
use crate::security::quote::find_placeholder_end;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    Literal(String),
    Placeholder {
        name: String,
        /// Byte offset of the opening `{{` in the raw template.
        offset: usize,
    },
}

/// A parsed, immutable template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl ArgumentTemplate {
    pub fn parse(raw: impl Into<String>) -> Result<Self, ConfigError> {
        let raw = raw.into();
        let bytes = raw.as_bytes();
        let mut segments = Vec::new();
        let mut literal_start = 0;
        let mut i = 0;

        while i + 1 < bytes.len() {
            if bytes[i] == b'{' && bytes[i + 1] == b'{' {
                let Some(end) = find_placeholder_end(bytes, i + 2) else {
                    return Err(ConfigError::UnclosedPlaceholder { template: raw });
                };
                let name = raw[i + 2..end - 2].trim();
                if name.is_empty() {
                    return Err(ConfigError::EmptyPlaceholder { template: raw });
                }
                if literal_start < i {
                    segments.push(Segment::Literal(raw[literal_start..i].to_string()));
                }
                segments.push(Segment::Placeholder {
                    name: name.to_string(),
                    offset: i,
                });
                i = end;
                literal_start = end;
                continue;
            }
            i += 1;
        }
        if literal_start < raw.len() {
            segments.push(Segment::Literal(raw[literal_start..].to_string()));
        }

        Ok(Self { raw, segments })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// `(name, offset)` for each placeholder in order.
    pub fn placeholders(&self) -> impl Iterator<Item = (&str, usize)> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder { name, offset } => Some((name.as_str(), *offset)),
            Segment::Literal(_) => None,
        })
    }

    pub fn has_placeholders(&self) -> bool {
        self.placeholders().next().is_some()
    }

    /// True when `$NAME` or `${NAME}` appears in the literal text.
    pub fn references_variable(&self, name: &str) -> bool {
        let braced = format!("${{{}}}", name);
        let bare = format!("${}", name);
        self.segments.iter().any(|s| match s {
            Segment::Literal(text) => {
                text.contains(&braced)
                    || text.match_indices(&bare).any(|(i, m)| {
                        !text[i + m.len()..]
                            .starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_')
                    })
            }
            Segment::Placeholder { .. } => false,
        })
    }

    /// Substitute placeholder values. Missing names render as empty.
    pub fn render(&self, values: &HashMap<String, String>) -> String {
        let mut out = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder { name, .. } => {
                    if let Some(v) = values.get(name) {
                        out.push_str(v);
                    }
                }
            }
        }
        out
    }
}
