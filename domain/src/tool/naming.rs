//! Tool and service identifiers.
//!
//! Exposed tool names are `<service>.<tool>` where both halves are
//! sanitized to `[A-Za-z0-9_-]`. A name that had to be changed, or that was
//! too long, gets a short hash of the original appended so two different
//! inputs never collapse onto the same identifier.

use sha2::{Digest, Sha256};

use crate::core::error::ConfigError;

/// Separator between the service and tool halves of an exposed name.
pub const SERVICE_SEPARATOR: char = '.';

const MAX_PREFIX_LEN: usize = 53;
const HASH_LEN: usize = 8;

fn is_id_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

/// Sanitize one identifier.
pub fn sanitize_id(id: &str) -> Result<String, ConfigError> {
    if id.is_empty() {
        return Err(ConfigError::EmptyId);
    }

    let mut prefix: String = id
        .bytes()
        .filter(|b| is_id_byte(*b))
        .map(char::from)
        .collect();

    let needs_hash = prefix.len() != id.len() || prefix.len() > MAX_PREFIX_LEN;
    prefix.truncate(MAX_PREFIX_LEN);

    if !needs_hash {
        return Ok(prefix);
    }
    if prefix.is_empty() {
        prefix.push_str("id");
    }
    let digest = hex::encode(Sha256::digest(id.as_bytes()));
    Ok(format!("{}_{}", prefix, &digest[..HASH_LEN]))
}

/// Split an exposed name into its service and tool halves.
///
/// Only the first separator splits; a name without one has no service.
pub fn parse_tool_name(name: &str) -> (Option<&str>, &str) {
    match name.split_once(SERVICE_SEPARATOR) {
        Some((service, tool)) => (Some(service), tool),
        None => (None, name),
    }
}

/// The name a tool is reachable under.
pub fn exposed_name(service_id: Option<&str>, tool_name: &str) -> Result<String, ConfigError> {
    let tool = sanitize_id(tool_name)?;
    match service_id {
        Some(service) => Ok(format!(
            "{}{}{}",
            sanitize_id(service)?,
            SERVICE_SEPARATOR,
            tool
        )),
        None => Ok(tool),
    }
}
