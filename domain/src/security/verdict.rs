//! Validation verdicts and rejection categories.
//!
//! Every rejection carries a `detail` string that begins with a fixed
//! category phrase (see [`RejectKind::category`]). Operators and callers
//! classify failures by substring containment on that phrase, so the
//! phrases are part of the public contract.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::command::InterpreterKind;

/// Category of a rejected substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectKind {
    ControlCharacter,
    PathTraversal,
    AbsolutePath,
    SensitiveFile,
    ArgumentInjection,
    Ssrf,
    ShellInjection,
    InterpreterInjection(InterpreterKind),
    EnvironmentInjection,
    SecurityRisk,
}

impl RejectKind {
    /// The fixed phrase every detail string of this kind starts with.
    pub fn category(&self) -> String {
        match self {
            RejectKind::ControlCharacter => "control character detected".to_string(),
            RejectKind::PathTraversal => "path traversal attempt detected".to_string(),
            RejectKind::AbsolutePath => "absolute path detected".to_string(),
            RejectKind::SensitiveFile => "sensitive file access blocked".to_string(),
            RejectKind::ArgumentInjection => "argument injection detected".to_string(),
            RejectKind::Ssrf => "SSRF attempt blocked".to_string(),
            RejectKind::ShellInjection => "shell injection detected".to_string(),
            RejectKind::InterpreterInjection(kind) => {
                format!("{} interpolation injection detected", kind.language())
            }
            RejectKind::EnvironmentInjection => {
                "environment variable injection detected".to_string()
            }
            RejectKind::SecurityRisk => "security risk".to_string(),
        }
    }
}

/// A rejected substitution.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{detail}")]
pub struct Rejection {
    pub kind: RejectKind,
    pub detail: String,
}

impl Rejection {
    /// Build a rejection whose detail is `"<category>: <reason>"`.
    pub fn new(kind: RejectKind, reason: impl AsRef<str>) -> Self {
        let reason = reason.as_ref();
        let detail = if reason.is_empty() {
            kind.category()
        } else {
            format!("{}: {}", kind.category(), reason)
        };
        Self { kind, detail }
    }

    /// Append the parameter name the rejection was raised for.
    pub fn for_parameter(mut self, param: &str) -> Self {
        self.detail = format!("{} (parameter '{}')", self.detail, param);
        self
    }
}

/// Outcome of validating one substitution.
///
/// A single `Reject` aborts the whole invocation; there is no partial allow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Reject(Rejection),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Verdict::Allow => None,
            Verdict::Reject(r) => Some(r),
        }
    }

    pub fn into_result(self) -> Result<(), Rejection> {
        match self {
            Verdict::Allow => Ok(()),
            Verdict::Reject(r) => Err(r),
        }
    }
}

impl From<Result<(), Rejection>> for Verdict {
    fn from(result: Result<(), Rejection>) -> Self {
        match result {
            Ok(()) => Verdict::Allow,
            Err(r) => Verdict::Reject(r),
        }
    }
}
