//! Command-line argument security.
//!
//! Decides, before any process is spawned, whether a caller-supplied value
//! may be substituted into a configured command template.
//!
//! ```text
//! template ──▶ quote::scan_to ──────┐
//!                                   ├──▶ SubstitutionSite ──▶ InjectionValidator ──▶ Verdict
//! command + args ──▶ command::classify_invocation ┘                  │
//!                                                          url::UrlSafetyOracle
//! ```
//!
//! Output leaving a tool goes through [`env::SecretRedactor`].
//!
//! Everything here is pure: the static rule tables are built once and only
//! read afterwards, and no check performs I/O.

pub mod command;
pub mod env;
pub mod interpreter;
pub mod path;
pub mod quote;
mod tables;
pub mod url;
pub mod validator;
pub mod verdict;

pub use command::{CommandProfile, InterpreterKind, Invocation, classify, classify_invocation, normalize};
pub use env::{
    REDACTED, SecretRedactor, check_env_name, is_dangerous_env_name, is_valid_env_name, redact,
    validate_env_value,
    validate_forwarded_env_value,
};
pub use quote::{QuoteContext, QuoteScan, locate_context, scan_to};
pub use url::{SsrfPolicy, StaticUrlOracle, UrlSafetyOracle, url_candidate};
pub use validator::{ExecutionTarget, InjectionValidator, ParamRole, SubstitutionSite};
pub use verdict::{RejectKind, Rejection, Verdict};
