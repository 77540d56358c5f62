//! Core types shared across the domain.
//!
//! - [`error::ConfigError`] — static configuration errors
//! - [`string::truncate`] — UTF-8 safe preview truncation

pub mod error;
pub mod string;
