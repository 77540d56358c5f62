//! Hooks backed by external services.

mod webhook;

pub use webhook::{WebhookHook, WebhookResponse, WebhookStatus};
