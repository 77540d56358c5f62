//! Tool registry and dispatch.
//!
//! - [`ToolManager`] — name resolution, health gate, hook and middleware chain
//! - [`ServiceInfo`] — per-service health, deadline and hooks
//! - [`PolicyHook`] — regex call policies compiled into a pre-call hook
//! - [`suggest`] — "did you mean" for unknown names

pub mod manager;
pub mod policy;
pub mod service;
pub mod suggest;

pub use manager::ToolManager;
pub use policy::{CallPolicy, PolicyHook, PolicyRule};
pub use service::ServiceInfo;
pub use suggest::suggest;
