//! Application-level configuration.
//!
//! - [`DispatchParams`] — per-call deadlines applied by the tool manager

pub mod dispatch_params;

pub use dispatch_params::DispatchParams;
