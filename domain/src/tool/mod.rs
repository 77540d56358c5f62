//! Tool domain module
//!
//! Pure definitions for the registry side of the system: what a tool is,
//! how it is named, how a call is described and what can go wrong.
//!
//! ```text
//! ┌────────────────┐    ┌──────────────────┐    ┌──────────────┐
//! │ ToolDefinition │───▶│ ExecutionRequest │───▶│ ToolOutput   │
//! │ (registry)     │    │ (invocation)     │    │ / ToolError  │
//! └───────┬────────┘    └──────────────────┘    └──────────────┘
//!         │
//!         ├─ naming:   "git" + "status" → "git.status"
//!         └─ profiles: tags / annotations → registered or skipped
//! ```
//!
//! # Key Types
//!
//! - [`ToolDefinition`] — schema for a single tool (name, service, params, tags)
//! - [`ExecutionRequest`] — one call, replaceable by pre-call hooks
//! - [`ArgumentTemplate`] — parsed `{{name}}` template for one argv slot
//! - [`ToolError`] — dispatch error taxonomy with stable codes
//! - [`ProfileFilter`] — which tools are registered at all
//!
//! # Architecture
//!
//! - **Domain** (this module): pure definitions, no I/O
//! - **Application** (`Tool`, `ToolManager`): ports and dispatch
//! - **Infrastructure** (`CommandTool`): concrete command execution

pub mod entities;
pub mod naming;
pub mod profile;
pub mod template;
pub mod traits;
pub mod value_objects;

pub use entities::{ExecutionRequest, ToolAnnotations, ToolDefinition, ToolParameter};
pub use naming::{exposed_name, parse_tool_name, sanitize_id};
pub use profile::{ProfileDefinition, ProfileFilter, ProfileSelector};
pub use template::{ArgumentTemplate, Segment};
pub use traits::{DefaultToolValidator, ToolValidator};
pub use value_objects::{OutputMetadata, ToolError, ToolOutput};
