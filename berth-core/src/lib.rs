//! berth core library
//!
//! Project registry, port allocation, compose port extraction, and
//! reconciliation for the berth local development manager.

pub mod allocator;
pub mod compose;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod paths;
pub mod reconcile;
pub mod registry;
pub mod types;

// Re-export commonly used items
pub use allocator::{PortAllocator, PortRange};
pub use config::Config;
pub use error::{BerthError, Result};
pub use lifecycle::{Lifecycle, ProcessProbe, StaticProbe};
pub use registry::RegistryStore;
pub use types::{Conflict, MetadataUpdate, Project, ProjectDiff, ProjectStatus};
