//! Core data types shared across berth subsystems.

pub mod project;

pub use project::{Conflict, MetadataUpdate, Project, ProjectDiff, ProjectStatus};
