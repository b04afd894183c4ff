//! Task module - the ill-posed tasks and the registry that holds them.
//!
//! The registry is built once at startup and shared read-only; nothing here
//! is mutated after construction.

mod definition;
mod registry;

pub use definition::{RuleSpec, TaskDefinition};
pub use registry::{TaskRegistry, TaskRegistryError};
