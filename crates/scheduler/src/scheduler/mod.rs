//! Identifier-keyed scheduler over the indexed heap.
//!
//! Split into focused submodules:
//! - `core`: Scheduler struct, constructors, accessors, and invariant checks
//! - `operations`: add / change_priority / get_next / remove and friends

mod core;
mod operations;

pub use self::core::Scheduler;
pub use self::operations::Drain;
