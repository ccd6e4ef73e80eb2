//! Accessor Metadata Definitions
//!
//! This crate contains the metadata consumed by the fast accessor compiler:
//! class declarations (properties, inheritance, embedded value objects) and
//! per-record field mappings describing where each field is stored.
//! It provides pure data structures without any compilation logic.

pub mod mapping;
pub mod types;

// Re-export commonly used types at the crate root
pub use mapping::*;
pub use types::*;
