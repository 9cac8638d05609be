//! JSON flattening - collapse nested JSON into a single-level attribute map
//!
//! Object keys are joined into dotted paths below a root prefix. Arrays are
//! never expanded: each one is stored whole as its compact JSON text, so a
//! large array costs one attribute and indices never show up in paths.

pub mod engine;
pub mod types;

pub use engine::{flatten, FlattenEngine};
pub use types::{FlatMap, FlatValue, FlattenConfig, DEFAULT_PREFIX};
