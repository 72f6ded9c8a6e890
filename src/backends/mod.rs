//! Storage backend module
//!
//! Defines the TransactionBackend trait and the two adapters behind it.

mod loader;
mod traits;

pub mod document;
pub mod relational;

#[cfg(test)]
mod equivalence_tests;
#[cfg(test)]
pub(crate) mod fake;

pub use document::DocumentBackend;
pub use loader::BackendLoader;
pub use relational::RelationalBackend;
pub use traits::*;
