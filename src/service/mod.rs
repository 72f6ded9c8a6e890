//! Query service module
//!
//! Turns request parameters into a filter and runs it on the active backend.

mod executor;

pub use executor::QueryService;
