//! Transaction records returned to callers
//!
//! The transactions table/collection is owned elsewhere, so records are a
//! loosely typed, insertion-ordered map rather than a fixed struct.

mod record;

pub use record::*;
