//! Deterministic JSON serialization for files on disk.
//!
//! Keeps stored files stable between writes by:
//! - Sorting object keys alphabetically (via `BTreeMap` in the stored types)
//! - Using 2-space indentation
//! - Adding trailing newline

mod json;

pub use json::*;
