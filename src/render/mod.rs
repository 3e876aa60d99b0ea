//! Rendering module for writing pipeline results.

mod json;

pub use json::{to_json, write_json, JsonFormat};
