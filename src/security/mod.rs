//! Security module
//!
//! Path validation for stored evidence files

pub mod path_validation;

pub use path_validation::{sanitize_file_name, validate_file_path};
