//! Core data model for Grove.
//!
//! This crate defines the vocabulary every other Grove crate speaks:
//!
//! - [`Subscript`]: one typed element of a tree address
//! - [`Value`]: the scalar stored at a node
//! - [`Path`]: an ordered sequence of subscripts from a global's root
//! - [`Error`] / [`Result`]: the shared error taxonomy
//! - [`Config`]: the flat key/value configuration file
//!
//! Global names are plain strings carrying a leading `^`; normalization
//! helpers live here so every layer agrees on the storage key form.

pub mod config;
pub mod error;
pub mod path;
pub mod subscript;
pub mod value;

pub use config::Config;
pub use error::{Error, Result};
pub use path::Path;
pub use subscript::Subscript;
pub use value::Value;

/// Normalize a global name to its storage form (leading `^`).
pub fn normalize_global_name(name: &str) -> String {
    if name.starts_with('^') {
        name.to_string()
    } else {
        format!("^{}", name)
    }
}

/// Whether `name` is shaped like a session-local variable: no leading `^`,
/// an ASCII identifier (`[A-Za-z_][A-Za-z0-9_]*`).
pub fn is_local_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
