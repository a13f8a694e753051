//! Filesystem helpers for downloaded files.
//!
//! Remote bots pick the filename, so nothing about it can be trusted:
//! [`sanitize_filename`] maps arbitrary input to a filesystem-safe ASCII
//! name, and [`unique_path`] picks a non-colliding path in the output
//! directory.

mod sanitize;
mod unique;

pub use sanitize::sanitize_filename;
pub use unique::unique_path;
