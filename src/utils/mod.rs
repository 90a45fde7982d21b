//! Utility functions

pub mod cover_art;
pub mod quiet_log;
mod sanitize;
pub mod tags;

pub use quiet_log::{unless_quiet, QuietGuard};
pub use sanitize::{clean_dir_name, clean_filename};
pub use tags::{Id3TagWriter, TagWriter};
