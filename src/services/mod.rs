//! Output services: image encoding and archive packaging

pub mod archive;
pub mod format;

pub use archive::{sanitize_filename, ArchiveBuilder, TIMESTAMP_FORMAT};
pub use format::OutputEncoder;
