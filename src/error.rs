//! Error types for the persistence and export boundary.
//!
//! Editing operations never fail; they degrade to no-ops. Only loading, saving
//! and exporting a drawing can produce an error.

use std::io;
use thiserror::Error;

/// Errors that can occur while moving a drawing across the persistence boundary.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The raster export pipeline failed.
    #[error("Export failed: {0}")]
    Export(String),
}
