//! Error type shared by the resolver, the host loader and the renderer

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while reading a config tree or writing the flattened file.
///
/// Malformed lines and include cycles are not errors: the scanner skips the
/// former and the traversal skips the latter.
#[derive(Debug, Error)]
pub enum Error {
    /// A declared or included config file could not be read
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The destination file could not be created or written
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An include directive holds an invalid glob pattern
    #[error("invalid include pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// A directory could not be read while expanding an include pattern
    #[error("failed to expand include pattern: {source}")]
    Glob {
        #[from]
        source: glob::GlobError,
    },

    /// The provenance map could not be encoded as JSON
    #[error("failed to encode provenance: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
