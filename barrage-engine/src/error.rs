//! Load-time error types.
//!
//! Only loading fails with an error; the interpreters themselves treat
//! malformed input as no-ops so stale or forward-versioned scripts degrade
//! instead of aborting a run.

use barrage_common::FormatError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("i/o error reading {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt archive: {0}")]
    CorruptArchive(#[from] FormatError),

    #[error("could not decode image {path}")]
    CorruptImage { path: String },

    #[error("unsupported pixel format index {0}")]
    UnsupportedPixelFormat(u32),

    #[error("gpu upload failed: {0}")]
    GpuUploadFailed(String),

    #[error("no free {0} slot")]
    OutOfSlots(&'static str),
}
