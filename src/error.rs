//! Error taxonomy for the ShaDa persistence core.
//!
//! Mirrors the error kinds spelled out in the format's design: a `NotShaDa`
//! framing violation aborts the current read outright, a `ReadError` is a
//! plain I/O failure, and write-side failures either fall back to a safe
//! no-rename completion (`IgnorableWrite`) or abort the whole write
//! (`NotWritable`, `TempExhausted`). Numeric codes match the ones the format
//! surfaces to users so a message from this crate can be cross-referenced
//! against the original tool's documentation.

use thiserror::Error;

use crate::msgpack::CodecError;

/// Top-level error type returned by the reader and writer drivers.
///
/// Record-level problems (a single malformed record) never reach this type —
/// see [`crate::reader::ReadStatus::Malformed`] — only failures that abort
/// the whole read or write surface here.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ShadaError {
    /// The input is not a ShaDa file (bad first record, truncated header).
    #[error("E575: {0}")]
    NotShaDa(String),

    /// I/O failure while reading.
    #[error("E576: {0}")]
    ReadError(String),

    /// A value could not be serialized for writing (cyclic container,
    /// unserializable value kind). The record is skipped; the write
    /// continues.
    #[error("E574: {0}")]
    IgnorableWrite(String),

    /// The write target exists but is not owned/writable by the caller.
    #[error("E137: ShaDa file is not writable: {0}")]
    NotWritable(String),

    /// Every `target.tmp.a`..`target.tmp.z` candidate is already taken.
    #[error("E138: All {0}.tmp.[a-z] files exist, cannot write ShaDa file")]
    TempExhausted(String),

    /// Renaming the temp file over the target failed.
    #[error("E136: Cannot rename ShaDa file to {0}: {1}")]
    RenameFailed(String, String),

    /// Underlying I/O failure not covered by a more specific variant.
    #[error("E886: {0}")]
    System(#[from] std::io::Error),

    /// Framing/record codec failure.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}
