use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the overwrite engine.
///
/// Every variant raised after the first write names the pass (0-based) and,
/// where it applies, the absolute offset of the chunk that failed, so the
/// caller knows which region of the file may be left half-written.
#[derive(Debug, Error)]
pub enum WipeError {
    #[error("failed to open {} for writing: {source}", .path.display())]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to stat {}: {source}", .path.display())]
    StatFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// `path` is `None` when the target is not a named file.
    #[error("{} is empty, nothing to overwrite", target_name(.path))]
    EmptyFile { path: Option<PathBuf> },

    #[error("rule has no passes")]
    EmptyRule,

    /// A fixed pass carries no pattern bytes.
    #[error("pass #{} has an empty pattern", .pass + 1)]
    EmptyPattern { pass: usize },

    #[error("pass #{} has a {len}-byte pattern, at most {max} allowed", .pass + 1)]
    PatternTooLong { pass: usize, len: usize, max: usize },

    #[error("pass #{}: secure random source unavailable: {source}", .pass + 1)]
    EntropyUnavailable {
        pass: usize,
        #[source]
        source: rand::Error,
    },

    #[error("pass #{}: device accepted 0 of {requested} bytes at offset {offset}", .pass + 1)]
    ShortWrite {
        pass: usize,
        offset: u64,
        requested: usize,
    },

    #[error("pass #{}: write at offset {offset} failed: {source}", .pass + 1)]
    WriteFailed {
        pass: usize,
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("pass #{}: flushing to storage failed: {source}", .pass + 1)]
    SyncFailed {
        pass: usize,
        #[source]
        source: io::Error,
    },
}

pub type WipeResult<T> = std::result::Result<T, WipeError>;

fn target_name(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "target".to_string(),
    }
}

impl WipeError {
    /// 0-based index of the pass the failure happened in.
    pub fn pass(&self) -> Option<usize> {
        match self {
            WipeError::EmptyPattern { pass }
            | WipeError::PatternTooLong { pass, .. }
            | WipeError::EntropyUnavailable { pass, .. }
            | WipeError::ShortWrite { pass, .. }
            | WipeError::WriteFailed { pass, .. }
            | WipeError::SyncFailed { pass, .. } => Some(*pass),
            _ => None,
        }
    }

    /// Absolute offset of the chunk being written when the failure happened.
    pub fn offset(&self) -> Option<u64> {
        match self {
            WipeError::ShortWrite { offset, .. } | WipeError::WriteFailed { offset, .. } => {
                Some(*offset)
            }
            _ => None,
        }
    }
}
