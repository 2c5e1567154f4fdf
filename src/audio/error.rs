//! Error types for the engine lifecycle.
//!
//! Only [`LoadError`] is fatal to a run. [`InitializationError`] and
//! [`SlotError`] are reported to the caller while the lifecycle still
//! releases everything acquired so far.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to acquire (or release) the engine library.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The loader was given nothing to try.
    #[error("no engine library candidates configured")]
    NoCandidates,

    /// None of the candidate paths could be opened.
    #[error("engine library not found (tried: {})", display_paths(.tried))]
    NotFound {
        tried: Vec<PathBuf>,
        #[source]
        source: libloading::Error,
    },

    /// The library opened but an entry point is missing.
    #[error("engine library {} has no symbol `{symbol}`", .path.display())]
    MissingSymbol {
        path: PathBuf,
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },

    /// The library could not be closed cleanly.
    #[error("failed to unload engine library")]
    Unload(#[source] libloading::Error),
}

/// The engine refused to initialize.
#[derive(Debug, Error)]
pub enum InitializationError {
    /// `sv_init` returned a negative status.
    #[error("engine initialization failed with code {code}")]
    Rejected { code: i32 },

    /// A numeric parameter does not fit the engine's `int`.
    #[error("{name} {value} is out of range for the engine")]
    OutOfRange { name: &'static str, value: u32 },

    /// The configuration string cannot be passed across the C boundary.
    #[error("engine configuration string contains a NUL byte")]
    InvalidConfig,
}

/// A slot operation reported failure.
#[derive(Debug, Error)]
pub enum SlotError {
    /// The engine returned a negative status for `op`.
    #[error("slot {slot}: {op} failed with code {code}")]
    Engine {
        slot: i32,
        op: &'static str,
        code: i32,
    },

    /// The song path cannot be passed across the C boundary: it contains a
    /// NUL byte, or is not UTF-8 on a platform that needs it to be.
    #[error("song path cannot be passed to the engine: {}", .0.display())]
    InvalidPath(PathBuf),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
