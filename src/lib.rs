//! sunvox-host - A minimal host for the SunVox synthesis engine.
//!
//! This library loads the engine at runtime and drives its session
//! lifecycle; the commands used by the binary live in [`commands`].

pub mod audio;
pub mod commands;

// Re-export commonly used types
pub use audio::{
    run_session, EngineHandle, EngineLoader, EngineVersion, InitFlags, InitParams, LibraryLoader,
    LoadError, SessionOutcome,
};
pub use commands::{PlayOptions, SongInfo};
