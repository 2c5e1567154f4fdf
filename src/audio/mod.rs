//! Dynamically loaded audio engine.
//!
//! This module hosts the SunVox engine as a black box. It provides:
//! - The engine contract (`backend`) and its `libloading` implementation
//! - Owned handle/session/slot resources that release in reverse order
//! - A one-shot lifecycle runner used by every command

pub mod backend;
pub mod engine;
pub mod error;
pub mod library;
pub mod lifecycle;
#[cfg(test)]
pub(crate) mod mock;
pub mod params;
pub mod song;

pub use backend::{EngineBackend, EngineLoader};
pub use engine::{EngineHandle, EngineSession, PlaybackSlot, MAX_VOLUME};
pub use error::{InitializationError, LoadError, SlotError};
pub use library::{LibraryLoader, SunVoxLibrary};
pub use lifecycle::{run_session, SessionOutcome, DEFAULT_SLOT};
pub use params::{
    EngineVersion, InitFlags, InitParams, ModuleFlags, DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE,
};
pub use song::{decode_xy, ControllerInfo, ModuleInfo, PatternInfo};
