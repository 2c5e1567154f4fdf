//! The black-box engine contract.
//!
//! [`EngineLoader`] is the single "dynamic loading" capability: it produces a
//! loaded [`EngineBackend`] or a [`LoadError`]. The backend mirrors the raw
//! C entry points one to one, status codes included. Everything above this
//! module works against these traits and never sees the platform loader.

use super::error::LoadError;
use std::ffi::CStr;

/// Acquires a loaded engine.
pub trait EngineLoader {
    type Backend: EngineBackend;

    /// Locates the engine library and resolves its entry points.
    fn acquire(&self) -> Result<Self::Backend, LoadError>;
}

/// Raw engine entry points. Negative return values are engine errors.
///
/// Callers are expected to go through [`EngineHandle`](super::EngineHandle),
/// which enforces the init/open/close/deinit ordering.
pub trait EngineBackend {
    /// `sv_init`. Returns the packed engine version, or a negative code.
    fn init(&mut self, config: Option<&CStr>, sample_rate: i32, channels: i32, flags: u32)
        -> i32;
    fn deinit(&mut self) -> i32;
    /// Actual output sample rate; may differ from the requested one.
    fn sample_rate(&self) -> i32;

    fn open_slot(&mut self, slot: i32) -> i32;
    fn close_slot(&mut self, slot: i32) -> i32;

    fn load(&mut self, slot: i32, path: &CStr) -> i32;
    fn play(&mut self, slot: i32) -> i32;
    fn play_from_beginning(&mut self, slot: i32) -> i32;
    fn stop(&mut self, slot: i32) -> i32;
    fn rewind(&mut self, slot: i32, line: i32) -> i32;
    /// Sets the volume and returns the previous one. `-1` only reads.
    fn volume(&mut self, slot: i32, volume: i32) -> i32;
    fn set_autostop(&mut self, slot: i32, autostop: bool) -> i32;
    fn autostop(&self, slot: i32) -> i32;
    /// 1 once playback has reached the end of the song.
    fn end_of_song(&self, slot: i32) -> i32;
    fn current_line(&self, slot: i32) -> i32;

    fn song_name(&self, slot: i32) -> Option<String>;
    fn song_bpm(&self, slot: i32) -> i32;
    fn song_tpl(&self, slot: i32) -> i32;
    fn song_length_frames(&self, slot: i32) -> u32;
    fn song_length_lines(&self, slot: i32) -> u32;
    fn module_count(&self, slot: i32) -> i32;
    fn pattern_count(&self, slot: i32) -> i32;

    /// Raw flag word; see [`ModuleFlags`](super::ModuleFlags).
    fn module_flags(&self, slot: i32, module: i32) -> u32;
    fn module_name(&self, slot: i32, module: i32) -> Option<String>;
    fn module_type(&self, slot: i32, module: i32) -> Option<String>;
    /// Packed position: x in the low 16 bits, y in the high 16, both signed.
    fn module_xy(&self, slot: i32, module: i32) -> u32;
    /// `0xBBGGRR`.
    fn module_color(&self, slot: i32, module: i32) -> i32;
    /// Connected input modules. Empty link slots are left out.
    fn module_inputs(&self, slot: i32, module: i32) -> Vec<i32>;
    /// Connected output modules. Empty link slots are left out.
    fn module_outputs(&self, slot: i32, module: i32) -> Vec<i32>;
    fn module_ctl_count(&self, slot: i32, module: i32) -> i32;
    fn module_ctl_name(&self, slot: i32, module: i32, ctl: i32) -> Option<String>;
    /// `scaled`: 0 raw, 1 scaled for the UI, 2 as displayed.
    fn module_ctl_value(&self, slot: i32, module: i32, ctl: i32, scaled: i32) -> i32;
    fn module_ctl_min(&self, slot: i32, module: i32, ctl: i32, scaled: i32) -> i32;
    fn module_ctl_max(&self, slot: i32, module: i32, ctl: i32, scaled: i32) -> i32;

    fn pattern_name(&self, slot: i32, pattern: i32) -> Option<String>;
    fn pattern_x(&self, slot: i32, pattern: i32) -> i32;
    fn pattern_y(&self, slot: i32, pattern: i32) -> i32;
    fn pattern_tracks(&self, slot: i32, pattern: i32) -> i32;
    /// 0 or less when the pattern does not exist.
    fn pattern_lines(&self, slot: i32, pattern: i32) -> i32;

    /// Releases the library itself. Consumes the backend.
    fn unload(self) -> Result<(), LoadError>
    where
        Self: Sized;
}
