//! Owned engine resources.
//!
//! [`EngineHandle`], [`EngineSession`] and [`PlaybackSlot`] each wrap one
//! acquired engine resource and release it on drop. A session mutably
//! borrows its handle and a slot mutably borrows its session, so the
//! borrow checker rules out using a slot after its session is gone and
//! guarantees release in reverse order: slot, session, handle.

use super::backend::{EngineBackend, EngineLoader};
use super::error::{InitializationError, LoadError, SlotError};
use super::params::{EngineVersion, InitParams, ModuleFlags};
use super::song::{decode_xy, ControllerInfo, ModuleInfo, PatternInfo};
use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::path::Path;
use tracing::{debug, info, warn};

/// Volume the engine treats as unity gain.
pub const MAX_VOLUME: i32 = 256;

/// A loaded engine library.
///
/// Unloads the library when dropped.
pub struct EngineHandle<B: EngineBackend> {
    backend: ManuallyDrop<B>,
}

impl<B: EngineBackend> EngineHandle<B> {
    /// Loads the engine through `loader`.
    ///
    /// # Errors
    ///
    /// Returns the loader's error unchanged. Nothing needs unloading in
    /// that case.
    pub fn load<L>(loader: &L) -> Result<Self, LoadError>
    where
        L: EngineLoader<Backend = B>,
    {
        let backend = loader.acquire()?;
        info!("Engine library loaded");
        Ok(Self {
            backend: ManuallyDrop::new(backend),
        })
    }

    /// Initializes the engine and returns the live session.
    ///
    /// # Errors
    ///
    /// Returns [`InitializationError::Rejected`] when the engine reports a
    /// negative status. The handle stays loaded and usable for unloading.
    pub fn initialize(
        &mut self,
        params: &InitParams,
    ) -> Result<EngineSession<'_, B>, InitializationError> {
        let config = params
            .config
            .as_deref()
            .map(CString::new)
            .transpose()
            .map_err(|_| InitializationError::InvalidConfig)?;

        let sample_rate = engine_int("sample rate", params.sample_rate)?;
        let channels = engine_int("channel count", params.channels)?;

        let status = self.backend.init(
            config.as_deref(),
            sample_rate,
            channels,
            params.flags.bits(),
        );
        let version = EngineVersion::from_status(status)
            .ok_or(InitializationError::Rejected { code: status })?;

        info!(
            "Engine {} initialized ({} Hz, {} channels, flags {:#x})",
            version,
            params.sample_rate,
            params.channels,
            params.flags.bits()
        );
        Ok(EngineSession {
            backend: &mut *self.backend,
            version,
        })
    }

    /// Unloads the library now rather than at end of scope.
    pub fn unload(self) {
        drop(self);
    }
}

impl<B: EngineBackend> Drop for EngineHandle<B> {
    fn drop(&mut self) {
        // SAFETY: `backend` is taken exactly once, here, and never touched again.
        let backend = unsafe { ManuallyDrop::take(&mut self.backend) };
        match backend.unload() {
            Ok(()) => info!("Engine library unloaded"),
            Err(e) => warn!("Engine library did not unload cleanly: {}", e),
        }
    }
}

/// An initialized engine.
///
/// Deinitializes the engine when dropped.
pub struct EngineSession<'h, B: EngineBackend> {
    backend: &'h mut B,
    version: EngineVersion,
}

impl<B: EngineBackend> EngineSession<'_, B> {
    /// Version reported by initialization.
    pub fn version(&self) -> EngineVersion {
        self.version
    }

    /// Sample rate the engine actually runs at.
    pub fn sample_rate(&self) -> i32 {
        self.backend.sample_rate()
    }

    /// Opens the playback slot at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::Engine`] when the engine reports a negative
    /// status. The slot is closed again before returning, since an open was
    /// issued for it.
    pub fn open_slot(&mut self, index: i32) -> Result<PlaybackSlot<'_, B>, SlotError> {
        let status = self.backend.open_slot(index);
        if status < 0 {
            let close_status = self.backend.close_slot(index);
            if close_status < 0 {
                debug!("Closing failed slot {} returned {}", index, close_status);
            }
            return Err(SlotError::Engine {
                slot: index,
                op: "open_slot",
                code: status,
            });
        }

        debug!("Slot {} opened", index);
        Ok(PlaybackSlot {
            backend: &mut *self.backend,
            index,
        })
    }

    /// Deinitializes the engine now rather than at end of scope.
    pub fn deinitialize(self) {
        drop(self);
    }
}

impl<B: EngineBackend> Drop for EngineSession<'_, B> {
    fn drop(&mut self) {
        let status = self.backend.deinit();
        if status < 0 {
            warn!("Engine deinit returned {}", status);
        } else {
            info!("Engine deinitialized");
        }
    }
}

/// One open playback slot.
///
/// A slot is an independent engine instance that holds a single song.
/// Closes the slot when dropped.
pub struct PlaybackSlot<'s, B: EngineBackend> {
    backend: &'s mut B,
    index: i32,
}

impl<B: EngineBackend> PlaybackSlot<'_, B> {
    pub fn index(&self) -> i32 {
        self.index
    }

    /// Sample rate the engine actually runs at.
    pub fn sample_rate(&self) -> i32 {
        self.backend.sample_rate()
    }

    /// Loads a song file into this slot.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The path contains a NUL byte
    /// - The engine cannot read or parse the file
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), SlotError> {
        let path = path.as_ref();
        let c_path =
            path_to_cstring(path).ok_or_else(|| SlotError::InvalidPath(path.to_path_buf()))?;
        let status = self.backend.load(self.index, &c_path);
        self.check("load", status)?;
        debug!("Slot {} loaded {}", self.index, path.display());
        Ok(())
    }

    /// Starts playback from the current position.
    pub fn play(&mut self) -> Result<(), SlotError> {
        let status = self.backend.play(self.index);
        self.check("play", status)
    }

    /// Starts playback from line 0.
    pub fn play_from_beginning(&mut self) -> Result<(), SlotError> {
        let status = self.backend.play_from_beginning(self.index);
        self.check("play_from_beginning", status)
    }

    /// Stops playback.
    ///
    /// A first call stops the song; a second one resets the engine to
    /// standby.
    pub fn stop(&mut self) -> Result<(), SlotError> {
        let status = self.backend.stop(self.index);
        self.check("stop", status)
    }

    /// Moves the play position to `line`.
    pub fn rewind(&mut self, line: i32) -> Result<(), SlotError> {
        let status = self.backend.rewind(self.index, line);
        self.check("rewind", status)
    }

    /// Current slot volume (0 to [`MAX_VOLUME`]).
    pub fn volume(&mut self) -> i32 {
        self.backend.volume(self.index, -1)
    }

    /// Sets the slot volume, clamped to 0..=[`MAX_VOLUME`], and returns the
    /// previous one.
    pub fn set_volume(&mut self, volume: i32) -> i32 {
        self.backend.volume(self.index, volume.clamp(0, MAX_VOLUME))
    }

    /// Whether the engine stops by itself at the end of the song.
    pub fn autostop(&self) -> bool {
        self.backend.autostop(self.index) == 1
    }

    pub fn set_autostop(&mut self, autostop: bool) -> Result<(), SlotError> {
        let status = self.backend.set_autostop(self.index, autostop);
        self.check("set_autostop", status)
    }

    /// False once playback has reached the end of the song.
    pub fn is_playing(&self) -> bool {
        self.backend.end_of_song(self.index) == 0
    }

    pub fn current_line(&self) -> i32 {
        self.backend.current_line(self.index)
    }

    /// Song name, or an empty string when the song has none.
    pub fn song_name(&self) -> String {
        self.backend.song_name(self.index).unwrap_or_default()
    }

    pub fn bpm(&self) -> i32 {
        self.backend.song_bpm(self.index)
    }

    /// Ticks per line.
    pub fn tpl(&self) -> i32 {
        self.backend.song_tpl(self.index)
    }

    pub fn length_frames(&self) -> u32 {
        self.backend.song_length_frames(self.index)
    }

    pub fn length_lines(&self) -> u32 {
        self.backend.song_length_lines(self.index)
    }

    pub fn module_count(&self) -> i32 {
        self.backend.module_count(self.index)
    }

    pub fn pattern_count(&self) -> i32 {
        self.backend.pattern_count(self.index)
    }

    /// Reads module `index`. None if the module slot is empty.
    pub fn module(&self, index: i32) -> Option<ModuleInfo> {
        let flags = ModuleFlags::from_bits(self.backend.module_flags(self.index, index));
        if !flags.contains(ModuleFlags::EXISTS) {
            return None;
        }

        Some(ModuleInfo {
            index,
            name: self.backend.module_name(self.index, index).unwrap_or_default(),
            kind: self.backend.module_type(self.index, index).unwrap_or_default(),
            flags,
            position: decode_xy(self.backend.module_xy(self.index, index)),
            color: self.backend.module_color(self.index, index),
            inputs: self.backend.module_inputs(self.index, index),
            outputs: self.backend.module_outputs(self.index, index),
            controller_count: self.backend.module_ctl_count(self.index, index),
        })
    }

    /// Controllers of module `module`, in index order.
    pub fn controllers(&self, module: i32) -> Vec<ControllerInfo> {
        let count = self.backend.module_ctl_count(self.index, module);
        (0..count.max(0))
            .map(|ctl| ControllerInfo {
                index: ctl,
                name: self
                    .backend
                    .module_ctl_name(self.index, module, ctl)
                    .unwrap_or_default(),
                display_value: self.backend.module_ctl_value(self.index, module, ctl, 2),
                min: self.backend.module_ctl_min(self.index, module, ctl, 0),
                max: self.backend.module_ctl_max(self.index, module, ctl, 0),
            })
            .collect()
    }

    /// Reads pattern `index`. None if the pattern slot is empty.
    pub fn pattern(&self, index: i32) -> Option<PatternInfo> {
        let lines = self.backend.pattern_lines(self.index, index);
        if lines <= 0 {
            return None;
        }

        Some(PatternInfo {
            index,
            name: self.backend.pattern_name(self.index, index).unwrap_or_default(),
            position: (
                self.backend.pattern_x(self.index, index),
                self.backend.pattern_y(self.index, index),
            ),
            tracks: self.backend.pattern_tracks(self.index, index),
            lines,
        })
    }

    /// Closes the slot now rather than at end of scope.
    pub fn close(self) {
        drop(self);
    }

    fn check(&self, op: &'static str, status: i32) -> Result<(), SlotError> {
        if status < 0 {
            Err(SlotError::Engine {
                slot: self.index,
                op,
                code: status,
            })
        } else {
            Ok(())
        }
    }
}

impl<B: EngineBackend> Drop for PlaybackSlot<'_, B> {
    fn drop(&mut self) {
        let status = self.backend.close_slot(self.index);
        if status < 0 {
            warn!("Closing slot {} returned {}", self.index, status);
        } else {
            debug!("Slot {} closed", self.index);
        }
    }
}

fn engine_int(name: &'static str, value: u32) -> Result<i32, InitializationError> {
    i32::try_from(value).map_err(|_| InitializationError::OutOfRange { name, value })
}

/// The engine takes paths as raw bytes on unix and UTF-8 elsewhere.
#[cfg(unix)]
fn path_to_cstring(path: &Path) -> Option<CString> {
    use std::os::unix::ffi::OsStrExt;
    CString::new(path.as_os_str().as_bytes()).ok()
}

#[cfg(not(unix))]
fn path_to_cstring(path: &Path) -> Option<CString> {
    CString::new(path.to_str()?).ok()
}
