//! SunVox shared library backend.
//!
//! Opens the library with `libloading` and resolves every `sv_*` entry point
//! up front, so a missing symbol is a load error instead of a crash halfway
//! through a session.

use super::backend::{EngineBackend, EngineLoader};
use super::error::LoadError;
use super::params::ModuleFlags;
use libloading::Library;
use std::ffi::{c_char, c_int, CStr};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Library file the engine ships as on this platform.
#[cfg(target_os = "windows")]
pub const DEFAULT_LIBRARY: &str = "sunvox.dll";
#[cfg(target_os = "macos")]
pub const DEFAULT_LIBRARY: &str = "./sunvox.dylib";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const DEFAULT_LIBRARY: &str = "./sunvox.so";

type InitFn = unsafe extern "C" fn(*const c_char, c_int, c_int, u32) -> c_int;
type VoidFn = unsafe extern "C" fn() -> c_int;
type SlotFn = unsafe extern "C" fn(c_int) -> c_int;
type SlotArgFn = unsafe extern "C" fn(c_int, c_int) -> c_int;
type SlotPathFn = unsafe extern "C" fn(c_int, *const c_char) -> c_int;
type SlotNameFn = unsafe extern "C" fn(c_int) -> *const c_char;
type SlotLengthFn = unsafe extern "C" fn(c_int) -> u32;
type ItemFn = unsafe extern "C" fn(c_int, c_int) -> c_int;
type ItemBitsFn = unsafe extern "C" fn(c_int, c_int) -> u32;
type ItemNameFn = unsafe extern "C" fn(c_int, c_int) -> *const c_char;
type ItemLinksFn = unsafe extern "C" fn(c_int, c_int) -> *mut c_int;
type CtlNameFn = unsafe extern "C" fn(c_int, c_int, c_int) -> *const c_char;
type CtlValueFn = unsafe extern "C" fn(c_int, c_int, c_int, c_int) -> c_int;

/// Resolved entry points. Only valid while the owning [`Library`] is open.
struct Api {
    init: InitFn,
    deinit: VoidFn,
    get_sample_rate: VoidFn,
    open_slot: SlotFn,
    close_slot: SlotFn,
    load: SlotPathFn,
    play: SlotFn,
    play_from_beginning: SlotFn,
    stop: SlotFn,
    rewind: SlotArgFn,
    volume: SlotArgFn,
    set_autostop: SlotArgFn,
    get_autostop: SlotFn,
    end_of_song: SlotFn,
    get_current_line: SlotFn,
    get_song_name: SlotNameFn,
    get_song_bpm: SlotFn,
    get_song_tpl: SlotFn,
    get_song_length_frames: SlotLengthFn,
    get_song_length_lines: SlotLengthFn,
    get_number_of_modules: SlotFn,
    get_number_of_patterns: SlotFn,
    get_module_flags: ItemBitsFn,
    get_module_name: ItemNameFn,
    get_module_type: ItemNameFn,
    get_module_xy: ItemBitsFn,
    get_module_color: ItemFn,
    get_module_inputs: ItemLinksFn,
    get_module_outputs: ItemLinksFn,
    get_number_of_module_ctls: ItemFn,
    get_module_ctl_name: CtlNameFn,
    get_module_ctl_value: CtlValueFn,
    get_module_ctl_min: CtlValueFn,
    get_module_ctl_max: CtlValueFn,
    get_pattern_name: ItemNameFn,
    get_pattern_x: ItemFn,
    get_pattern_y: ItemFn,
    get_pattern_tracks: ItemFn,
    get_pattern_lines: ItemFn,
}

impl Api {
    /// # Safety
    ///
    /// Each symbol must have the C signature its field declares.
    unsafe fn resolve(library: &Library, path: &Path) -> Result<Self, LoadError> {
        unsafe fn get<T: Copy>(
            library: &Library,
            path: &Path,
            symbol: &'static str,
        ) -> Result<T, LoadError> {
            let sym = library
                .get::<T>(symbol.as_bytes())
                .map_err(|source| LoadError::MissingSymbol {
                    path: path.to_path_buf(),
                    symbol,
                    source,
                })?;
            Ok(*sym)
        }

        Ok(Self {
            init: get(library, path, "sv_init")?,
            deinit: get(library, path, "sv_deinit")?,
            get_sample_rate: get(library, path, "sv_get_sample_rate")?,
            open_slot: get(library, path, "sv_open_slot")?,
            close_slot: get(library, path, "sv_close_slot")?,
            load: get(library, path, "sv_load")?,
            play: get(library, path, "sv_play")?,
            play_from_beginning: get(library, path, "sv_play_from_beginning")?,
            stop: get(library, path, "sv_stop")?,
            rewind: get(library, path, "sv_rewind")?,
            volume: get(library, path, "sv_volume")?,
            set_autostop: get(library, path, "sv_set_autostop")?,
            get_autostop: get(library, path, "sv_get_autostop")?,
            end_of_song: get(library, path, "sv_end_of_song")?,
            get_current_line: get(library, path, "sv_get_current_line")?,
            get_song_name: get(library, path, "sv_get_song_name")?,
            get_song_bpm: get(library, path, "sv_get_song_bpm")?,
            get_song_tpl: get(library, path, "sv_get_song_tpl")?,
            get_song_length_frames: get(library, path, "sv_get_song_length_frames")?,
            get_song_length_lines: get(library, path, "sv_get_song_length_lines")?,
            get_number_of_modules: get(library, path, "sv_get_number_of_modules")?,
            get_number_of_patterns: get(library, path, "sv_get_number_of_patterns")?,
            get_module_flags: get(library, path, "sv_get_module_flags")?,
            get_module_name: get(library, path, "sv_get_module_name")?,
            get_module_type: get(library, path, "sv_get_module_type")?,
            get_module_xy: get(library, path, "sv_get_module_xy")?,
            get_module_color: get(library, path, "sv_get_module_color")?,
            get_module_inputs: get(library, path, "sv_get_module_inputs")?,
            get_module_outputs: get(library, path, "sv_get_module_outputs")?,
            get_number_of_module_ctls: get(library, path, "sv_get_number_of_module_ctls")?,
            get_module_ctl_name: get(library, path, "sv_get_module_ctl_name")?,
            get_module_ctl_value: get(library, path, "sv_get_module_ctl_value")?,
            get_module_ctl_min: get(library, path, "sv_get_module_ctl_min")?,
            get_module_ctl_max: get(library, path, "sv_get_module_ctl_max")?,
            get_pattern_name: get(library, path, "sv_get_pattern_name")?,
            get_pattern_x: get(library, path, "sv_get_pattern_x")?,
            get_pattern_y: get(library, path, "sv_get_pattern_y")?,
            get_pattern_tracks: get(library, path, "sv_get_pattern_tracks")?,
            get_pattern_lines: get(library, path, "sv_get_pattern_lines")?,
        })
    }
}

/// Finds and opens the SunVox library.
///
/// Candidates are tried in order and the first one that opens wins.
#[derive(Debug, Clone)]
pub struct LibraryLoader {
    candidates: Vec<PathBuf>,
}

impl LibraryLoader {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    /// Loader for the platform's default library name, next to the binary's
    /// working directory.
    pub fn with_defaults() -> Self {
        Self::new(vec![PathBuf::from(DEFAULT_LIBRARY)])
    }

    /// Uses `path` if given, the platform default otherwise.
    pub fn from_override(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => Self::new(vec![path]),
            None => Self::with_defaults(),
        }
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }
}

impl EngineLoader for LibraryLoader {
    type Backend = SunVoxLibrary;

    fn acquire(&self) -> Result<SunVoxLibrary, LoadError> {
        let mut last_error = None;

        for path in &self.candidates {
            // SAFETY: opening the library runs its initializers. The path is
            // the engine library the user configured.
            match unsafe { Library::new(path) } {
                Ok(library) => {
                    debug!("Opened engine library {}", path.display());
                    // SAFETY: the declared signatures match the SunVox C API.
                    let api = unsafe { Api::resolve(&library, path)? };
                    return Ok(SunVoxLibrary {
                        path: path.clone(),
                        api,
                        library,
                    });
                }
                Err(e) => {
                    debug!("Could not open {}: {}", path.display(), e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(source) => Err(LoadError::NotFound {
                tried: self.candidates.clone(),
                source,
            }),
            None => Err(LoadError::NoCandidates),
        }
    }
}

/// An open SunVox library with its resolved entry points.
pub struct SunVoxLibrary {
    path: PathBuf,
    api: Api,
    library: Library,
}

/// Copies an engine-owned string. Null means "no string".
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// for the duration of the call.
unsafe fn c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

/// Copies a module link array of `len` entries, dropping empty (-1) slots.
///
/// # Safety
///
/// `ptr` must be null or point to at least `len` readable `c_int`s.
unsafe fn link_list(ptr: *const c_int, len: usize) -> Vec<i32> {
    if ptr.is_null() || len == 0 {
        return Vec::new();
    }
    std::slice::from_raw_parts(ptr, len)
        .iter()
        .copied()
        .filter(|&link| link >= 0)
        .collect()
}

// SAFETY (all calls below): the function pointers were resolved from
// `self.library`, which stays open for as long as `self` exists. Pointer
// arguments come from live `CStr`s.
impl EngineBackend for SunVoxLibrary {
    fn init(
        &mut self,
        config: Option<&CStr>,
        sample_rate: i32,
        channels: i32,
        flags: u32,
    ) -> i32 {
        let config = config.map_or(std::ptr::null(), CStr::as_ptr);
        unsafe { (self.api.init)(config, sample_rate, channels, flags) }
    }

    fn deinit(&mut self) -> i32 {
        unsafe { (self.api.deinit)() }
    }

    fn sample_rate(&self) -> i32 {
        unsafe { (self.api.get_sample_rate)() }
    }

    fn open_slot(&mut self, slot: i32) -> i32 {
        unsafe { (self.api.open_slot)(slot) }
    }

    fn close_slot(&mut self, slot: i32) -> i32 {
        unsafe { (self.api.close_slot)(slot) }
    }

    fn load(&mut self, slot: i32, path: &CStr) -> i32 {
        unsafe { (self.api.load)(slot, path.as_ptr()) }
    }

    fn play(&mut self, slot: i32) -> i32 {
        unsafe { (self.api.play)(slot) }
    }

    fn play_from_beginning(&mut self, slot: i32) -> i32 {
        unsafe { (self.api.play_from_beginning)(slot) }
    }

    fn stop(&mut self, slot: i32) -> i32 {
        unsafe { (self.api.stop)(slot) }
    }

    fn rewind(&mut self, slot: i32, line: i32) -> i32 {
        unsafe { (self.api.rewind)(slot, line) }
    }

    fn volume(&mut self, slot: i32, volume: i32) -> i32 {
        unsafe { (self.api.volume)(slot, volume) }
    }

    fn set_autostop(&mut self, slot: i32, autostop: bool) -> i32 {
        unsafe { (self.api.set_autostop)(slot, c_int::from(autostop)) }
    }

    fn autostop(&self, slot: i32) -> i32 {
        unsafe { (self.api.get_autostop)(slot) }
    }

    fn end_of_song(&self, slot: i32) -> i32 {
        unsafe { (self.api.end_of_song)(slot) }
    }

    fn current_line(&self, slot: i32) -> i32 {
        unsafe { (self.api.get_current_line)(slot) }
    }

    fn song_name(&self, slot: i32) -> Option<String> {
        // Names are NUL-terminated strings owned by the slot.
        unsafe { c_string((self.api.get_song_name)(slot)) }
    }

    fn song_bpm(&self, slot: i32) -> i32 {
        unsafe { (self.api.get_song_bpm)(slot) }
    }

    fn song_tpl(&self, slot: i32) -> i32 {
        unsafe { (self.api.get_song_tpl)(slot) }
    }

    fn song_length_frames(&self, slot: i32) -> u32 {
        unsafe { (self.api.get_song_length_frames)(slot) }
    }

    fn song_length_lines(&self, slot: i32) -> u32 {
        unsafe { (self.api.get_song_length_lines)(slot) }
    }

    fn module_count(&self, slot: i32) -> i32 {
        unsafe { (self.api.get_number_of_modules)(slot) }
    }

    fn pattern_count(&self, slot: i32) -> i32 {
        unsafe { (self.api.get_number_of_patterns)(slot) }
    }

    fn module_flags(&self, slot: i32, module: i32) -> u32 {
        unsafe { (self.api.get_module_flags)(slot, module) }
    }

    fn module_name(&self, slot: i32, module: i32) -> Option<String> {
        unsafe { c_string((self.api.get_module_name)(slot, module)) }
    }

    fn module_type(&self, slot: i32, module: i32) -> Option<String> {
        unsafe { c_string((self.api.get_module_type)(slot, module)) }
    }

    fn module_xy(&self, slot: i32, module: i32) -> u32 {
        unsafe { (self.api.get_module_xy)(slot, module) }
    }

    fn module_color(&self, slot: i32, module: i32) -> i32 {
        unsafe { (self.api.get_module_color)(slot, module) }
    }

    fn module_inputs(&self, slot: i32, module: i32) -> Vec<i32> {
        // The array holds as many entries as the flag word advertises.
        let len = ModuleFlags::from_bits(self.module_flags(slot, module)).input_count();
        unsafe { link_list((self.api.get_module_inputs)(slot, module), len) }
    }

    fn module_outputs(&self, slot: i32, module: i32) -> Vec<i32> {
        let len = ModuleFlags::from_bits(self.module_flags(slot, module)).output_count();
        unsafe { link_list((self.api.get_module_outputs)(slot, module), len) }
    }

    fn module_ctl_count(&self, slot: i32, module: i32) -> i32 {
        unsafe { (self.api.get_number_of_module_ctls)(slot, module) }
    }

    fn module_ctl_name(&self, slot: i32, module: i32, ctl: i32) -> Option<String> {
        unsafe { c_string((self.api.get_module_ctl_name)(slot, module, ctl)) }
    }

    fn module_ctl_value(&self, slot: i32, module: i32, ctl: i32, scaled: i32) -> i32 {
        unsafe { (self.api.get_module_ctl_value)(slot, module, ctl, scaled) }
    }

    fn module_ctl_min(&self, slot: i32, module: i32, ctl: i32, scaled: i32) -> i32 {
        unsafe { (self.api.get_module_ctl_min)(slot, module, ctl, scaled) }
    }

    fn module_ctl_max(&self, slot: i32, module: i32, ctl: i32, scaled: i32) -> i32 {
        unsafe { (self.api.get_module_ctl_max)(slot, module, ctl, scaled) }
    }

    fn pattern_name(&self, slot: i32, pattern: i32) -> Option<String> {
        unsafe { c_string((self.api.get_pattern_name)(slot, pattern)) }
    }

    fn pattern_x(&self, slot: i32, pattern: i32) -> i32 {
        unsafe { (self.api.get_pattern_x)(slot, pattern) }
    }

    fn pattern_y(&self, slot: i32, pattern: i32) -> i32 {
        unsafe { (self.api.get_pattern_y)(slot, pattern) }
    }

    fn pattern_tracks(&self, slot: i32, pattern: i32) -> i32 {
        unsafe { (self.api.get_pattern_tracks)(slot, pattern) }
    }

    fn pattern_lines(&self, slot: i32, pattern: i32) -> i32 {
        unsafe { (self.api.get_pattern_lines)(slot, pattern) }
    }

    fn unload(self) -> Result<(), LoadError> {
        debug!("Closing engine library {}", self.path.display());
        self.library.close().map_err(LoadError::Unload)
    }
}
