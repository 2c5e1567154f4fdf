//! Host commands.
//!
//! Each command runs exactly one engine session. Output goes to the given
//! writer so the commands can be driven against a recording backend.

use crate::audio::{
    run_session, EngineBackend, EngineHandle, EngineLoader, InitParams, PlaybackSlot,
    SessionOutcome, DEFAULT_SLOT, MAX_VOLUME,
};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// How often playback checks for the end of the song.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

const TABLE_WIDTH: usize = 70;

/// Runs the bare lifecycle: load, init, open slot 0, close it, deinit,
/// unload.
///
/// Only a load failure is an error. An engine that refuses to initialize
/// still gets unloaded and the run counts as complete.
pub fn demo<L: EngineLoader>(loader: &L, params: &InitParams) -> Result<()> {
    let outcome = run_session(loader, params, DEFAULT_SLOT, |slot| {
        debug!("Slot {} is open and ready for use", slot.index());
    })
    .context("Failed to load engine library")?;

    match outcome {
        SessionOutcome::Completed { version, .. } => {
            info!("Engine {} completed a full session", version)
        }
        SessionOutcome::SlotUnavailable { version, .. } => {
            info!(
                "Engine {} initialized but slot {} was unavailable",
                version, DEFAULT_SLOT
            )
        }
        SessionOutcome::InitializationFailed(_) => {
            info!("Engine did not initialize; library unloaded")
        }
    }
    Ok(())
}

/// Prints the engine version and the sample rate it actually runs at.
pub fn version<L, W>(loader: &L, params: &InitParams, out: &mut W) -> Result<()>
where
    L: EngineLoader,
    W: Write,
{
    writeln!(out, "sunvox-host: {}", env!("CARGO_PKG_VERSION"))?;

    let mut handle = EngineHandle::load(loader).context("Failed to load engine library")?;
    let session = handle
        .initialize(params)
        .context("Failed to initialize engine")?;
    writeln!(out, "SunVox library: {}", session.version())?;
    writeln!(out, "Sample rate: {} Hz", session.sample_rate())?;
    Ok(())
}

/// Summary of a loaded song.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SongInfo {
    pub file: String,
    pub name: String,
    pub bpm: i32,
    /// Ticks per line.
    pub tpl: i32,
    pub lines: u32,
    pub frames: u32,
    pub duration_secs: f64,
    pub modules: i32,
    pub patterns: i32,
}

impl SongInfo {
    /// Reads the song currently loaded in `slot`.
    pub fn read<B: EngineBackend>(slot: &PlaybackSlot<'_, B>, file: &Path) -> Self {
        Self {
            file: file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string()),
            name: slot.song_name(),
            bpm: slot.bpm(),
            tpl: slot.tpl(),
            lines: slot.length_lines(),
            frames: slot.length_frames(),
            duration_secs: song_duration(slot),
            modules: slot.module_count(),
            patterns: slot.pattern_count(),
        }
    }

    /// Writes the summary as `Key: value` lines.
    pub fn write_text<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "File: {}", self.file)?;
        writeln!(out, "Name: {}", self.name)?;
        writeln!(out, "BPM: {}", self.bpm)?;
        writeln!(out, "TPL: {}", self.tpl)?;
        writeln!(out, "Lines: {}", self.lines)?;
        writeln!(out, "Frames: {}", self.frames)?;
        writeln!(out, "Duration: {:.2}s", self.duration_secs)?;
        writeln!(out, "Modules: {}", self.modules)?;
        writeln!(out, "Patterns: {}", self.patterns)
    }
}

/// Loads `path` and prints its summary, as text or JSON.
pub fn info<L, W>(
    loader: &L,
    params: &InitParams,
    path: &Path,
    json: bool,
    out: &mut W,
) -> Result<()>
where
    L: EngineLoader,
    W: Write,
{
    let song = with_song(loader, params, path, |slot| Ok(SongInfo::read(slot, path)))?;

    if json {
        serde_json::to_writer_pretty(&mut *out, &song)?;
        writeln!(out)?;
    } else {
        song.write_text(out)?;
    }
    Ok(())
}

/// Lists every module of `path` as a table.
pub fn modules<L, W>(loader: &L, params: &InitParams, path: &Path, out: &mut W) -> Result<()>
where
    L: EngineLoader,
    W: Write,
{
    with_song(loader, params, path, |slot| {
        writeln!(out, "Modules in '{}':", slot.song_name())?;
        writeln!(out)?;
        writeln!(out, "{:>4}  {:<20}  {:<24}  Flags", "ID", "Type", "Name")?;
        writeln!(out, "{}", "-".repeat(TABLE_WIDTH))?;

        for module in (0..slot.module_count()).filter_map(|i| slot.module(i)) {
            let labels = module.flag_labels();
            let flags = if labels.is_empty() {
                "-".to_string()
            } else {
                labels.join(",")
            };
            writeln!(
                out,
                "{:>4}  {:<20}  {:<24}  {}",
                module.index, module.kind, module.name, flags
            )?;
        }
        Ok(())
    })
}

/// Prints one module in detail, controllers included.
///
/// Fails if no module exists at `id`.
pub fn module_info<L, W>(
    loader: &L,
    params: &InitParams,
    path: &Path,
    id: i32,
    out: &mut W,
) -> Result<()>
where
    L: EngineLoader,
    W: Write,
{
    with_song(loader, params, path, |slot| {
        let Some(module) = slot.module(id) else {
            bail!("Module {} does not exist", id);
        };

        writeln!(out, "Module {}: {}", id, module.name)?;
        writeln!(out, "  Type: {}", module.kind)?;
        writeln!(out, "  Position: {:?}", module.position)?;
        writeln!(out, "  Color: #{:06x}", module.color)?;
        writeln!(out, "  Generator: {}", module.is_generator())?;
        writeln!(out, "  Effect: {}", module.is_effect())?;
        writeln!(out, "  Muted: {}", module.is_muted())?;
        writeln!(out, "  Solo: {}", module.is_solo())?;
        writeln!(out, "  Bypassed: {}", module.is_bypassed())?;
        writeln!(out, "  Inputs: {:?}", module.inputs)?;
        writeln!(out, "  Outputs: {:?}", module.outputs)?;
        writeln!(out)?;
        writeln!(out, "  Controllers ({}):", module.controller_count)?;
        for ctl in slot.controllers(id) {
            writeln!(
                out,
                "    {}: {} = {} (range: {}-{})",
                ctl.index, ctl.name, ctl.display_value, ctl.min, ctl.max
            )?;
        }
        Ok(())
    })
}

/// Lists every pattern of `path` as a table.
pub fn patterns<L, W>(loader: &L, params: &InitParams, path: &Path, out: &mut W) -> Result<()>
where
    L: EngineLoader,
    W: Write,
{
    with_song(loader, params, path, |slot| {
        writeln!(out, "Patterns in '{}':", slot.song_name())?;
        writeln!(out)?;
        writeln!(
            out,
            "{:>4}  {:<24}  {:>6}  {:>6}  Position",
            "ID", "Name", "Tracks", "Lines"
        )?;
        writeln!(out, "{}", "-".repeat(TABLE_WIDTH))?;

        for pattern in (0..slot.pattern_count()).filter_map(|i| slot.pattern(i)) {
            let (x, y) = pattern.position;
            writeln!(
                out,
                "{:>4}  {:<24}  {:>6}  {:>6}  ({}, {})",
                pattern.index, pattern.name, pattern.tracks, pattern.lines, x, y
            )?;
        }
        Ok(())
    })
}

/// Playback options for [`play`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlayOptions {
    /// Upper bound on playback time in seconds. None plays the whole song.
    pub duration: Option<f64>,
    /// Line to start from. None starts wherever loading left the song.
    pub line: Option<i32>,
    /// Slot volume, 0 to [`MAX_VOLUME`].
    pub volume: i32,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            duration: None,
            line: None,
            volume: MAX_VOLUME,
        }
    }
}

/// Loads `path` and plays it, blocking until the time limit passes, the
/// song ends on its own, or `interrupted` is set.
pub fn play<L, W>(
    loader: &L,
    params: &InitParams,
    path: &Path,
    options: &PlayOptions,
    interrupted: &AtomicBool,
    out: &mut W,
) -> Result<()>
where
    L: EngineLoader,
    W: Write,
{
    with_song(loader, params, path, |slot| {
        let total = song_duration(slot);
        let play_for = options.duration.map_or(total, |d| d.min(total)).max(0.0);

        writeln!(out, "Playing: {}", slot.song_name())?;
        writeln!(out, "Duration: {:.2}s (total: {:.2}s)", play_for, total)?;
        writeln!(out, "Press Ctrl+C to stop")?;

        if let Some(line) = options.line {
            slot.rewind(line)?;
        }
        slot.set_volume(options.volume);
        slot.play()?;

        let started = Instant::now();
        let limit = Duration::from_secs_f64(play_for);
        while started.elapsed() < limit && !interrupted.load(Ordering::SeqCst) {
            if !slot.is_playing() && slot.autostop() {
                debug!("Song ended at line {}", slot.current_line());
                break;
            }
            thread::sleep(POLL_INTERVAL);
        }

        slot.stop()?;
        if interrupted.load(Ordering::SeqCst) {
            writeln!(out, "\nStopped")?;
        }
        Ok(())
    })
}

/// Song length in seconds at the engine's actual sample rate.
fn song_duration<B: EngineBackend>(slot: &PlaybackSlot<'_, B>) -> f64 {
    let rate = slot.sample_rate();
    if rate <= 0 {
        return 0.0;
    }
    f64::from(slot.length_frames()) / f64::from(rate)
}

/// Runs one session with `path` loaded into the default slot.
fn with_song<L, T, F>(loader: &L, params: &InitParams, path: &Path, work: F) -> Result<T>
where
    L: EngineLoader,
    F: FnOnce(&mut PlaybackSlot<'_, L::Backend>) -> Result<T>,
{
    if !path.exists() {
        bail!("File not found: {}", path.display());
    }

    let outcome = run_session(loader, params, DEFAULT_SLOT, |slot| -> Result<T> {
        slot.load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        work(slot)
    })
    .context("Failed to load engine library")?;

    match outcome {
        SessionOutcome::Completed { output, .. } => output,
        SessionOutcome::SlotUnavailable { error, .. } => {
            Err(error).context("Failed to open playback slot")
        }
        SessionOutcome::InitializationFailed(e) => Err(e).context("Failed to initialize engine"),
    }
}
