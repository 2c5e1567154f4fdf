//! Recording engine backend for tests.
//!
//! Every call that reaches the engine is appended to a shared log, so tests
//! can assert the exact order of lifecycle steps after everything is dropped.

use super::backend::{EngineBackend, EngineLoader};
use super::error::LoadError;
use super::params::ModuleFlags;
use std::cell::{Cell, RefCell};
use std::ffi::CStr;
use std::rc::Rc;

/// One observed engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Load,
    Init {
        config: Option<String>,
        sample_rate: i32,
        channels: i32,
        flags: u32,
    },
    OpenSlot(i32),
    /// Path bytes exactly as they cross the C boundary.
    SongLoad(i32, Vec<u8>),
    Play(i32),
    PlayFromBeginning(i32),
    Stop(i32),
    Rewind(i32, i32),
    SetVolume(i32, i32),
    CloseSlot(i32),
    Deinit,
    Unload,
}

/// Loader whose backends all write into one call log.
pub struct MockLoader {
    log: Rc<RefCell<Vec<Call>>>,
    fail_load: bool,
    init_status: i32,
    open_status: i32,
    load_status: i32,
    end_of_song: i32,
}

impl MockLoader {
    /// A loader whose engine accepts everything and reports version 5.
    pub fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
            fail_load: false,
            init_status: 5,
            open_status: 0,
            load_status: 0,
            end_of_song: 0,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_load: true,
            ..Self::new()
        }
    }

    pub fn with_init_status(mut self, status: i32) -> Self {
        self.init_status = status;
        self
    }

    pub fn with_open_status(mut self, status: i32) -> Self {
        self.open_status = status;
        self
    }

    pub fn with_load_status(mut self, status: i32) -> Self {
        self.load_status = status;
        self
    }

    /// Makes the song report that it has already finished.
    pub fn ended(mut self) -> Self {
        self.end_of_song = 1;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.log.borrow().iter().filter(|c| *c == call).count()
    }
}

impl EngineLoader for MockLoader {
    type Backend = MockBackend;

    fn acquire(&self) -> Result<MockBackend, LoadError> {
        self.log.borrow_mut().push(Call::Load);
        if self.fail_load {
            return Err(LoadError::NoCandidates);
        }
        Ok(MockBackend {
            log: Rc::clone(&self.log),
            init_status: self.init_status,
            open_status: self.open_status,
            load_status: self.load_status,
            end_of_song: self.end_of_song,
            volume: Cell::new(256),
            autostop: Cell::new(true),
        })
    }
}

pub struct MockBackend {
    log: Rc<RefCell<Vec<Call>>>,
    init_status: i32,
    open_status: i32,
    load_status: i32,
    end_of_song: i32,
    volume: Cell<i32>,
    autostop: Cell<bool>,
}

impl MockBackend {
    fn record(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }
}

// Fixed song layout:
//   module 0 "Output", fed by module 1
//   module 1 "Synth", muted generator at (128, -64) with two controllers
//   module 2 empty
//   module 3 "Echo", bypassed effect
//   pattern 0 "Intro", pattern 1 empty, pattern 2 unnamed at (96, -32)
const MOCK_MODULES: [(&str, &str, u32); 4] = [
    ("Output", "Output", ModuleFlags::EXISTS.bits() | (1 << 16)),
    (
        "Synth",
        "Generator",
        ModuleFlags::EXISTS.bits()
            | ModuleFlags::GENERATOR.bits()
            | ModuleFlags::MUTE.bits()
            | (1 << 24),
    ),
    ("", "", 0),
    (
        "Echo",
        "Echo",
        ModuleFlags::EXISTS.bits() | ModuleFlags::EFFECT.bits() | ModuleFlags::BYPASS.bits(),
    ),
];

const MOCK_CONTROLLERS: [(&str, i32, i32, i32); 2] =
    [("Volume", 200, 0, 256), ("Waveform", 3, 0, 9)];

fn mock_module(module: i32) -> Option<(&'static str, &'static str, u32)> {
    usize::try_from(module)
        .ok()
        .and_then(|i| MOCK_MODULES.get(i))
        .copied()
}

fn mock_controller(module: i32, ctl: i32) -> Option<(&'static str, i32, i32, i32)> {
    if module != 1 {
        return None;
    }
    usize::try_from(ctl)
        .ok()
        .and_then(|i| MOCK_CONTROLLERS.get(i))
        .copied()
}

impl EngineBackend for MockBackend {
    fn init(
        &mut self,
        config: Option<&CStr>,
        sample_rate: i32,
        channels: i32,
        flags: u32,
    ) -> i32 {
        self.record(Call::Init {
            config: config.map(|c| c.to_string_lossy().into_owned()),
            sample_rate,
            channels,
            flags,
        });
        self.init_status
    }

    fn deinit(&mut self) -> i32 {
        self.record(Call::Deinit);
        0
    }

    fn sample_rate(&self) -> i32 {
        44100
    }

    fn open_slot(&mut self, slot: i32) -> i32 {
        self.record(Call::OpenSlot(slot));
        self.open_status
    }

    fn close_slot(&mut self, slot: i32) -> i32 {
        self.record(Call::CloseSlot(slot));
        0
    }

    fn load(&mut self, slot: i32, path: &CStr) -> i32 {
        self.record(Call::SongLoad(slot, path.to_bytes().to_vec()));
        self.load_status
    }

    fn play(&mut self, slot: i32) -> i32 {
        self.record(Call::Play(slot));
        0
    }

    fn play_from_beginning(&mut self, slot: i32) -> i32 {
        self.record(Call::PlayFromBeginning(slot));
        0
    }

    fn stop(&mut self, slot: i32) -> i32 {
        self.record(Call::Stop(slot));
        0
    }

    fn rewind(&mut self, slot: i32, line: i32) -> i32 {
        self.record(Call::Rewind(slot, line));
        0
    }

    fn volume(&mut self, slot: i32, volume: i32) -> i32 {
        let previous = self.volume.get();
        if volume >= 0 {
            self.record(Call::SetVolume(slot, volume));
            self.volume.set(volume);
        }
        previous
    }

    fn set_autostop(&mut self, _slot: i32, autostop: bool) -> i32 {
        self.autostop.set(autostop);
        0
    }

    fn autostop(&self, _slot: i32) -> i32 {
        i32::from(self.autostop.get())
    }

    fn end_of_song(&self, _slot: i32) -> i32 {
        self.end_of_song
    }

    fn current_line(&self, _slot: i32) -> i32 {
        0
    }

    fn song_name(&self, _slot: i32) -> Option<String> {
        Some("Mock Song".to_string())
    }

    fn song_bpm(&self, _slot: i32) -> i32 {
        125
    }

    fn song_tpl(&self, _slot: i32) -> i32 {
        6
    }

    fn song_length_frames(&self, _slot: i32) -> u32 {
        441000
    }

    fn song_length_lines(&self, _slot: i32) -> u32 {
        128
    }

    fn module_count(&self, _slot: i32) -> i32 {
        4
    }

    fn pattern_count(&self, _slot: i32) -> i32 {
        3
    }

    fn module_flags(&self, _slot: i32, module: i32) -> u32 {
        mock_module(module).map_or(0, |(_, _, flags)| flags)
    }

    fn module_name(&self, _slot: i32, module: i32) -> Option<String> {
        mock_module(module).map(|(name, _, _)| name.to_string())
    }

    fn module_type(&self, _slot: i32, module: i32) -> Option<String> {
        mock_module(module).map(|(_, kind, _)| kind.to_string())
    }

    fn module_xy(&self, _slot: i32, module: i32) -> u32 {
        match module {
            1 => 0xFFC0_0080,
            _ => 0,
        }
    }

    fn module_color(&self, _slot: i32, module: i32) -> i32 {
        match module {
            1 => 0x00FF80,
            _ => 0xFFFFFF,
        }
    }

    fn module_inputs(&self, _slot: i32, module: i32) -> Vec<i32> {
        match module {
            0 => vec![1],
            _ => Vec::new(),
        }
    }

    fn module_outputs(&self, _slot: i32, module: i32) -> Vec<i32> {
        match module {
            1 => vec![0],
            _ => Vec::new(),
        }
    }

    fn module_ctl_count(&self, _slot: i32, module: i32) -> i32 {
        match module {
            1 => 2,
            _ => 0,
        }
    }

    fn module_ctl_name(&self, _slot: i32, module: i32, ctl: i32) -> Option<String> {
        mock_controller(module, ctl).map(|(name, ..)| name.to_string())
    }

    fn module_ctl_value(&self, _slot: i32, module: i32, ctl: i32, _scaled: i32) -> i32 {
        mock_controller(module, ctl).map_or(0, |(_, value, ..)| value)
    }

    fn module_ctl_min(&self, _slot: i32, module: i32, ctl: i32, _scaled: i32) -> i32 {
        mock_controller(module, ctl).map_or(0, |(_, _, min, _)| min)
    }

    fn module_ctl_max(&self, _slot: i32, module: i32, ctl: i32, _scaled: i32) -> i32 {
        mock_controller(module, ctl).map_or(0, |(.., max)| max)
    }

    fn pattern_name(&self, _slot: i32, pattern: i32) -> Option<String> {
        match pattern {
            0 => Some("Intro".to_string()),
            _ => None,
        }
    }

    fn pattern_x(&self, _slot: i32, pattern: i32) -> i32 {
        match pattern {
            2 => 96,
            _ => 0,
        }
    }

    fn pattern_y(&self, _slot: i32, pattern: i32) -> i32 {
        match pattern {
            2 => -32,
            _ => 0,
        }
    }

    fn pattern_tracks(&self, _slot: i32, pattern: i32) -> i32 {
        match pattern {
            0 => 4,
            2 => 8,
            _ => 0,
        }
    }

    fn pattern_lines(&self, _slot: i32, pattern: i32) -> i32 {
        match pattern {
            0 => 32,
            2 => 64,
            _ => 0,
        }
    }

    fn unload(self) -> Result<(), LoadError> {
        self.record(Call::Unload);
        Ok(())
    }
}
