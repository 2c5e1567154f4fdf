//! Engine initialization parameters and the version token it returns.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Sample rate requested when nothing else is configured (44.1 kHz standard).
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Channel count requested by default. The engine only supports stereo.
pub const DEFAULT_CHANNELS: u32 = 2;

/// Bit set passed to `sv_init`.
///
/// Zero means "engine defaults".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct InitFlags(u32);

impl InitFlags {
    /// Engine defaults.
    pub const NONE: Self = Self(0);
    /// Silence the engine's own stdout logging.
    pub const NO_DEBUG_OUTPUT: Self = Self(1 << 0);
    /// The host drives audio by calling the engine's render callback.
    pub const USER_AUDIO_CALLBACK: Self = Self(1 << 1);
    /// Alias of `USER_AUDIO_CALLBACK`: no audio device is opened.
    pub const OFFLINE: Self = Self(1 << 1);
    /// 16-bit integer output.
    pub const AUDIO_INT16: Self = Self(1 << 2);
    /// 32-bit float output.
    pub const AUDIO_FLOAT32: Self = Self(1 << 3);
    /// Run everything on the caller's thread.
    pub const ONE_THREAD: Self = Self(1 << 4);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for InitFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for InitFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Module flag word returned by `sv_get_module_flags`.
///
/// The low bits are state flags; bits 16..24 hold the number of input
/// links and bits 24..32 the number of output links.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ModuleFlags(u32);

impl ModuleFlags {
    pub const EXISTS: Self = Self(1 << 0);
    pub const GENERATOR: Self = Self(1 << 1);
    pub const EFFECT: Self = Self(1 << 2);
    pub const MUTE: Self = Self(1 << 3);
    pub const SOLO: Self = Self(1 << 4);
    pub const BYPASS: Self = Self(1 << 5);

    pub const INPUTS_OFF: u32 = 16;
    pub const INPUTS_MASK: u32 = 255 << Self::INPUTS_OFF;
    pub const OUTPUTS_OFF: u32 = 16 + 8;
    pub const OUTPUTS_MASK: u32 = 255 << Self::OUTPUTS_OFF;

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Number of input link slots.
    pub const fn input_count(self) -> usize {
        ((self.0 & Self::INPUTS_MASK) >> Self::INPUTS_OFF) as usize
    }

    /// Number of output link slots.
    pub const fn output_count(self) -> usize {
        ((self.0 & Self::OUTPUTS_MASK) >> Self::OUTPUTS_OFF) as usize
    }
}

impl BitOr for ModuleFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Everything `sv_init` needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitParams {
    /// Engine configuration string, e.g. `buffer=1024|audiodriver=alsa`.
    /// None leaves the engine on its own defaults.
    pub config: Option<String>,
    /// Requested sample rate in Hz. The engine may pick a different one.
    pub sample_rate: u32,
    /// Requested channel count.
    pub channels: u32,
    pub flags: InitFlags,
}

impl Default for InitParams {
    fn default() -> Self {
        Self {
            config: None,
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            flags: InitFlags::NONE,
        }
    }
}

/// Version token returned by a successful `sv_init`.
///
/// Packed as `0x00MMmmpp`: major, minor and patch in the low three bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineVersion(u32);

impl EngineVersion {
    /// Wraps a raw init status. Returns None for negative (error) codes.
    pub fn from_status(status: i32) -> Option<Self> {
        u32::try_from(status).ok().map(Self)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn major(self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    pub fn minor(self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    pub fn patch(self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.patch())
    }
}
