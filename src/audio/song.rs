//! Read-only snapshots of a loaded song's modules and patterns.

use super::params::ModuleFlags;

/// One module of the song, read in a single pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub index: i32,
    pub name: String,
    /// Module type, e.g. "Generator" or "Echo".
    pub kind: String,
    pub flags: ModuleFlags,
    pub position: (i32, i32),
    /// `0xBBGGRR`.
    pub color: i32,
    pub inputs: Vec<i32>,
    pub outputs: Vec<i32>,
    pub controller_count: i32,
}

impl ModuleInfo {
    pub fn is_generator(&self) -> bool {
        self.flags.contains(ModuleFlags::GENERATOR)
    }

    pub fn is_effect(&self) -> bool {
        self.flags.contains(ModuleFlags::EFFECT)
    }

    pub fn is_muted(&self) -> bool {
        self.flags.contains(ModuleFlags::MUTE)
    }

    pub fn is_solo(&self) -> bool {
        self.flags.contains(ModuleFlags::SOLO)
    }

    pub fn is_bypassed(&self) -> bool {
        self.flags.contains(ModuleFlags::BYPASS)
    }

    /// Short labels for the set state flags, in table order.
    pub fn flag_labels(&self) -> Vec<&'static str> {
        [
            (self.is_generator(), "gen"),
            (self.is_effect(), "fx"),
            (self.is_muted(), "mute"),
            (self.is_solo(), "solo"),
            (self.is_bypassed(), "bypass"),
        ]
        .into_iter()
        .filter_map(|(set, label)| set.then_some(label))
        .collect()
    }
}

/// One controller of a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerInfo {
    pub index: i32,
    pub name: String,
    /// Value as the engine displays it.
    pub display_value: i32,
    pub min: i32,
    pub max: i32,
}

/// One pattern of the song.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternInfo {
    pub index: i32,
    pub name: String,
    pub position: (i32, i32),
    pub tracks: i32,
    pub lines: i32,
}

/// Splits a packed module position into signed 16-bit `(x, y)`.
pub fn decode_xy(xy: u32) -> (i32, i32) {
    let x = (xy & 0xFFFF) as u16 as i16;
    let y = (xy >> 16) as u16 as i16;
    (i32::from(x), i32::from(y))
}
