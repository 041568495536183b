//! Driver skill scaling
//!
//! Every driver-initiated command is scaled by the current skill level. The level is set from
//! outside the drive loop (e.g. an operator console) and read every tick, so it lives in an
//! atomic shared by every handle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use conquer_once::Lazy;
use serde::{Deserialize, Serialize};
use std::{
    str::FromStr,
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
};

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static GLOBAL_SKILL: Lazy<DriverSkill> = Lazy::new(DriverSkill::default);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Handle to a shared driver skill level.
///
/// Clones share the same level.
#[derive(Debug, Clone, Default)]
pub struct DriverSkill {
    level: Arc<AtomicU8>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Skill level of the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    /// Half speed.
    Beginner,
    /// Three quarter speed.
    Intermediate,
    /// Full speed.
    Expert,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Level {
    fn default() -> Self {
        Level::Beginner
    }
}

impl Level {
    /// Scale factor applied to driver commands.
    pub fn scale(&self) -> f64 {
        match self {
            Level::Beginner => 0.5,
            Level::Intermediate => 0.75,
            Level::Expert => 1.0,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Level::Beginner => 0,
            Level::Intermediate => 1,
            Level::Expert => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            2 => Level::Expert,
            1 => Level::Intermediate,
            _ => Level::Beginner,
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "beginner" => Ok(Level::Beginner),
            "intermediate" => Ok(Level::Intermediate),
            "expert" => Ok(Level::Expert),
            _ => Err(format!(
                "Unknown skill level `{}`, expected beginner, intermediate or expert",
                s
            )),
        }
    }
}

impl DriverSkill {
    /// A new handle, independent of every other, at the given level.
    pub fn new(level: Level) -> Self {
        Self {
            level: Arc::new(AtomicU8::new(level.to_u8())),
        }
    }

    /// The process-wide handle.
    pub fn global() -> Self {
        (*GLOBAL_SKILL).clone()
    }

    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, level: Level) {
        self.level.store(level.to_u8(), Ordering::Relaxed);
    }
}
