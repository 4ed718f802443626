//! Background loop flags

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown loop '{0}'")]
pub struct UnknownLoop(pub String);

/// The loops the robot runtime can toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopName {
    /// Periodic awareness heartbeat
    Awareness,
    /// Sensor monitoring and face tracking
    Sensors,
}

impl LoopName {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopName::Awareness => "awareness",
            LoopName::Sensors => "sensors",
        }
    }
}

impl fmt::Display for LoopName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoopName {
    type Err = UnknownLoop;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "awareness" => Ok(LoopName::Awareness),
            "sensors" => Ok(LoopName::Sensors),
            other => Err(UnknownLoop(other.to_string())),
        }
    }
}

/// Enabled state of every known loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopStatus {
    #[serde(default)]
    pub awareness: bool,

    #[serde(default)]
    pub sensors: bool,
}

impl LoopStatus {
    pub fn get(&self, name: LoopName) -> bool {
        match name {
            LoopName::Awareness => self.awareness,
            LoopName::Sensors => self.sensors,
        }
    }

    pub fn set(&mut self, name: LoopName, enabled: bool) {
        match name {
            LoopName::Awareness => self.awareness = enabled,
            LoopName::Sensors => self.sensors = enabled,
        }
    }
}
