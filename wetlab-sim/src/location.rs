//! Physical locations and robot-accessible ports

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier naming a physical slot (an instrument's deck, a holder rack, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Location(String);

impl Location {
    pub fn new(description: impl Into<String>) -> Self {
        Self(description.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Location {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Location {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ports the robot can open and close
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortKind {
    #[serde(rename = "PRIMING")]
    Priming,
    #[serde(rename = "SPOTON")]
    SpotOn,
}

impl PortKind {
    /// Name used on the wire and as the label of the port's source tube
    pub fn name(&self) -> &'static str {
        match self {
            PortKind::Priming => "PRIMING",
            PortKind::SpotOn => "SPOTON",
        }
    }

    /// Human-readable port description
    pub fn description(&self) -> &'static str {
        match self {
            PortKind::Priming => "Priming-Port",
            PortKind::SpotOn => "SpotON",
        }
    }
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
