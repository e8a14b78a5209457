//! # Protocol Scripts
//!
//! A protocol script is a JSON program of steps run against one session.
//! Containers are created under a binding name and referred to by that name
//! afterwards:
//!
//! ```json
//! {"id": "pcr", "name": "PCR setup", "steps": [
//!   {"op": "REPLENISHABLE", "bind": "water", "name": "Water"},
//!   {"op": "NEW_CONTAINER", "bind": "a", "label": "A"},
//!   {"op": "TRANSFER", "volume": 50, "source": "water", "destination": "a"},
//!   {"op": "PLACE", "container": "a", "instrument": "centrifuge_200ul"},
//!   {"op": "CENTRIFUGE", "rotor": "P200"}
//! ]}
//! ```

use crate::command::ThermalStep;
use crate::container::ContainerType;
use crate::error::{self, Error, Result};
use crate::instruments::DEFAULT_SEPARATION_SECONDS;
use crate::instruments::DEFAULT_SHAKE_SPEED_RPM;
use crate::location::{Location, PortKind};
use crate::registry::InstrumentKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// One step of a protocol script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScriptStep {
    // =========================================================================
    // CONTAINERS
    // =========================================================================

    /// Allocate an empty container
    NewContainer {
        bind: String,
        label: String,
        #[serde(default)]
        container_type: ContainerType,
    },

    /// Allocate a pre-stocked reagent source
    Replenishable {
        bind: String,
        name: String,
        #[serde(default)]
        required_volume: f64,
    },

    /// Source tube feeding a robot port
    PortTube { bind: String, port: PortKind },

    // =========================================================================
    // LIQUID HANDLING
    // =========================================================================
    Transfer {
        volume: f64,
        source: String,
        destination: String,
    },

    Mix {
        volume: f64,
        container: String,
        repetitions: u32,
    },

    // =========================================================================
    // ROBOT
    // =========================================================================

    /// Move a container to a named location
    Move { container: String, to: Location },

    /// Move a container onto an instrument, wherever the layout puts it
    Place {
        container: String,
        instrument: InstrumentKind,
    },

    OpenPort { port: PortKind },

    ClosePort { port: PortKind },

    // =========================================================================
    // INSTRUMENTS
    // =========================================================================
    Wait { seconds: u64 },

    Cap,

    /// Spin the centrifuge for `rotor`; omitted settings give a quick spin-down
    Centrifuge {
        rotor: ContainerType,
        #[serde(default)]
        speed_rpm: Option<u32>,
        #[serde(default)]
        duration_seconds: Option<u64>,
    },

    MeasureFluorescence {
        #[serde(default)]
        store_to: Option<String>,
    },

    Heat {
        temperature_celsius: f64,
        #[serde(default)]
        duration_minutes: Option<f64>,
    },

    Incubate {
        #[serde(default)]
        temperature_celsius: Option<f64>,
        #[serde(default = "default_shake_speed")]
        speed_rpm: u32,
        #[serde(default)]
        duration_seconds: Option<u64>,
    },

    Separate {
        rack: ContainerType,
        #[serde(default = "default_separation")]
        duration_seconds: u64,
    },

    OpenLid,

    CloseLid,

    RunThermalProgram { program: Vec<ThermalStep> },

    StartSequencing {
        run_name: String,
        #[serde(default)]
        output_directory: String,
    },

    StopSequencing,

    SetFridgeTemperature { celsius: f64 },

    // =========================================================================
    // CHECKS
    // =========================================================================

    /// Fail the run unless the container holds `volume` uL (within `tolerance`)
    AssertVolume {
        container: String,
        volume: f64,
        #[serde(default = "default_tolerance")]
        tolerance: f64,
    },
}

fn default_shake_speed() -> u32 {
    DEFAULT_SHAKE_SPEED_RPM
}

fn default_separation() -> u64 {
    DEFAULT_SEPARATION_SECONDS
}

fn default_tolerance() -> f64 {
    1e-6
}

impl ScriptStep {
    /// Wire name of the step
    pub fn op_name(&self) -> &'static str {
        match self {
            ScriptStep::NewContainer { .. } => "NEW_CONTAINER",
            ScriptStep::Replenishable { .. } => "REPLENISHABLE",
            ScriptStep::PortTube { .. } => "PORT_TUBE",
            ScriptStep::Transfer { .. } => "TRANSFER",
            ScriptStep::Mix { .. } => "MIX",
            ScriptStep::Move { .. } => "MOVE",
            ScriptStep::Place { .. } => "PLACE",
            ScriptStep::OpenPort { .. } => "OPEN_PORT",
            ScriptStep::ClosePort { .. } => "CLOSE_PORT",
            ScriptStep::Wait { .. } => "WAIT",
            ScriptStep::Cap => "CAP",
            ScriptStep::Centrifuge { .. } => "CENTRIFUGE",
            ScriptStep::MeasureFluorescence { .. } => "MEASURE_FLUORESCENCE",
            ScriptStep::Heat { .. } => "HEAT",
            ScriptStep::Incubate { .. } => "INCUBATE",
            ScriptStep::Separate { .. } => "SEPARATE",
            ScriptStep::OpenLid => "OPEN_LID",
            ScriptStep::CloseLid => "CLOSE_LID",
            ScriptStep::RunThermalProgram { .. } => "RUN_THERMAL_PROGRAM",
            ScriptStep::StartSequencing { .. } => "START_SEQUENCING",
            ScriptStep::StopSequencing => "STOP_SEQUENCING",
            ScriptStep::SetFridgeTemperature { .. } => "SET_FRIDGE_TEMPERATURE",
            ScriptStep::AssertVolume { .. } => "ASSERT_VOLUME",
        }
    }

    /// Binding this step introduces
    pub fn binds(&self) -> Option<&str> {
        match self {
            ScriptStep::NewContainer { bind, .. }
            | ScriptStep::Replenishable { bind, .. }
            | ScriptStep::PortTube { bind, .. } => Some(bind.as_str()),
            _ => None,
        }
    }

    /// Bindings this step reads
    pub fn uses(&self) -> Vec<&str> {
        match self {
            ScriptStep::Transfer {
                source, destination, ..
            } => vec![source.as_str(), destination.as_str()],
            ScriptStep::Mix { container, .. }
            | ScriptStep::Move { container, .. }
            | ScriptStep::Place { container, .. }
            | ScriptStep::AssertVolume { container, .. } => vec![container.as_str()],
            _ => vec![],
        }
    }

    /// Format into (name, details) for pretty printing
    fn format_parts(&self) -> (&'static str, String) {
        let details = match self {
            ScriptStep::NewContainer {
                bind,
                label,
                container_type,
            } => format!("{} = \"{}\" ({})", bind, label, container_type),
            ScriptStep::Replenishable {
                bind,
                name,
                required_volume,
            } => format!("{} = \"{}\" [{} uL stock]", bind, name, required_volume),
            ScriptStep::PortTube { bind, port } => format!("{} = {}", bind, port),
            ScriptStep::Transfer {
                volume,
                source,
                destination,
            } => format!("{} uL {} → {}", volume, source, destination),
            ScriptStep::Mix {
                volume,
                container,
                repetitions,
            } => format!("{} uL × {} in {}", volume, repetitions, container),
            ScriptStep::Move { container, to } => format!("{} → {}", container, to),
            ScriptStep::Place { container, instrument } => format!("{} → [{}]", container, instrument),
            ScriptStep::OpenPort { port } | ScriptStep::ClosePort { port } => port.to_string(),
            ScriptStep::Wait { seconds } => format!("{}s", seconds),
            ScriptStep::Centrifuge {
                rotor,
                speed_rpm,
                duration_seconds,
            } => format!("{} {:?}rpm {:?}s", rotor, speed_rpm, duration_seconds),
            ScriptStep::MeasureFluorescence { store_to } => store_to
                .as_ref()
                .map(|s| format!("→ {}", s))
                .unwrap_or_default(),
            ScriptStep::Heat {
                temperature_celsius,
                duration_minutes,
            } => format!("{}°C {:?}min", temperature_celsius, duration_minutes),
            ScriptStep::Incubate {
                temperature_celsius,
                speed_rpm,
                duration_seconds,
            } => format!("{:?}°C {}rpm {:?}s", temperature_celsius, speed_rpm, duration_seconds),
            ScriptStep::Separate { rack, duration_seconds } => format!("{} {}s", rack, duration_seconds),
            ScriptStep::RunThermalProgram { program } => format!("{} steps", program.len()),
            ScriptStep::StartSequencing { run_name, .. } => run_name.clone(),
            ScriptStep::SetFridgeTemperature { celsius } => format!("{}°C", celsius),
            ScriptStep::AssertVolume {
                container, volume, ..
            } => format!("{} == {} uL", container, volume),
            ScriptStep::Cap | ScriptStep::OpenLid | ScriptStep::CloseLid | ScriptStep::StopSequencing => {
                String::new()
            }
        };
        (self.op_name(), details)
    }
}

/// A protocol script with metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub steps: Vec<ScriptStep>,
}

impl Script {
    pub fn new(id: impl Into<String>, name: impl Into<String>, steps: Vec<ScriptStep>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            steps,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            error::parse_error(format!("invalid script: {}", e))
                .with_operation("script::parse")
                .set_source(e)
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::from(e)
                .with_operation("script::load")
                .with_context("path", path.display().to_string())
        })?;
        Self::from_json(&content)
    }

    /// Check that every binding is introduced before it is used
    pub fn check_bindings(&self) -> Result<()> {
        let mut bound: HashSet<&str> = HashSet::new();
        for (n, step) in (1..).zip(self.steps.iter()) {
            for name in step.uses() {
                if !bound.contains(name) {
                    return Err(Error::unknown_binding(name)
                        .with_operation("script::check_bindings")
                        .with_context("step", n.to_string())
                        .with_context("op", step.op_name()));
                }
            }
            if let Some(name) = step.binds() {
                bound.insert(name);
            }
        }
        Ok(())
    }

    /// Pretty print the script to stdout
    pub fn pretty_print(&self) {
        println!("--- {} ---", self.name);
        println!("ID: {}", self.id);
        if let Some(desc) = &self.description {
            println!("{}", desc);
        }
        println!("Steps: {}", self.steps.len());
        println!();

        for (i, step) in self.steps.iter().enumerate() {
            let (name, details) = step.format_parts();
            if details.is_empty() {
                println!("{:3} | {}", i, name);
            } else {
                println!("{:3} | {} {}", i, name, details);
            }
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_step_serialization() {
        let step = ScriptStep::Transfer {
            volume: 50.0,
            source: "water".into(),
            destination: "a".into(),
        };
        let json = serde_json::to_string(&step).unwrap();
        assert!(json.contains("\"op\":\"TRANSFER\""));

        let parsed: ScriptStep = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, step);
    }

    #[test]
    fn test_defaults() {
        let steps: Vec<ScriptStep> = serde_json::from_str(
            r#"[
                {"op": "NEW_CONTAINER", "bind": "a", "label": "A"},
                {"op": "INCUBATE", "temperature_celsius": 37},
                {"op": "SEPARATE", "rack": "P1500"},
                {"op": "CAP"},
                {"op": "MEASURE_FLUORESCENCE"}
            ]"#,
        )
        .unwrap();

        assert_eq!(
            steps[0],
            ScriptStep::NewContainer {
                bind: "a".into(),
                label: "A".into(),
                container_type: ContainerType::P200,
            }
        );
        assert_eq!(
            steps[1],
            ScriptStep::Incubate {
                temperature_celsius: Some(37.0),
                speed_rpm: 1300,
                duration_seconds: None,
            }
        );
        assert_eq!(
            steps[2],
            ScriptStep::Separate {
                rack: ContainerType::P1500,
                duration_seconds: 60,
            }
        );
        assert_eq!(steps[3], ScriptStep::Cap);
        assert_eq!(steps[4], ScriptStep::MeasureFluorescence { store_to: None });
    }

    #[test]
    fn test_place_uses_instrument_names() {
        let step: ScriptStep =
            serde_json::from_str(r#"{"op": "PLACE", "container": "a", "instrument": "centrifuge_200ul"}"#).unwrap();
        assert_eq!(
            step,
            ScriptStep::Place {
                container: "a".into(),
                instrument: InstrumentKind::Centrifuge200uL,
            }
        );
    }

    #[test]
    fn test_binds_and_uses() {
        let step = ScriptStep::PortTube {
            bind: "priming".into(),
            port: PortKind::Priming,
        };
        assert_eq!(step.binds(), Some("priming"));
        assert!(step.uses().is_empty());

        let step = ScriptStep::Transfer {
            volume: 1.0,
            source: "s".into(),
            destination: "d".into(),
        };
        assert_eq!(step.binds(), None);
        assert_eq!(step.uses(), vec!["s", "d"]);
    }

    #[test]
    fn test_check_bindings() {
        let ok = Script::new(
            "ok",
            "ok",
            vec![
                ScriptStep::Replenishable {
                    bind: "w".into(),
                    name: "Water".into(),
                    required_volume: 0.0,
                },
                ScriptStep::NewContainer {
                    bind: "a".into(),
                    label: "A".into(),
                    container_type: ContainerType::P200,
                },
                ScriptStep::Transfer {
                    volume: 10.0,
                    source: "w".into(),
                    destination: "a".into(),
                },
            ],
        );
        assert!(ok.check_bindings().is_ok());

        let bad = Script::new(
            "bad",
            "bad",
            vec![ScriptStep::Mix {
                volume: 10.0,
                container: "ghost".into(),
                repetitions: 3,
            }],
        );
        let err = bad.check_bindings().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownBinding);
        assert_eq!(err.context_value("step"), Some("1"));
    }

    #[test]
    fn test_script_from_json() {
        let script = Script::from_json(
            r#"{"id": "t", "name": "Thermal", "steps": [
                {"op": "RUN_THERMAL_PROGRAM", "program": [
                    {"temperature_celsius": 98, "duration_seconds": 30},
                    {"steps": [{"temperature_celsius": 98, "duration_seconds": 10},
                               {"temperature_celsius": 72, "duration_seconds": 30}], "count": 30}
                ]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(script.description, None);
        match &script.steps[0] {
            ScriptStep::RunThermalProgram { program } => assert_eq!(program.len(), 2),
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn test_bad_script_is_parse_error() {
        let err = Script::from_json(r#"{"id": "x", "name": "x", "steps": [{"op": "DANCE"}]}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailed);
        assert_eq!(err.operation(), "script::parse");
    }
}
