//! # Commands
//!
//! The machine-command vocabulary the simulator emits. Each `Action`
//! variant carries its typed parameters; the bus wraps it into a `Command`
//! with a sequence id, the resolved container type and, for the actions
//! that need one, a snapshot of what is on the machine.
//!
//! ## Wire format
//!
//! ```json
//! {"id": 7, "action": "pipette_move",
//!  "parameters": {"dst_container_index": 1001, "src_container_index": 1000,
//!                 "volume": 50.0, "container_type": "P200"}}
//! ```
//!
//! `parameters.container_type` is always present and reads `"Unknown"` when
//! it could not be resolved.

use crate::container::{ContainerId, ContainerType};
use crate::error::{self, Error, Result};
use crate::location::{Location, PortKind};
use crate::registry::InstrumentKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Spelling of an unresolved container type on the wire
pub const UNKNOWN_CONTAINER_TYPE: &str = "Unknown";

/// A constant-temperature hold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalHold {
    pub temperature_celsius: f64,
    pub duration_seconds: u64,
}

/// One entry of a thermal cycler program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThermalStep {
    /// Repeat `steps` `count` times
    Cycle { steps: Vec<ThermalHold>, count: u32 },
    Hold(ThermalHold),
}

impl ThermalStep {
    pub fn hold(temperature_celsius: f64, duration_seconds: u64) -> Self {
        ThermalStep::Hold(ThermalHold {
            temperature_celsius,
            duration_seconds,
        })
    }

    pub fn cycle(steps: Vec<ThermalHold>, count: u32) -> Self {
        ThermalStep::Cycle { steps, count }
    }

    /// Total run time of this step in seconds
    pub fn duration_seconds(&self) -> u64 {
        match self {
            ThermalStep::Hold(h) => h.duration_seconds,
            ThermalStep::Cycle { steps, count } => {
                steps.iter().map(|h| h.duration_seconds).sum::<u64>() * u64::from(*count)
            }
        }
    }
}

/// Machine-command vocabulary. Times are seconds, volumes uL, speeds rpm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "parameters", rename_all = "snake_case")]
pub enum Action {
    // =========================================================================
    // CONTAINERS
    // =========================================================================
    ContainerAllocate {
        container_index: ContainerId,
        container_label: String,
    },

    /// A pre-stocked reagent source; `required_volume` is its initial fill
    ContainerGet {
        container_index: ContainerId,
        container_label: String,
        #[serde(default)]
        required_volume: f64,
    },

    // =========================================================================
    // LIQUID HANDLING
    // =========================================================================
    PipetteMove {
        dst_container_index: ContainerId,
        src_container_index: ContainerId,
        volume: f64,
    },

    PipetteMix {
        container_index: ContainerId,
        num: u32,
        volume: f64,
    },

    // =========================================================================
    // ROBOT
    // =========================================================================
    RobotMoveContainer {
        dst_pos: Location,
        container_index: ContainerId,
    },

    OpenPort {
        port: PortKind,
    },

    ClosePort {
        port: PortKind,
    },

    // =========================================================================
    // INSTRUMENTS
    // =========================================================================
    TimerWait {
        time: u64,
    },

    CapperCapContainer {},

    CentrifugeStart {
        time: u64,
        speed: u32,
        container_type: ContainerType,
    },

    /// Readings come back synthesized, one per container on the machine
    FluorometerMeasure {
        num_containers: usize,
    },

    HeaterStart {
        time: Option<f64>,
        temperature: f64,
    },

    HeatershakerStart {
        time: Option<u64>,
        temperature: Option<f64>,
        speed: u32,
    },

    /// Older logs carry no rack tier; it reads `"Unknown"` there
    MagrackWait {
        time: u64,
        #[serde(default, with = "wire_tier")]
        container_type: Option<ContainerType>,
    },

    ThermalCyclerOpenLid {},

    ThermalCyclerCloseLid {},

    ThermalCyclerRunProgram {
        program: Vec<ThermalStep>,
    },

    StartSequencing {
        #[serde(default)]
        run_name: String,
        #[serde(default)]
        output_directory: String,
    },

    StopSequencing {},

    RefrigeratorSetTemperature {
        temperature: f64,
    },
}

impl Action {
    /// Wire name of the action
    pub fn name(&self) -> &'static str {
        match self {
            Action::ContainerAllocate { .. } => "container_allocate",
            Action::ContainerGet { .. } => "container_get",
            Action::PipetteMove { .. } => "pipette_move",
            Action::PipetteMix { .. } => "pipette_mix",
            Action::RobotMoveContainer { .. } => "robot_move_container",
            Action::OpenPort { .. } => "open_port",
            Action::ClosePort { .. } => "close_port",
            Action::TimerWait { .. } => "timer_wait",
            Action::CapperCapContainer {} => "capper_cap_container",
            Action::CentrifugeStart { .. } => "centrifuge_start",
            Action::FluorometerMeasure { .. } => "fluorometer_measure",
            Action::HeaterStart { .. } => "heater_start",
            Action::HeatershakerStart { .. } => "heatershaker_start",
            Action::MagrackWait { .. } => "magrack_wait",
            Action::ThermalCyclerOpenLid {} => "thermal_cycler_open_lid",
            Action::ThermalCyclerCloseLid {} => "thermal_cycler_close_lid",
            Action::ThermalCyclerRunProgram { .. } => "thermal_cycler_run_program",
            Action::StartSequencing { .. } => "start_sequencing",
            Action::StopSequencing {} => "stop_sequencing",
            Action::RefrigeratorSetTemperature { .. } => "refrigerator_set_temperature",
        }
    }

    /// Containers this action refers to, in parameter order
    pub fn container_refs(&self) -> Vec<ContainerId> {
        match self {
            Action::ContainerAllocate { container_index, .. }
            | Action::ContainerGet { container_index, .. }
            | Action::PipetteMix { container_index, .. }
            | Action::RobotMoveContainer { container_index, .. } => vec![*container_index],
            Action::PipetteMove {
                dst_container_index,
                src_container_index,
                ..
            } => vec![*dst_container_index, *src_container_index],
            _ => vec![],
        }
    }

    /// The container whose type labels this command. For a transfer that
    /// is the source.
    pub fn typed_container(&self) -> Option<ContainerId> {
        match self {
            Action::PipetteMove {
                src_container_index, ..
            } => Some(*src_container_index),
            _ => self.container_refs().first().copied(),
        }
    }

    /// Container type carried by the action itself
    pub fn declared_container_type(&self) -> Option<ContainerType> {
        match self {
            Action::CentrifugeStart { container_type, .. } => Some(*container_type),
            Action::MagrackWait { container_type, .. } => *container_type,
            _ => None,
        }
    }

    /// Instrument whose contents are snapshotted into the command
    pub fn snapshot_instrument(&self) -> Option<InstrumentKind> {
        match self {
            Action::HeatershakerStart { .. } => Some(InstrumentKind::HeaterShaker),
            Action::HeaterStart { .. } => Some(InstrumentKind::Heater),
            Action::ThermalCyclerRunProgram { .. } => Some(InstrumentKind::ThermalCycler),
            _ => None,
        }
    }

    /// Typed parameters as a JSON object
    pub fn parameters(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut tagged)) => match tagged.remove("parameters") {
                Some(Value::Object(params)) => params,
                _ => Map::new(),
            },
            _ => Map::new(),
        }
    }
}

/// Snapshot of the containers on a machine when it was started
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Ascending container index order
    pub containers_on_machine: Vec<ContainerId>,
    pub pos: Location,
}

/// One entry of the execution log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireCommand", try_from = "WireCommand")]
pub struct Command {
    pub id: u64,
    pub action: Action,
    pub container_type: Option<ContainerType>,
    pub placement: Option<Placement>,
}

impl Command {
    pub fn name(&self) -> &'static str {
        self.action.name()
    }

    /// Wire spelling of the resolved container type
    pub fn container_type_name(&self) -> &'static str {
        self.container_type
            .map(|t| t.as_str())
            .unwrap_or(UNKNOWN_CONTAINER_TYPE)
    }

    /// Full wire parameters, including the bus-added keys
    pub fn wire_parameters(&self) -> Map<String, Value> {
        let mut parameters = self.action.parameters();
        if let Some(placement) = &self.placement {
            parameters.insert(
                "containers_on_machine".to_string(),
                Value::Array(
                    placement
                        .containers_on_machine
                        .iter()
                        .map(|id| Value::from(id.value()))
                        .collect(),
                ),
            );
            parameters.insert("pos".to_string(), Value::String(placement.pos.to_string()));
        }
        parameters.insert(
            "container_type".to_string(),
            Value::String(self.container_type_name().to_string()),
        );
        parameters
    }

    /// One-line rendering for traces and `wetlab show`
    pub fn summary(&self) -> String {
        let params: Vec<String> = self
            .wire_parameters()
            .iter()
            .filter(|(k, _)| k.as_str() != "container_type")
            .map(|(k, v)| format!("{}={}", k, brief(v)))
            .collect();
        format!(
            "[{:>3}] {:<28} {:<7} {}",
            self.id,
            self.name(),
            self.container_type_name(),
            params.join(" ")
        )
    }
}

fn brief(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Array(items) if items.len() > 4 => format!("[{} items]", items.len()),
        other => other.to_string(),
    }
}

/// `Option<ContainerType>` spelled `"Unknown"` when absent
mod wire_tier {
    use super::UNKNOWN_CONTAINER_TYPE;
    use crate::container::ContainerType;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(tier: &Option<ContainerType>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(tier.map_or(UNKNOWN_CONTAINER_TYPE, |t| t.as_str()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<ContainerType>, D::Error> {
        let name = String::deserialize(deserializer)?;
        if name == UNKNOWN_CONTAINER_TYPE {
            return Ok(None);
        }
        ContainerType::from_wire(&name)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("unknown container type '{}'", name)))
    }
}

/// Serialized shape of a `Command`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireCommand {
    pub id: u64,
    pub action: String,
    pub parameters: Map<String, Value>,
}

impl From<Command> for WireCommand {
    fn from(command: Command) -> Self {
        WireCommand {
            id: command.id,
            action: command.name().to_string(),
            parameters: command.wire_parameters(),
        }
    }
}

impl TryFrom<WireCommand> for Command {
    type Error = Error;

    fn try_from(wire: WireCommand) -> Result<Self> {
        let container_type = match wire.parameters.get("container_type") {
            Some(Value::String(name)) => ContainerType::from_wire(name),
            _ => None,
        };

        let placement = match (wire.parameters.get("containers_on_machine"), wire.parameters.get("pos")) {
            (Some(ids), Some(Value::String(pos))) => {
                let containers_on_machine: Vec<ContainerId> =
                    serde_json::from_value(ids.clone()).map_err(|e| {
                        error::parse_error(format!("command {}: bad containers_on_machine: {}", wire.id, e))
                    })?;
                Some(Placement {
                    containers_on_machine,
                    pos: Location::new(pos.clone()),
                })
            }
            _ => None,
        };

        let id = wire.id;
        let mut tagged = Map::new();
        tagged.insert("action".to_string(), Value::String(wire.action));
        tagged.insert("parameters".to_string(), Value::Object(wire.parameters));
        let action: Action = serde_json::from_value(Value::Object(tagged))
            .map_err(|e| error::parse_error(format!("command {}: {}", id, e)))?;

        Ok(Command {
            id,
            action,
            container_type,
            placement,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pipette_move_wire_shape() {
        let cmd = Command {
            id: 3,
            action: Action::PipetteMove {
                dst_container_index: ContainerId(1001),
                src_container_index: ContainerId(1000),
                volume: 50.0,
            },
            container_type: Some(ContainerType::P200),
            placement: None,
        };

        let value = serde_json::to_value(&cmd).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 3,
                "action": "pipette_move",
                "parameters": {
                    "dst_container_index": 1001,
                    "src_container_index": 1000,
                    "volume": 50.0,
                    "container_type": "P200"
                }
            })
        );
    }

    #[test]
    fn test_parameterless_actions_emit_empty_map() {
        let cmd = Command {
            id: 1,
            action: Action::CapperCapContainer {},
            container_type: None,
            placement: None,
        };
        let value = serde_json::to_value(&cmd).unwrap();
        assert_eq!(value["action"], "capper_cap_container");
        assert_eq!(value["parameters"], json!({"container_type": "Unknown"}));
    }

    #[test]
    fn test_snapshot_fields_on_wire() {
        let cmd = Command {
            id: 9,
            action: Action::HeaterStart {
                time: Some(300.0),
                temperature: 65.0,
            },
            container_type: None,
            placement: Some(Placement {
                containers_on_machine: vec![ContainerId(1000), ContainerId(1002)],
                pos: Location::new("heater"),
            }),
        };
        let value = serde_json::to_value(&cmd).unwrap();
        assert_eq!(value["parameters"]["containers_on_machine"], json!([1000, 1002]));
        assert_eq!(value["parameters"]["pos"], "heater");

        let back: Command = serde_json::from_value(value).unwrap();
        assert_eq!(back, cmd);
    }

    #[test]
    fn test_parse_logged_command() {
        let raw = json!({
            "id": 12,
            "action": "thermal_cycler_run_program",
            "parameters": {
                "program": [
                    {"temperature_celsius": 95.0, "duration_seconds": 180},
                    {"steps": [
                        {"temperature_celsius": 95.0, "duration_seconds": 15},
                        {"temperature_celsius": 60.0, "duration_seconds": 30}
                    ], "count": 30}
                ],
                "containers_on_machine": [],
                "pos": "thermal_cycler",
                "container_type": "Unknown"
            }
        });

        let cmd: Command = serde_json::from_value(raw).unwrap();
        assert_eq!(cmd.container_type, None);
        assert_eq!(cmd.action.snapshot_instrument(), Some(InstrumentKind::ThermalCycler));
        match &cmd.action {
            Action::ThermalCyclerRunProgram { program } => {
                assert_eq!(program.len(), 2);
                assert_eq!(program[0], ThermalStep::hold(95.0, 180));
                assert_eq!(program[1].duration_seconds(), 45 * 30);
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_unknown_action_is_parse_error() {
        let raw = json!({"id": 1, "action": "teleport", "parameters": {}});
        let err = serde_json::from_value::<Command>(raw).unwrap_err();
        assert!(err.to_string().contains("teleport"));
    }

    #[test]
    fn test_typed_container() {
        let mv = Action::PipetteMove {
            dst_container_index: ContainerId(1001),
            src_container_index: ContainerId(1000),
            volume: 1.0,
        };
        assert_eq!(mv.container_refs(), vec![ContainerId(1001), ContainerId(1000)]);
        assert_eq!(mv.typed_container(), Some(ContainerId(1000)));

        let spin = Action::CentrifugeStart {
            time: 15,
            speed: 2500,
            container_type: ContainerType::P200,
        };
        assert_eq!(spin.typed_container(), None);
        assert_eq!(spin.declared_container_type(), Some(ContainerType::P200));
    }

    #[test]
    fn test_untyped_magrack_wait() {
        let raw = json!({
            "id": 4,
            "action": "magrack_wait",
            "parameters": {"time": 120, "container_type": "Unknown"}
        });
        let cmd: Command = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(
            cmd.action,
            Action::MagrackWait {
                time: 120,
                container_type: None
            }
        );
        assert_eq!(cmd.container_type, None);
        assert_eq!(serde_json::to_value(&cmd).unwrap(), raw);

        let bad = json!({"id": 4, "action": "magrack_wait", "parameters": {"time": 1, "container_type": "P7"}});
        assert!(serde_json::from_value::<Command>(bad).is_err());
    }

    #[test]
    fn test_heater_null_time() {
        let action = Action::HeaterStart {
            time: None,
            temperature: 37.0,
        };
        assert_eq!(action.parameters()["time"], Value::Null);
    }
}
