//! # Script Schema
//!
//! Machine-readable description of the protocol script language: every
//! step op with its parameters and an example, the instruments a script can
//! place containers on, and the rules the simulator enforces. Whoever
//! generates scripts gets this as context.

use crate::config::LabLayout;
use crate::registry::InstrumentKind;
use serde::Serialize;

/// Complete script schema
#[derive(Debug, Clone, Serialize)]
pub struct ScriptSchema {
    pub version: &'static str,
    pub description: &'static str,
    pub operations: Vec<OpCategory>,
    pub instruments: Vec<InstrumentSpec>,
    pub rules: Vec<Rule>,
}

impl Default for ScriptSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptSchema {
    pub fn new() -> Self {
        Self::for_layout(&LabLayout::default())
    }

    /// Schema whose instrument table reflects `layout`
    pub fn for_layout(layout: &LabLayout) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            description: "wetlab protocol scripts - JSON programs that allocate containers, move \
                         liquid with the pipette, carry tubes between instruments and run them. \
                         Every step is validated against volume, capacity and placement rules \
                         and recorded in the execution log.",
            operations: Self::define_operations(),
            instruments: InstrumentKind::ALL
                .into_iter()
                .map(|kind| InstrumentSpec {
                    name: kind.as_str(),
                    location: layout.location_of(kind).to_string(),
                    needs_containers: kind.requires_members(),
                })
                .collect(),
            rules: Self::define_rules(),
        }
    }

    /// Render as Markdown text
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        out.push_str("# wetlab Protocol Scripts\n\n");
        out.push_str(self.description);
        out.push_str("\n\n");

        out.push_str("## Operations\n\n");
        for category in &self.operations {
            out.push_str(&format!("### {}\n", category.name));
            out.push_str(&format!("{}\n\n", category.description));
            for op in &category.ops {
                out.push_str(&format!("- **{}**: {}\n", op.name, op.description));
                if !op.params.is_empty() {
                    out.push_str(&format!("  - Params: {}\n", op.params.join(", ")));
                }
                if let Some(example) = &op.example {
                    out.push_str(&format!("  - Example: `{}`\n", example));
                }
            }
            out.push('\n');
        }

        out.push_str("## Instruments\n\n");
        for inst in &self.instruments {
            let note = if inst.needs_containers { " (refuses to run empty)" } else { "" };
            out.push_str(&format!("- `{}` at `{}`{}\n", inst.name, inst.location, note));
        }
        out.push('\n');

        out.push_str("## Rules\n\n");
        for rule in &self.rules {
            out.push_str(&format!("### {}\n{}\n\n", rule.title, rule.content));
        }

        out
    }

    /// Render as JSON for structured consumption
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Every op name the interpreter understands
    pub fn op_names(&self) -> Vec<&'static str> {
        self.operations
            .iter()
            .flat_map(|c| c.ops.iter().map(|op| op.name))
            .collect()
    }

    fn define_operations() -> Vec<OpCategory> {
        vec![
            OpCategory {
                name: "Containers",
                description: "Create containers and bind them to names used by later steps.",
                ops: vec![
                    OpSpec {
                        name: "NEW_CONTAINER",
                        description: "Allocate an empty tube",
                        params: vec!["bind: string", "label: string", "container_type?: P200|P1500|P50K"],
                        example: Some(r#"{"op": "NEW_CONTAINER", "bind": "a", "label": "Sample A", "container_type": "P200"}"#),
                    },
                    OpSpec {
                        name: "REPLENISHABLE",
                        description: "Pre-stocked reagent source that never runs dry",
                        params: vec!["bind: string", "name: string", "required_volume?: uL"],
                        example: Some(r#"{"op": "REPLENISHABLE", "bind": "water", "name": "Nuclease-free water"}"#),
                    },
                    OpSpec {
                        name: "PORT_TUBE",
                        description: "Source tube feeding a robot port",
                        params: vec!["bind: string", "port: PRIMING|SPOTON"],
                        example: Some(r#"{"op": "PORT_TUBE", "bind": "flush", "port": "PRIMING"}"#),
                    },
                ],
            },
            OpCategory {
                name: "Liquid handling",
                description: "Pipette operations. Volumes are in uL.",
                ops: vec![
                    OpSpec {
                        name: "TRANSFER",
                        description: "Move liquid from source to destination",
                        params: vec!["volume: uL", "source: binding", "destination: binding"],
                        example: Some(r#"{"op": "TRANSFER", "volume": 50, "source": "water", "destination": "a"}"#),
                    },
                    OpSpec {
                        name: "MIX",
                        description: "Pipette up and down in place",
                        params: vec!["volume: uL", "container: binding", "repetitions: integer"],
                        example: Some(r#"{"op": "MIX", "volume": 20, "container": "a", "repetitions": 10}"#),
                    },
                ],
            },
            OpCategory {
                name: "Robot",
                description: "Carry containers between locations and operate ports.",
                ops: vec![
                    OpSpec {
                        name: "PLACE",
                        description: "Move a container onto an instrument",
                        params: vec!["container: binding", "instrument: instrument name"],
                        example: Some(r#"{"op": "PLACE", "container": "a", "instrument": "thermal_cycler"}"#),
                    },
                    OpSpec {
                        name: "MOVE",
                        description: "Move a container to a location by name",
                        params: vec!["container: binding", "to: location"],
                        example: Some(r#"{"op": "MOVE", "container": "a", "to": "ContainerHolder"}"#),
                    },
                    OpSpec {
                        name: "OPEN_PORT",
                        description: "Open a port",
                        params: vec!["port: PRIMING|SPOTON"],
                        example: None,
                    },
                    OpSpec {
                        name: "CLOSE_PORT",
                        description: "Close a port",
                        params: vec!["port: PRIMING|SPOTON"],
                        example: None,
                    },
                ],
            },
            OpCategory {
                name: "Instruments",
                description: "Run the instrument holding the containers placed on it.",
                ops: vec![
                    OpSpec {
                        name: "WAIT",
                        description: "Pause",
                        params: vec!["seconds: integer"],
                        example: Some(r#"{"op": "WAIT", "seconds": 300}"#),
                    },
                    OpSpec {
                        name: "CAP",
                        description: "Cap the tubes on the capper",
                        params: vec![],
                        example: None,
                    },
                    OpSpec {
                        name: "CENTRIFUGE",
                        description: "Spin the centrifuge for the given rotor (default 2500 rpm, 15 s)",
                        params: vec!["rotor: P200|P1500", "speed_rpm?: integer", "duration_seconds?: integer"],
                        example: Some(r#"{"op": "CENTRIFUGE", "rotor": "P1500", "speed_rpm": 12000, "duration_seconds": 60}"#),
                    },
                    OpSpec {
                        name: "MEASURE_FLUORESCENCE",
                        description: "Read every tube on the fluorometer (max 8)",
                        params: vec!["store_to?: name"],
                        example: Some(r#"{"op": "MEASURE_FLUORESCENCE", "store_to": "qubit"}"#),
                    },
                    OpSpec {
                        name: "HEAT",
                        description: "Heat the 1.5 mL heating block",
                        params: vec!["temperature_celsius: number", "duration_minutes?: number"],
                        example: Some(r#"{"op": "HEAT", "temperature_celsius": 65, "duration_minutes": 10}"#),
                    },
                    OpSpec {
                        name: "INCUBATE",
                        description: "Heat and/or shake on the heater-shaker",
                        params: vec!["temperature_celsius?: number", "speed_rpm?: integer (1300)", "duration_seconds?: integer"],
                        example: Some(r#"{"op": "INCUBATE", "temperature_celsius": 37, "duration_seconds": 900}"#),
                    },
                    OpSpec {
                        name: "SEPARATE",
                        description: "Pellet beads on the magnetic rack for the given tier",
                        params: vec!["rack: P200|P1500", "duration_seconds?: integer (60)"],
                        example: Some(r#"{"op": "SEPARATE", "rack": "P200", "duration_seconds": 120}"#),
                    },
                    OpSpec {
                        name: "OPEN_LID",
                        description: "Open the thermal cycler lid",
                        params: vec![],
                        example: None,
                    },
                    OpSpec {
                        name: "CLOSE_LID",
                        description: "Close the thermal cycler lid",
                        params: vec![],
                        example: None,
                    },
                    OpSpec {
                        name: "RUN_THERMAL_PROGRAM",
                        description: "Run holds and cycles on the thermal cycler",
                        params: vec!["program: [{temperature_celsius, duration_seconds} | {steps, count}]"],
                        example: Some(r#"{"op": "RUN_THERMAL_PROGRAM", "program": [{"temperature_celsius": 95, "duration_seconds": 180}, {"steps": [{"temperature_celsius": 95, "duration_seconds": 15}, {"temperature_celsius": 60, "duration_seconds": 30}], "count": 30}]}"#),
                    },
                    OpSpec {
                        name: "START_SEQUENCING",
                        description: "Start a sequencing run",
                        params: vec!["run_name: string", "output_directory?: string"],
                        example: None,
                    },
                    OpSpec {
                        name: "STOP_SEQUENCING",
                        description: "Stop the sequencing run",
                        params: vec![],
                        example: None,
                    },
                    OpSpec {
                        name: "SET_FRIDGE_TEMPERATURE",
                        description: "Set the refrigerator target temperature",
                        params: vec!["celsius: number"],
                        example: None,
                    },
                ],
            },
            OpCategory {
                name: "Checks",
                description: "Assertions that stop the run when they fail.",
                ops: vec![OpSpec {
                    name: "ASSERT_VOLUME",
                    description: "Require a container to hold a volume",
                    params: vec!["container: binding", "volume: uL", "tolerance?: uL"],
                    example: Some(r#"{"op": "ASSERT_VOLUME", "container": "a", "volume": 50}"#),
                }],
            },
        ]
    }

    fn define_rules() -> Vec<Rule> {
        vec![
            Rule {
                title: "Volume",
                content: "A transfer fails with InsufficientVolume when a non-replenishable source \
                         holds less than the requested volume, and with Overflow when the \
                         destination would exceed its capacity. Containers labeled with 'waste' \
                         never overflow.",
            },
            Rule {
                title: "Placement",
                content: "A container sits on at most one instrument. Instruments run only the \
                         containers placed on them, and most refuse to run with none.",
            },
            Rule {
                title: "Failure",
                content: "The first failing step ends the run. The failure is reported as a single \
                         'Kind: message' line and nothing is written to the execution log.",
            },
        ]
    }
}

/// A category of ops
#[derive(Debug, Clone, Serialize)]
pub struct OpCategory {
    pub name: &'static str,
    pub description: &'static str,
    pub ops: Vec<OpSpec>,
}

/// Description of a single op
#[derive(Debug, Clone, Serialize)]
pub struct OpSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<&'static str>,
    pub example: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstrumentSpec {
    pub name: &'static str,
    pub location: String,
    pub needs_containers: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Rule {
    pub title: &'static str,
    pub content: &'static str,
}
