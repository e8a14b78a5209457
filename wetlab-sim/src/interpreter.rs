//! # Script Interpreter
//!
//! Runs a `Script` step by step against a session, resolving binding names
//! to containers and keeping a trace of what every step did. The first
//! failing step stops the run; its error carries the step index.

use crate::container::{ContainerId, ContainerType};
use crate::error::{Error, Result};
use crate::instruments::{SPIN_DOWN_SECONDS, SPIN_DOWN_SPEED_RPM};
use crate::script::{Script, ScriptStep};
use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// One executed script step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub step: usize,
    pub op: String,
    pub result: String,
}

pub struct Interpreter {
    session: Session,
    bindings: HashMap<String, ContainerId>,
    readings: HashMap<String, Vec<i64>>,
    trace: Vec<ExecutionStep>,
}

impl Interpreter {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            bindings: HashMap::new(),
            readings: HashMap::new(),
            trace: Vec::new(),
        }
    }

    /// Run every step of `script` in order. Steps are numbered from 1, like
    /// command ids.
    pub fn run(&mut self, script: &Script) -> Result<()> {
        info!(script = %script.id, steps = script.steps.len(), "running script");
        for (n, step) in (1..).zip(script.steps.iter()) {
            let result = self.execute(step).map_err(|e| {
                e.with_context("step", n.to_string())
                    .with_context("op", step.op_name())
            })?;
            debug!(step = n, op = step.op_name(), %result);
            self.trace.push(ExecutionStep {
                step: n,
                op: step.op_name().to_string(),
                result,
            });
        }
        Ok(())
    }

    /// Execute a single step, returning a short description of the outcome
    pub fn execute(&mut self, step: &ScriptStep) -> Result<String> {
        match step {
            ScriptStep::NewContainer {
                bind,
                label,
                container_type,
            } => {
                let id = self.session.new_empty(label.as_str(), *container_type)?;
                self.bind(bind, id);
                Ok(format!("{} = #{} ({})", bind, id, container_type))
            }

            ScriptStep::Replenishable {
                bind,
                name,
                required_volume,
            } => {
                let id = self.session.new_replenishable(name.as_str(), *required_volume)?;
                self.bind(bind, id);
                let tier = self.session.container(id)?.container_type();
                Ok(format!("{} = #{} ({}, replenishable)", bind, id, tier))
            }

            ScriptStep::PortTube { bind, port } => {
                let id = self.session.port_tube(*port)?;
                self.bind(bind, id);
                Ok(format!("{} = #{} ({} tube)", bind, id, port.description()))
            }

            ScriptStep::Transfer {
                volume,
                source,
                destination,
            } => {
                let src = self.resolve(source)?;
                let dst = self.resolve(destination)?;
                self.session.pipette().transfer(*volume, src, dst)?;
                let now = self.session.container(dst)?.volume();
                Ok(format!("{} uL {} → {} ({} now {} uL)", volume, source, destination, destination, now))
            }

            ScriptStep::Mix {
                volume,
                container,
                repetitions,
            } => {
                let id = self.resolve(container)?;
                self.session.pipette().mix(*volume, id, *repetitions)?;
                Ok(format!("mixed {} × {} uL", container, volume))
            }

            ScriptStep::Move { container, to } => {
                let id = self.resolve(container)?;
                self.session.robot().move_container(id, to.clone())?;
                Ok(format!("{} → {}", container, to))
            }

            ScriptStep::Place { container, instrument } => {
                let id = self.resolve(container)?;
                let to = self.session.registry().location_of(*instrument).clone();
                self.session.robot().move_container(id, to.clone())?;
                Ok(format!("{} → {}", container, to))
            }

            ScriptStep::OpenPort { port } => {
                self.session.robot().open_port(*port)?;
                Ok(format!("{} open", port))
            }

            ScriptStep::ClosePort { port } => {
                self.session.robot().close_port(*port)?;
                Ok(format!("{} closed", port))
            }

            ScriptStep::Wait { seconds } => {
                self.session.timer().wait(*seconds)?;
                Ok(format!("waited {}s", seconds))
            }

            ScriptStep::Cap => {
                self.session.capper().cap()?;
                Ok("capped".to_string())
            }

            ScriptStep::Centrifuge {
                rotor,
                speed_rpm,
                duration_seconds,
            } => {
                let speed = speed_rpm.unwrap_or(SPIN_DOWN_SPEED_RPM);
                let seconds = duration_seconds.unwrap_or(SPIN_DOWN_SECONDS);
                match rotor {
                    ContainerType::P1500 => self.session.centrifuge_1p5ml().run(speed, seconds)?,
                    ContainerType::P200 => self.session.centrifuge_200ul().run(speed, seconds)?,
                    ContainerType::P50K => return Err(no_instrument_for("centrifuge", *rotor)),
                }
                Ok(format!("spun {} at {} rpm for {}s", rotor, speed, seconds))
            }

            ScriptStep::MeasureFluorescence { store_to } => {
                let readings = self.session.fluorometer().measure_fluorescence()?;
                let summary = format!("{} readings", readings.len());
                if let Some(name) = store_to {
                    self.readings.insert(name.clone(), readings);
                    return Ok(format!("{} → {}", summary, name));
                }
                Ok(summary)
            }

            ScriptStep::Heat {
                temperature_celsius,
                duration_minutes,
            } => {
                self.session.heater().start(*temperature_celsius, *duration_minutes)?;
                Ok(format!("heating at {}°C", temperature_celsius))
            }

            ScriptStep::Incubate {
                temperature_celsius,
                speed_rpm,
                duration_seconds,
            } => {
                self.session
                    .heater_shaker()
                    .incubate(*temperature_celsius, *speed_rpm, *duration_seconds)?;
                Ok(format!("shaking at {} rpm", speed_rpm))
            }

            ScriptStep::Separate { rack, duration_seconds } => {
                match rack {
                    ContainerType::P1500 => self.session.magrack_1p5ml().separate(*duration_seconds)?,
                    ContainerType::P200 => self.session.magrack_200ul().separate(*duration_seconds)?,
                    ContainerType::P50K => return Err(no_instrument_for("magnetic rack", *rack)),
                }
                Ok(format!("separated for {}s", duration_seconds))
            }

            ScriptStep::OpenLid => {
                self.session.thermal_cycler().open_lid()?;
                Ok("lid open".to_string())
            }

            ScriptStep::CloseLid => {
                self.session.thermal_cycler().close_lid()?;
                Ok("lid closed".to_string())
            }

            ScriptStep::RunThermalProgram { program } => {
                let total: u64 = program.iter().map(|s| s.duration_seconds()).sum();
                self.session.thermal_cycler().run_protocol(program.clone())?;
                Ok(format!("{} program steps, {}s total", program.len(), total))
            }

            ScriptStep::StartSequencing {
                run_name,
                output_directory,
            } => {
                self.session
                    .sequencer()
                    .start_run(run_name.as_str(), output_directory.as_str())?;
                Ok(format!("sequencing run '{}' started", run_name))
            }

            ScriptStep::StopSequencing => {
                self.session.sequencer().stop_run()?;
                Ok("sequencing stopped".to_string())
            }

            ScriptStep::SetFridgeTemperature { celsius } => {
                self.session.refrigerator().set_target_temperature(*celsius)?;
                Ok(format!("refrigerator set to {}°C", celsius))
            }

            ScriptStep::AssertVolume {
                container,
                volume,
                tolerance,
            } => {
                let id = self.resolve(container)?;
                let actual = self.session.container(id)?.volume();
                if (actual - volume).abs() > *tolerance {
                    return Err(Error::assertion_failed(format!(
                        "Expected {} to hold {} uL, found {} uL.",
                        container, volume, actual
                    )));
                }
                Ok(format!("{} holds {} uL", container, actual))
            }
        }
    }

    fn bind(&mut self, name: &str, id: ContainerId) {
        if let Some(previous) = self.bindings.insert(name.to_string(), id) {
            debug!(binding = name, %previous, %id, "binding rebound");
        }
    }

    fn resolve(&self, name: &str) -> Result<ContainerId> {
        self.bindings
            .get(name)
            .copied()
            .ok_or_else(|| Error::unknown_binding(name))
    }

    pub fn binding(&self, name: &str) -> Option<ContainerId> {
        self.bindings.get(name).copied()
    }

    /// Readings stored by `MEASURE_FLUORESCENCE`
    pub fn readings(&self, name: &str) -> Option<&[i64]> {
        self.readings.get(name).map(Vec::as_slice)
    }

    pub fn stored_readings(&self) -> &HashMap<String, Vec<i64>> {
        &self.readings
    }

    pub fn trace(&self) -> &[ExecutionStep] {
        &self.trace
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }
}

fn no_instrument_for(what: &str, tier: ContainerType) -> Error {
    Error::invalid_argument(format!("there is no {} for {} tubes", what, tier))
        .with_context("container_type", tier.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ThermalStep;
    use crate::config::LabConfig;
    use crate::error::ErrorKind;
    use crate::location::{Location, PortKind};
    use crate::log::MemorySink;
    use crate::registry::InstrumentKind;

    fn interpreter() -> Interpreter {
        Interpreter::new(Session::with_sink(LabConfig::default(), MemorySink::new()).unwrap())
    }

    fn new_tube(bind: &str) -> ScriptStep {
        ScriptStep::NewContainer {
            bind: bind.into(),
            label: bind.to_uppercase(),
            container_type: ContainerType::P200,
        }
    }

    fn move_step(container: &str, to: &str) -> ScriptStep {
        ScriptStep::Move {
            container: container.into(),
            to: Location::new(to),
        }
    }

    fn water() -> ScriptStep {
        ScriptStep::Replenishable {
            bind: "water".into(),
            name: "Water".into(),
            required_volume: 0.0,
        }
    }

    #[test]
    fn test_run_simple_script() {
        let script = Script::new(
            "prep",
            "Prep",
            vec![
                water(),
                new_tube("a"),
                ScriptStep::Transfer {
                    volume: 50.0,
                    source: "water".into(),
                    destination: "a".into(),
                },
                ScriptStep::Place {
                    container: "a".into(),
                    instrument: InstrumentKind::Centrifuge200uL,
                },
                ScriptStep::Centrifuge {
                    rotor: ContainerType::P200,
                    speed_rpm: None,
                    duration_seconds: None,
                },
                ScriptStep::AssertVolume {
                    container: "a".into(),
                    volume: 50.0,
                    tolerance: 1e-6,
                },
            ],
        );

        let mut interp = interpreter();
        interp.run(&script).unwrap();

        assert_eq!(interp.trace().len(), 6);
        assert_eq!(interp.trace()[2].op, "TRANSFER");
        let a = interp.binding("a").unwrap();
        assert_eq!(interp.session().container(a).unwrap().volume(), 50.0);

        let names: Vec<_> = interp.session().log().iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec!["container_get", "container_allocate", "pipette_move", "robot_move_container", "centrifuge_start"]
        );
    }

    #[test]
    fn test_failure_reports_step() {
        let script = Script::new(
            "bad",
            "Bad",
            vec![
                water(),
                new_tube("a"),
                new_tube("b"),
                ScriptStep::Transfer {
                    volume: 10.0,
                    source: "a".into(),
                    destination: "b".into(),
                },
                ScriptStep::Wait { seconds: 5 },
            ],
        );

        let mut interp = interpreter();
        let err = interp.run(&script).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientVolume);
        assert_eq!(err.context_value("step"), Some("4"));
        assert_eq!(err.context_value("op"), Some("TRANSFER"));
        assert_eq!(interp.trace().len(), 3);
        assert_eq!(interp.trace()[0].step, 1);
        assert_eq!(interp.session().log().len(), 3);
    }

    #[test]
    fn test_unknown_binding() {
        let mut interp = interpreter();
        let err = interp
            .execute(&ScriptStep::Mix {
                volume: 5.0,
                container: "nope".into(),
                repetitions: 2,
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownBinding);
    }

    #[test]
    fn test_readings_are_stored() {
        let mut interp = interpreter();
        interp.execute(&new_tube("s1")).unwrap();
        interp.execute(&new_tube("s2")).unwrap();
        interp.execute(&move_step("s1", "fluorometer")).unwrap();
        interp.execute(&move_step("s2", "fluorometer")).unwrap();
        interp
            .execute(&ScriptStep::MeasureFluorescence {
                store_to: Some("qubit".into()),
            })
            .unwrap();

        assert_eq!(interp.readings("qubit"), Some(&[-1, -1][..]));
        assert_eq!(interp.readings("other"), None);
    }

    #[test]
    fn test_assert_volume_failure() {
        let mut interp = interpreter();
        interp.execute(&new_tube("a")).unwrap();
        let err = interp
            .execute(&ScriptStep::AssertVolume {
                container: "a".into(),
                volume: 20.0,
                tolerance: 1e-6,
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AssertionFailed);
        assert_eq!(err.feedback(), "AssertionFailed: Expected a to hold 20 uL, found 0 uL.");
    }

    #[test]
    fn test_no_centrifuge_for_conical_tubes() {
        let mut interp = interpreter();
        let err = interp
            .execute(&ScriptStep::Centrifuge {
                rotor: ContainerType::P50K,
                speed_rpm: Some(3000),
                duration_seconds: Some(60),
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(interp.session().log().is_empty());
    }

    #[test]
    fn test_port_and_sequencing_steps() {
        let mut interp = interpreter();
        interp
            .execute(&ScriptStep::PortTube {
                bind: "flush".into(),
                port: PortKind::Priming,
            })
            .unwrap();
        interp.execute(&ScriptStep::OpenPort { port: PortKind::Priming }).unwrap();
        interp.execute(&new_tube("lib")).unwrap();
        interp
            .execute(&ScriptStep::Transfer {
                volume: 75.0,
                source: "flush".into(),
                destination: "lib".into(),
            })
            .unwrap();
        interp.execute(&ScriptStep::ClosePort { port: PortKind::Priming }).unwrap();
        interp
            .execute(&ScriptStep::StartSequencing {
                run_name: "run1".into(),
                output_directory: "/data".into(),
            })
            .unwrap();
        interp.execute(&ScriptStep::StopSequencing).unwrap();

        let flush = interp.binding("flush").unwrap();
        assert_eq!(interp.session().container(flush).unwrap().label(), "PRIMING");
        assert_eq!(interp.session().log().len(), 7);
    }

    #[test]
    fn test_thermal_program_step() {
        let mut interp = interpreter();
        interp.execute(&new_tube("pcr")).unwrap();
        interp
            .execute(&ScriptStep::Place {
                container: "pcr".into(),
                instrument: InstrumentKind::ThermalCycler,
            })
            .unwrap();
        let result = interp
            .execute(&ScriptStep::RunThermalProgram {
                program: vec![ThermalStep::hold(95.0, 120), ThermalStep::hold(4.0, 60)],
            })
            .unwrap();
        assert_eq!(result, "2 program steps, 180s total");
    }
}
