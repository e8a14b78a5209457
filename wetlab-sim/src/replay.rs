//! # Replay
//!
//! Audits a persisted execution log by re-issuing every command through the
//! façades of a fresh session. Containers come back with the same indices,
//! transfers and moves are validated again, and each regenerated command
//! must equal the logged one. The first mismatch is a `ReplayDiverged`
//! error naming the step.

use crate::command::{Action, Command};
use crate::config::LabConfig;
use crate::container::{Container, ContainerAllocator, ContainerType, FIRST_CONTAINER_INDEX};
use crate::error::{self, Result};
use crate::log::{ExecutionLog, MemorySink};
use crate::registry::InstrumentKind;
use crate::session::Session;
use tracing::info;

/// Outcome of a successful replay
#[derive(Debug, Clone)]
pub struct ReplayReport {
    /// Number of commands re-issued
    pub commands: usize,
    /// Final state of every container, in index order
    pub containers: Vec<Container>,
    /// The regenerated log
    pub log: ExecutionLog,
}

impl ReplayReport {
    pub fn container(&self, label: &str) -> Option<&Container> {
        self.containers.iter().find(|c| c.label() == label)
    }
}

/// Re-apply `log` to a fresh session built from `config`
pub fn replay(log: &ExecutionLog, config: LabConfig) -> Result<ReplayReport> {
    log.verify_sequence()?;

    let first = log
        .iter()
        .find_map(|c| match &c.action {
            Action::ContainerAllocate { container_index, .. } | Action::ContainerGet { container_index, .. } => {
                Some(container_index.value())
            }
            _ => None,
        })
        .unwrap_or(FIRST_CONTAINER_INDEX);

    let mut session = Session::build(
        config,
        Box::new(MemorySink::new()),
        ContainerAllocator::starting_at(first),
    )?;

    for (pos, logged) in log.iter().enumerate() {
        let step = pos + 1;
        reissue(&mut session, logged).map_err(|e| {
            error::replay_diverged(step, format!("step {} ({}) failed on replay: {}", step, logged.name(), e.feedback()))
                .set_source(e)
        })?;

        match session.log().steps.get(pos) {
            Some(regenerated) if regenerated == logged => {}
            Some(regenerated) => {
                return Err(error::replay_diverged(
                    step,
                    format!(
                        "step {} differs: logged {} but replay produced {}",
                        step,
                        logged.summary(),
                        regenerated.summary()
                    ),
                ));
            }
            None => {
                return Err(error::replay_diverged(
                    step,
                    format!("step {} ({}) produced no command", step, logged.name()),
                ));
            }
        }
    }

    info!(commands = log.len(), "replay matched");
    Ok(ReplayReport {
        commands: log.len(),
        containers: session.containers().cloned().collect(),
        log: session.into_log(),
    })
}

/// Issue the façade call that produces `command`
fn reissue(session: &mut Session, command: &Command) -> Result<()> {
    match &command.action {
        Action::ContainerAllocate { container_label, .. } => {
            let tier = logged_type(command)?;
            session.new_empty(container_label.as_str(), tier)?;
        }
        Action::ContainerGet {
            container_label,
            required_volume,
            ..
        } => {
            let tier = logged_type(command)?;
            session.stock(container_label.clone(), tier, *required_volume)?;
        }
        Action::PipetteMove {
            dst_container_index,
            src_container_index,
            volume,
        } => session
            .pipette()
            .transfer(*volume, *src_container_index, *dst_container_index)?,
        Action::PipetteMix {
            container_index,
            num,
            volume,
        } => session.pipette().mix(*volume, *container_index, *num)?,
        Action::RobotMoveContainer {
            dst_pos,
            container_index,
        } => session.robot().move_container(*container_index, dst_pos.clone())?,
        Action::OpenPort { port } => session.robot().open_port(*port)?,
        Action::ClosePort { port } => session.robot().close_port(*port)?,
        Action::TimerWait { time } => session.timer().wait(*time)?,
        Action::CapperCapContainer {} => session.capper().cap()?,
        Action::CentrifugeStart {
            time,
            speed,
            container_type,
        } => match container_type {
            ContainerType::P1500 => session.centrifuge_1p5ml().run(*speed, *time)?,
            ContainerType::P200 => session.centrifuge_200ul().run(*speed, *time)?,
            ContainerType::P50K => return Err(error::parse_error("centrifuge_start for P50K tubes")),
        },
        Action::FluorometerMeasure { .. } => {
            session.fluorometer().measure_fluorescence()?;
        }
        Action::HeaterStart { time, temperature } => session.heater().start_for_seconds(*temperature, *time)?,
        Action::HeatershakerStart {
            time,
            temperature,
            speed,
        } => session.heater_shaker().incubate(*temperature, *speed, *time)?,
        Action::MagrackWait { time, container_type } => match container_type {
            Some(ContainerType::P1500) => session.magrack_1p5ml().separate(*time)?,
            Some(ContainerType::P200) => session.magrack_200ul().separate(*time)?,
            Some(ContainerType::P50K) => return Err(error::parse_error("magrack_wait for P50K tubes")),
            // No tier logged: the 1.5 mL rack only when it alone holds tubes
            None => {
                if session.members(InstrumentKind::MagRack200uL).is_empty()
                    && !session.members(InstrumentKind::MagRack1p5mL).is_empty()
                {
                    session.magrack_1p5ml().separate_untyped(*time)?
                } else {
                    session.magrack_200ul().separate_untyped(*time)?
                }
            }
        },
        Action::ThermalCyclerOpenLid {} => session.thermal_cycler().open_lid()?,
        Action::ThermalCyclerCloseLid {} => session.thermal_cycler().close_lid()?,
        Action::ThermalCyclerRunProgram { program } => session.thermal_cycler().run_protocol(program.clone())?,
        Action::StartSequencing {
            run_name,
            output_directory,
        } => session
            .sequencer()
            .start_run(run_name.as_str(), output_directory.as_str())?,
        Action::StopSequencing {} => session.sequencer().stop_run()?,
        Action::RefrigeratorSetTemperature { temperature } => {
            session.refrigerator().set_target_temperature(*temperature)?
        }
    }
    Ok(())
}

fn logged_type(command: &Command) -> Result<ContainerType> {
    command.container_type.ok_or_else(|| {
        error::parse_error(format!("{} without a container_type", command.name()))
    })
}
