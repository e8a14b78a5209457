//! # Instrument Façades
//!
//! Short-lived handles borrowed from a `Session`. Each call validates its
//! preconditions, mutates container state when it has to, and submits one
//! command to the bus. A call that fails leaves the session untouched.

mod capper;
mod centrifuge;
mod fluorometer;
mod heating;
mod magrack;
mod pipette;
mod refrigerator;
mod robot;
mod sequencer;
mod timer;

pub use capper::Capper;
pub use centrifuge::{Centrifuge, SPIN_DOWN_SECONDS, SPIN_DOWN_SPEED_RPM};
pub use fluorometer::Fluorometer;
pub use heating::{Heater, HeaterShaker, ThermalCycler, DEFAULT_SHAKE_SPEED_RPM};
pub use magrack::{MagRack, DEFAULT_SEPARATION_SECONDS};
pub use pipette::Pipette;
pub use refrigerator::Refrigerator;
pub use robot::Robot;
pub use sequencer::Sequencer;
pub use timer::Timer;

use crate::command::ThermalStep;
use crate::container::ContainerType;
use crate::error::{self, Result};
use crate::registry::InstrumentKind;

/// Tube tier a tiered instrument accepts
pub(crate) fn tube_type(kind: InstrumentKind) -> ContainerType {
    match kind {
        InstrumentKind::Centrifuge1p5mL | InstrumentKind::MagRack1p5mL | InstrumentKind::Heater => {
            ContainerType::P1500
        }
        _ => ContainerType::P200,
    }
}

/// NaN and infinities serialize as `null` and would make the log unreadable
pub(crate) fn check_temperature(celsius: f64) -> Result<()> {
    if celsius.is_finite() {
        Ok(())
    } else {
        Err(error::invalid_temperature(celsius))
    }
}

pub(crate) fn check_program(program: &[ThermalStep]) -> Result<()> {
    for step in program {
        match step {
            ThermalStep::Hold(hold) => check_temperature(hold.temperature_celsius)?,
            ThermalStep::Cycle { steps, .. } => {
                for hold in steps {
                    check_temperature(hold.temperature_celsius)?;
                }
            }
        }
    }
    Ok(())
}
