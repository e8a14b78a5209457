//! Temperature-controlled instruments. Starting any of them snapshots the
//! containers on the machine into the logged command.

use super::{check_program, check_temperature};
use crate::command::{Action, ThermalStep};
use crate::error::{self, Result};
use crate::registry::InstrumentKind;
use crate::session::Session;

/// Shaking speed used when a script does not ask for one
pub const DEFAULT_SHAKE_SPEED_RPM: u32 = 1300;

/// Dry heating block for 1.5 mL tubes
pub struct Heater<'a> {
    session: &'a mut Session,
}

impl<'a> Heater<'a> {
    pub(crate) fn new(session: &'a mut Session) -> Self {
        Self { session }
    }

    /// Heat to `temperature_celsius`, for `duration_minutes` or until stopped
    pub fn start(&mut self, temperature_celsius: f64, duration_minutes: Option<f64>) -> Result<()> {
        self.start_for_seconds(temperature_celsius, duration_minutes.map(|m| m * 60.0))
    }

    pub(crate) fn start_for_seconds(&mut self, temperature_celsius: f64, seconds: Option<f64>) -> Result<()> {
        check_temperature(temperature_celsius)?;
        if let Some(s) = seconds.filter(|s| !s.is_finite() || *s < 0.0) {
            return Err(error::invalid_duration(s));
        }
        self.session.check_invocation(InstrumentKind::Heater)?;
        self.session.submit(Action::HeaterStart {
            time: seconds,
            temperature: temperature_celsius,
        })?;
        Ok(())
    }
}

/// Heated shaker for 200 uL tubes
pub struct HeaterShaker<'a> {
    session: &'a mut Session,
}

impl<'a> HeaterShaker<'a> {
    pub(crate) fn new(session: &'a mut Session) -> Self {
        Self { session }
    }

    /// Heat and/or shake. `None` temperature means ambient, `None` duration
    /// means until stopped.
    pub fn incubate(
        &mut self,
        temperature_celsius: Option<f64>,
        speed_rpm: u32,
        duration_seconds: Option<u64>,
    ) -> Result<()> {
        if let Some(t) = temperature_celsius {
            check_temperature(t)?;
        }
        self.session.check_invocation(InstrumentKind::HeaterShaker)?;
        self.session.submit(Action::HeatershakerStart {
            time: duration_seconds,
            temperature: temperature_celsius,
            speed: speed_rpm,
        })?;
        Ok(())
    }
}

/// Thermal cycler for 200 uL PCR tubes
pub struct ThermalCycler<'a> {
    session: &'a mut Session,
}

impl<'a> ThermalCycler<'a> {
    pub(crate) fn new(session: &'a mut Session) -> Self {
        Self { session }
    }

    pub fn open_lid(&mut self) -> Result<()> {
        self.session.submit(Action::ThermalCyclerOpenLid {})?;
        Ok(())
    }

    pub fn close_lid(&mut self) -> Result<()> {
        self.session.submit(Action::ThermalCyclerCloseLid {})?;
        Ok(())
    }

    /// Run a program of holds and cycles, stored verbatim in the log
    pub fn run_protocol(&mut self, program: Vec<ThermalStep>) -> Result<()> {
        check_program(&program)?;
        self.session.check_invocation(InstrumentKind::ThermalCycler)?;
        self.session.submit(Action::ThermalCyclerRunProgram { program })?;
        Ok(())
    }
}
