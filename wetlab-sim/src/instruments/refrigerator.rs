use super::check_temperature;
use crate::command::Action;
use crate::container::ContainerId;
use crate::error::Result;
use crate::registry::InstrumentKind;
use crate::session::Session;

/// Cold storage for reagents and finished libraries
pub struct Refrigerator<'a> {
    session: &'a mut Session,
}

impl<'a> Refrigerator<'a> {
    pub(crate) fn new(session: &'a mut Session) -> Self {
        Self { session }
    }

    /// Containers currently stored
    pub fn get_contents(&self) -> Vec<ContainerId> {
        self.session.members(InstrumentKind::Refrigerator).to_vec()
    }

    pub fn current_temperature(&self) -> f64 {
        self.session.fridge_temperature
    }

    pub fn set_target_temperature(&mut self, celsius: f64) -> Result<()> {
        check_temperature(celsius)?;
        self.session.submit(Action::RefrigeratorSetTemperature { temperature: celsius })?;
        self.session.fridge_temperature = celsius;
        Ok(())
    }
}
