use crate::command::Action;
use crate::error::Result;
use crate::registry::InstrumentKind;
use crate::session::Session;

/// Fluorometer for 200 uL tubes
pub struct Fluorometer<'a> {
    session: &'a mut Session,
}

impl<'a> Fluorometer<'a> {
    pub(crate) fn new(session: &'a mut Session) -> Self {
        Self { session }
    }

    /// Raw fluorescence, one reading per tube on the instrument.
    ///
    /// The simulator has no optics: every reading is the placeholder `-1`.
    pub fn measure_fluorescence(&mut self) -> Result<Vec<i64>> {
        self.session.check_invocation(InstrumentKind::Fluorometer)?;
        let num_containers = self.session.members(InstrumentKind::Fluorometer).len();
        let submission = self.session.submit(Action::FluorometerMeasure { num_containers })?;
        Ok(submission.readings.unwrap_or_default())
    }
}
