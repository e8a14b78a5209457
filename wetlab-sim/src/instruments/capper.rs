use crate::command::Action;
use crate::error::Result;
use crate::registry::InstrumentKind;
use crate::session::Session;

/// Automatic capper for 200 uL tubes
pub struct Capper<'a> {
    session: &'a mut Session,
}

impl<'a> Capper<'a> {
    pub(crate) fn new(session: &'a mut Session) -> Self {
        Self { session }
    }

    /// Run one capping cycle over the tubes on the capper
    pub fn cap(&mut self) -> Result<()> {
        self.session.check_invocation(InstrumentKind::Capper)?;
        self.session.submit(Action::CapperCapContainer {})?;
        Ok(())
    }
}
