use crate::command::Action;
use crate::error::Result;
use crate::session::Session;

/// Records a pause. Nothing actually sleeps.
pub struct Timer<'a> {
    session: &'a mut Session,
}

impl<'a> Timer<'a> {
    pub(crate) fn new(session: &'a mut Session) -> Self {
        Self { session }
    }

    pub fn wait(&mut self, seconds: u64) -> Result<()> {
        self.session.submit(Action::TimerWait { time: seconds })?;
        Ok(())
    }
}
