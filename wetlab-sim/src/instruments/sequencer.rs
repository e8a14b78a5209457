use crate::command::Action;
use crate::error::Result;
use crate::session::Session;

/// Nanopore-style sequencer, loaded through the robot's ports
pub struct Sequencer<'a> {
    session: &'a mut Session,
}

impl<'a> Sequencer<'a> {
    pub(crate) fn new(session: &'a mut Session) -> Self {
        Self { session }
    }

    pub fn start_run(&mut self, run_name: impl Into<String>, output_directory: impl Into<String>) -> Result<()> {
        self.session.submit(Action::StartSequencing {
            run_name: run_name.into(),
            output_directory: output_directory.into(),
        })?;
        Ok(())
    }

    pub fn stop_run(&mut self) -> Result<()> {
        self.session.submit(Action::StopSequencing {})?;
        Ok(())
    }
}
