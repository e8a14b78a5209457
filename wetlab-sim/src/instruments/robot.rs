use crate::command::Action;
use crate::container::ContainerId;
use crate::error::Result;
use crate::location::{Location, PortKind};
use crate::session::Session;
use tracing::trace;

/// Robot arm that carries containers between locations and works the ports
pub struct Robot<'a> {
    session: &'a mut Session,
}

impl<'a> Robot<'a> {
    pub(crate) fn new(session: &'a mut Session) -> Self {
        Self { session }
    }

    /// Carry a container to `destination`.
    ///
    /// The container leaves whatever instrument it was on and joins the
    /// instrument registered at `destination`, if there is one. Moving to
    /// an unregistered location is allowed.
    pub fn move_container(&mut self, container: ContainerId, destination: impl Into<Location>) -> Result<()> {
        let destination = destination.into();
        self.session.container(container)?;

        let (left, joined) = self.session.registry_mut().relocate(container, &destination);
        trace!(%container, ?left, ?joined, "relocated");
        self.session.container_mut(container)?.set_location(destination.clone());

        self.session.submit(Action::RobotMoveContainer {
            dst_pos: destination,
            container_index: container,
        })?;
        Ok(())
    }

    pub fn open_port(&mut self, port: PortKind) -> Result<()> {
        self.session.submit(Action::OpenPort { port })?;
        Ok(())
    }

    pub fn close_port(&mut self, port: PortKind) -> Result<()> {
        self.session.submit(Action::ClosePort { port })?;
        Ok(())
    }
}
