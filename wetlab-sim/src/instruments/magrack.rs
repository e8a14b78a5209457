use super::tube_type;
use crate::command::Action;
use crate::container::ContainerType;
use crate::error::Result;
use crate::registry::InstrumentKind;
use crate::session::Session;

/// Default bead separation time
pub const DEFAULT_SEPARATION_SECONDS: u64 = 60;

/// Passive magnetic rack for one tube tier
pub struct MagRack<'a> {
    session: &'a mut Session,
    kind: InstrumentKind,
}

impl<'a> MagRack<'a> {
    pub(crate) fn new(session: &'a mut Session, kind: InstrumentKind) -> Self {
        Self { session, kind }
    }

    pub fn kind(&self) -> InstrumentKind {
        self.kind
    }

    /// Wait for beads to pellet against the magnet
    pub fn separate(&mut self, duration_seconds: u64) -> Result<()> {
        self.wait(duration_seconds, Some(tube_type(self.kind)))
    }

    /// Re-issue a logged wait that named no tier
    pub(crate) fn separate_untyped(&mut self, duration_seconds: u64) -> Result<()> {
        self.wait(duration_seconds, None)
    }

    fn wait(&mut self, duration_seconds: u64, container_type: Option<ContainerType>) -> Result<()> {
        self.session.check_invocation(self.kind)?;
        self.session.submit(Action::MagrackWait {
            time: duration_seconds,
            container_type,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LabConfig;
    use crate::error::ErrorKind;
    use crate::log::MemorySink;

    #[test]
    fn test_separate() {
        let mut s = Session::with_sink(LabConfig::default(), MemorySink::new()).unwrap();
        let a = s.new_empty("beads", ContainerType::P200).unwrap();
        s.robot().move_container(a, "magrack_P200").unwrap();

        s.magrack_200ul().separate(DEFAULT_SEPARATION_SECONDS).unwrap();
        let err = s.magrack_1p5ml().separate(30).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyInstrumentInvocation);

        let value = serde_json::to_value(s.log().steps.last().unwrap()).unwrap();
        assert_eq!(value["action"], "magrack_wait");
        assert_eq!(value["parameters"]["time"], 60);
        assert_eq!(value["parameters"]["container_type"], "P200");
    }
}
