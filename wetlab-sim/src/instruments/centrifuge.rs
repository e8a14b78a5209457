use super::tube_type;
use crate::command::Action;
use crate::container::ContainerType;
use crate::error::Result;
use crate::registry::InstrumentKind;
use crate::session::Session;

/// Speed of a quick spin-down on the 200 uL centrifuge
pub const SPIN_DOWN_SPEED_RPM: u32 = 2500;
/// Duration of a quick spin-down on the 200 uL centrifuge
pub const SPIN_DOWN_SECONDS: u64 = 15;

/// Centrifuge for one tube tier (1.5 mL or 200 uL)
pub struct Centrifuge<'a> {
    session: &'a mut Session,
    kind: InstrumentKind,
}

impl<'a> Centrifuge<'a> {
    pub(crate) fn new(session: &'a mut Session, kind: InstrumentKind) -> Self {
        Self { session, kind }
    }

    pub fn kind(&self) -> InstrumentKind {
        self.kind
    }

    /// Tube tier this centrifuge's rotor takes
    pub fn tube_type(&self) -> ContainerType {
        tube_type(self.kind)
    }

    pub fn run(&mut self, speed_rpm: u32, duration_seconds: u64) -> Result<()> {
        self.session.check_invocation(self.kind)?;
        self.session.submit(Action::CentrifugeStart {
            time: duration_seconds,
            speed: speed_rpm,
            container_type: self.tube_type(),
        })?;
        Ok(())
    }

    /// Short run that pulls droplets off the tube walls
    pub fn spin_down(&mut self) -> Result<()> {
        self.run(SPIN_DOWN_SPEED_RPM, SPIN_DOWN_SECONDS)
    }
}
