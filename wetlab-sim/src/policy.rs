//! Instrument precondition policies
//!
//! The same façades run under either policy. `StrictPolicy` refuses empty
//! instrument runs and overfilled fluorometers; `PermissivePolicy` records
//! whatever the script asks for.

use crate::error::{self, Result};
use crate::registry::InstrumentKind;

/// Placeholder the simulator reports for every fluorometer reading
pub const PLACEHOLDER_READING: i64 = -1;

/// Checks applied before an instrument command reaches the bus.
pub trait InstrumentPolicy: Send + Sync {
    /// Reject invoking `instrument` while `members` containers are on it
    fn check_invocation(&self, instrument: InstrumentKind, members: usize) -> Result<()>;

    /// Synthesize one reading per container on the fluorometer
    fn fluorometer_readings(&self, members: usize) -> Result<Vec<i64>>;

    /// Policy name for logs
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone)]
pub struct StrictPolicy {
    fluorometer_slots: usize,
}

impl StrictPolicy {
    pub fn new(fluorometer_slots: usize) -> Self {
        Self { fluorometer_slots }
    }

    pub fn fluorometer_slots(&self) -> usize {
        self.fluorometer_slots
    }
}

impl Default for StrictPolicy {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_FLUOROMETER_SLOTS)
    }
}

impl InstrumentPolicy for StrictPolicy {
    fn check_invocation(&self, instrument: InstrumentKind, members: usize) -> Result<()> {
        if instrument.requires_members() && members == 0 {
            return Err(error::empty_instrument(instrument));
        }
        Ok(())
    }

    fn fluorometer_readings(&self, members: usize) -> Result<Vec<i64>> {
        if members > self.fluorometer_slots {
            return Err(error::too_many_containers(
                InstrumentKind::Fluorometer,
                members,
                self.fluorometer_slots,
            ));
        }
        Ok(vec![PLACEHOLDER_READING; members])
    }

    fn name(&self) -> &'static str {
        "strict"
    }
}

#[derive(Debug, Clone, Default)]
pub struct PermissivePolicy;

impl InstrumentPolicy for PermissivePolicy {
    fn check_invocation(&self, _instrument: InstrumentKind, _members: usize) -> Result<()> {
        Ok(())
    }

    fn fluorometer_readings(&self, members: usize) -> Result<Vec<i64>> {
        Ok(vec![PLACEHOLDER_READING; members])
    }

    fn name(&self) -> &'static str {
        "permissive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_strict_rejects_empty_run() {
        let policy = StrictPolicy::default();
        let err = policy.check_invocation(InstrumentKind::Centrifuge200uL, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyInstrumentInvocation);
        assert_eq!(
            err.feedback(),
            "EmptyInstrumentInvocation: Centrifuge200uL cannot be run with empty containers"
        );
        assert!(policy.check_invocation(InstrumentKind::Centrifuge200uL, 1).is_ok());
    }

    #[test]
    fn test_strict_ignores_stateless_instruments() {
        let policy = StrictPolicy::default();
        assert!(policy.check_invocation(InstrumentKind::Sequencer, 0).is_ok());
        assert!(policy.check_invocation(InstrumentKind::Refrigerator, 0).is_ok());
    }

    #[test]
    fn test_strict_fluorometer_slots() {
        let policy = StrictPolicy::new(8);
        assert_eq!(policy.fluorometer_readings(3).unwrap(), vec![-1, -1, -1]);
        assert_eq!(policy.fluorometer_readings(8).unwrap().len(), 8);

        let err = policy.fluorometer_readings(9).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InstrumentCapacityExceeded);
        assert_eq!(err.context_value("slots"), Some("8"));
    }

    #[test]
    fn test_permissive_accepts_everything() {
        let policy = PermissivePolicy;
        assert!(policy.check_invocation(InstrumentKind::ThermalCycler, 0).is_ok());
        assert_eq!(policy.fluorometer_readings(12).unwrap().len(), 12);
        assert!(policy.fluorometer_readings(0).unwrap().is_empty());
    }
}
