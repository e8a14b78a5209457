use crate::command::Action;
use crate::container::ContainerId;
use crate::error::{self, Result};
use crate::session::Session;

/// Robotic pipette for liquid handling
pub struct Pipette<'a> {
    session: &'a mut Session,
}

impl<'a> Pipette<'a> {
    pub(crate) fn new(session: &'a mut Session) -> Self {
        Self { session }
    }

    /// Move `volume` uL from `source` to `destination`.
    ///
    /// Fails with `InsufficientVolume` when a non-replenishable source holds
    /// less than `volume`, and with `Overflow` when the destination would
    /// exceed its capacity and is not a waste sink. Both checks run before
    /// anything changes.
    pub fn transfer(&mut self, volume: f64, source: ContainerId, destination: ContainerId) -> Result<()> {
        check_volume(volume)?;

        let src = self.session.container(source)?;
        if !src.is_replenishable() && src.volume() < volume {
            return Err(error::insufficient_volume(src.label(), source, volume, src.volume()));
        }

        let dst = self.session.container(destination)?;
        if !dst.is_waste() && volume > dst.headroom() {
            return Err(error::overflow(dst.label(), destination, dst.volume(), dst.capacity(), volume));
        }

        self.session.container_mut(source)?.drain(volume);
        self.session.container_mut(destination)?.fill(volume);

        self.session.submit(Action::PipetteMove {
            dst_container_index: destination,
            src_container_index: source,
            volume,
        })?;
        Ok(())
    }

    /// Aspirate and dispense `volume` uL in place `repetitions` times
    pub fn mix(&mut self, volume: f64, container: ContainerId, repetitions: u32) -> Result<()> {
        check_volume(volume)?;
        self.session.container(container)?;

        self.session.submit(Action::PipetteMix {
            container_index: container,
            num: repetitions,
            volume,
        })?;
        Ok(())
    }
}

fn check_volume(volume: f64) -> Result<()> {
    if volume.is_finite() && volume >= 0.0 {
        Ok(())
    } else {
        Err(error::invalid_volume(volume))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::LabConfig;
    use crate::container::ContainerType;
    use crate::error::ErrorKind;
    use crate::log::MemorySink;
    use crate::session::Session;

    fn session() -> Session {
        Session::with_sink(LabConfig::default(), MemorySink::new()).unwrap()
    }

    #[test]
    fn test_transfer_from_replenishable_source() {
        let mut s = session();
        let a = s.new_empty("A", ContainerType::P200).unwrap();
        let water = s.new_replenishable("Water", 0.0).unwrap();

        s.pipette().transfer(50.0, water, a).unwrap();

        assert_eq!(s.container(a).unwrap().volume(), 50.0);
        assert_eq!(s.container(water).unwrap().volume(), 0.0);
    }

    #[test]
    fn test_insufficient_source_leaves_state_untouched() {
        let mut s = session();
        let a = s.new_empty("A", ContainerType::P200).unwrap();
        let water = s.new_replenishable("Water", 0.0).unwrap();
        let waste = s.new_empty("Waste", ContainerType::P1500).unwrap();
        s.pipette().transfer(50.0, water, a).unwrap();
        let logged = s.log().len();

        let err = s.pipette().transfer(60.0, a, waste).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InsufficientVolume);
        assert_eq!(
            err.feedback(),
            "InsufficientVolume: Insufficient volume in source A. Required: 60 uL, Available: 50 uL."
        );
        assert_eq!(s.container(a).unwrap().volume(), 50.0);
        assert_eq!(s.container(waste).unwrap().volume(), 0.0);
        assert_eq!(s.log().len(), logged);
    }

    #[test]
    fn test_volume_conservation() {
        let mut s = session();
        let a = s.new_empty("A", ContainerType::P1500).unwrap();
        let b = s.new_empty("B", ContainerType::P200).unwrap();
        let buffer = s.new_replenishable("Buffer", 1000.0).unwrap();
        s.pipette().transfer(300.0, buffer, a).unwrap();

        s.pipette().transfer(120.5, a, b).unwrap();

        assert_eq!(s.container(a).unwrap().volume(), 179.5);
        assert_eq!(s.container(b).unwrap().volume(), 120.5);
        assert_eq!(s.container(buffer).unwrap().volume(), 1000.0);
    }

    #[test]
    fn test_overflow_guard() {
        let mut s = session();
        let a = s.new_empty("A", ContainerType::P200).unwrap();
        let water = s.new_replenishable("Water", 0.0).unwrap();
        s.pipette().transfer(150.0, water, a).unwrap();

        let err = s.pipette().transfer(60.0, water, a).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overflow);
        assert_eq!(s.container(a).unwrap().volume(), 150.0);

        // Filling exactly to capacity is allowed.
        s.pipette().transfer(50.0, water, a).unwrap();
        assert_eq!(s.container(a).unwrap().volume(), 200.0);
    }

    #[test]
    fn test_waste_sink_never_overflows() {
        let mut s = session();
        let water = s.new_replenishable("Water", 0.0).unwrap();
        let waste = s.new_empty("liquid_WASTE", ContainerType::P200).unwrap();

        for _ in 0..5 {
            s.pipette().transfer(100.0, water, waste).unwrap();
        }
        assert_eq!(s.container(waste).unwrap().volume(), 500.0);
    }

    #[test]
    fn test_transfer_command_labeled_by_source_type() {
        let mut s = session();
        let stock = s.new_replenishable("Enzyme", 5000.0).unwrap();
        let tube = s.new_empty("A", ContainerType::P200).unwrap();
        s.pipette().transfer(10.0, stock, tube).unwrap();

        let cmd = s.log().steps.last().unwrap();
        assert_eq!(cmd.name(), "pipette_move");
        assert_eq!(cmd.container_type_name(), "P50K");
    }

    #[test]
    fn test_rejects_negative_and_nan_volumes() {
        let mut s = session();
        let a = s.new_empty("A", ContainerType::P200).unwrap();
        let water = s.new_replenishable("Water", 0.0).unwrap();

        let err = s.pipette().transfer(-5.0, water, a).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = s.pipette().mix(f64::NAN, a, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_mix_leaves_volume_alone() {
        let mut s = session();
        let a = s.new_empty("A", ContainerType::P200).unwrap();
        let water = s.new_replenishable("Water", 0.0).unwrap();
        s.pipette().transfer(80.0, water, a).unwrap();

        s.pipette().mix(40.0, a, 10).unwrap();

        assert_eq!(s.container(a).unwrap().volume(), 80.0);
        let cmd = s.log().steps.last().unwrap();
        assert_eq!(cmd.name(), "pipette_mix");
        assert_eq!(cmd.container_type_name(), "P200");
    }

    #[test]
    fn test_unknown_container_is_rejected() {
        let mut s = session();
        let a = s.new_empty("A", ContainerType::P200).unwrap();
        let err = s.pipette().transfer(1.0, crate::ContainerId(9999), a).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ContainerNotFound);
    }
}
