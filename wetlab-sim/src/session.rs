//! # Lab Session
//!
//! One protocol run. The session owns everything the run touches: the
//! container arena, the allocator, the instrument registry and the command
//! bus with its log. Scripts reach instruments through borrowed façades:
//!
//! ```rust
//! use wetlab_sim::{ContainerType, LabConfig, MemorySink, Session};
//!
//! let mut session = Session::with_sink(LabConfig::default(), MemorySink::new())?;
//! let water = session.new_replenishable("water", 0.0)?;
//! let tube = session.new_empty("A", ContainerType::P200)?;
//! session.pipette().transfer(50.0, water, tube)?;
//! assert_eq!(session.container(tube)?.volume(), 50.0);
//! let log = session.finish()?;
//! assert_eq!(log.len(), 3);
//! # Ok::<(), wetlab_sim::Error>(())
//! ```
//!
//! The log reaches its sink only through `finish`. A session that is
//! dropped, or whose run failed, leaves nothing behind.

use crate::bus::{CommandBus, Submission};
use crate::command::Action;
use crate::config::LabConfig;
use crate::container::{Container, ContainerAllocator, ContainerId, ContainerType};
use crate::error::{Error, Result};
use crate::instruments::{
    Capper, Centrifuge, Fluorometer, Heater, HeaterShaker, MagRack, Pipette, Refrigerator, Robot,
    Sequencer, ThermalCycler, Timer,
};
use crate::location::PortKind;
use crate::log::{ExecutionLog, FileSink, LogSink};
use crate::registry::{InstrumentKind, InstrumentRegistry};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Temperature the refrigerator reports before any target is set
pub const DEFAULT_FRIDGE_TEMPERATURE: f64 = 4.0;

pub struct Session {
    config: LabConfig,
    allocator: ContainerAllocator,
    containers: BTreeMap<ContainerId, Container>,
    registry: InstrumentRegistry,
    bus: CommandBus,
    sink: Box<dyn LogSink>,
    pub(crate) fridge_temperature: f64,
}

impl Session {
    /// Session that flushes to `config.log_path`
    pub fn new(config: LabConfig) -> Result<Self> {
        let sink = FileSink::new(&config.log_path);
        Self::with_sink(config, sink)
    }

    pub fn with_sink(config: LabConfig, sink: impl LogSink + 'static) -> Result<Self> {
        Self::build(config, Box::new(sink), ContainerAllocator::new())
    }

    pub(crate) fn build(
        config: LabConfig,
        sink: Box<dyn LogSink>,
        allocator: ContainerAllocator,
    ) -> Result<Self> {
        let registry = InstrumentRegistry::from_layout(config.layout.clone())?;
        let bus = CommandBus::new(config.policy());
        Ok(Self {
            config,
            allocator,
            containers: BTreeMap::new(),
            registry,
            bus,
            sink,
            fridge_temperature: DEFAULT_FRIDGE_TEMPERATURE,
        })
    }

    // =========================================================================
    // Allocation
    // =========================================================================

    /// Allocate an empty container of the given tier
    pub fn new_empty(&mut self, label: impl Into<String>, container_type: ContainerType) -> Result<ContainerId> {
        let label = label.into();
        let id = self.allocate(label.clone(), container_type, 0.0, false);
        self.submit(Action::ContainerAllocate {
            container_index: id,
            container_label: label,
        })?;
        Ok(id)
    }

    /// Allocate a pre-stocked reagent source that never runs dry
    pub fn new_replenishable(&mut self, name: impl Into<String>, required_volume: f64) -> Result<ContainerId> {
        let container_type = ContainerType::for_stock(required_volume);
        self.stock(name.into(), container_type, required_volume)
    }

    /// Source tube feeding one of the robot's ports
    pub fn port_tube(&mut self, port: PortKind) -> Result<ContainerId> {
        self.stock(port.name().to_string(), ContainerType::P50K, 0.0)
    }

    pub(crate) fn stock(&mut self, name: String, container_type: ContainerType, volume: f64) -> Result<ContainerId> {
        let id = self.allocate(name.clone(), container_type, volume, true);
        self.submit(Action::ContainerGet {
            container_index: id,
            container_label: name,
            required_volume: volume,
        })?;
        Ok(id)
    }

    fn allocate(
        &mut self,
        label: String,
        container_type: ContainerType,
        volume: f64,
        replenishable: bool,
    ) -> ContainerId {
        let id = self.allocator.next_id();
        let location = self.registry.layout().container_holder.clone();
        let container = Container::new(id, label, container_type, volume, replenishable, location);
        self.bus.register_container(id, container_type);
        self.containers.insert(id, container);
        id
    }

    /// Index the next allocation will receive
    pub fn next_container_index(&self) -> ContainerId {
        self.allocator.peek()
    }

    // =========================================================================
    // State access
    // =========================================================================

    pub fn container(&self, id: ContainerId) -> Result<&Container> {
        self.containers
            .get(&id)
            .ok_or_else(|| Error::container_not_found(id.value()))
    }

    pub(crate) fn container_mut(&mut self, id: ContainerId) -> Result<&mut Container> {
        self.containers
            .get_mut(&id)
            .ok_or_else(|| Error::container_not_found(id.value()))
    }

    /// All containers in index order
    pub fn containers(&self) -> impl Iterator<Item = &Container> {
        self.containers.values()
    }

    /// Containers currently on an instrument, in arrival order
    pub fn members(&self, instrument: InstrumentKind) -> &[ContainerId] {
        self.registry.members(instrument)
    }

    pub fn registry(&self) -> &InstrumentRegistry {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut InstrumentRegistry {
        &mut self.registry
    }

    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    pub fn log(&self) -> &ExecutionLog {
        self.bus.log()
    }

    // =========================================================================
    // Façades
    // =========================================================================

    pub fn pipette(&mut self) -> Pipette<'_> {
        Pipette::new(self)
    }

    pub fn robot(&mut self) -> Robot<'_> {
        Robot::new(self)
    }

    pub fn capper(&mut self) -> Capper<'_> {
        Capper::new(self)
    }

    pub fn centrifuge_1p5ml(&mut self) -> Centrifuge<'_> {
        Centrifuge::new(self, InstrumentKind::Centrifuge1p5mL)
    }

    pub fn centrifuge_200ul(&mut self) -> Centrifuge<'_> {
        Centrifuge::new(self, InstrumentKind::Centrifuge200uL)
    }

    pub fn fluorometer(&mut self) -> Fluorometer<'_> {
        Fluorometer::new(self)
    }

    pub fn heater(&mut self) -> Heater<'_> {
        Heater::new(self)
    }

    pub fn heater_shaker(&mut self) -> HeaterShaker<'_> {
        HeaterShaker::new(self)
    }

    pub fn magrack_1p5ml(&mut self) -> MagRack<'_> {
        MagRack::new(self, InstrumentKind::MagRack1p5mL)
    }

    pub fn magrack_200ul(&mut self) -> MagRack<'_> {
        MagRack::new(self, InstrumentKind::MagRack200uL)
    }

    pub fn thermal_cycler(&mut self) -> ThermalCycler<'_> {
        ThermalCycler::new(self)
    }

    pub fn sequencer(&mut self) -> Sequencer<'_> {
        Sequencer::new(self)
    }

    pub fn refrigerator(&mut self) -> Refrigerator<'_> {
        Refrigerator::new(self)
    }

    pub fn timer(&mut self) -> Timer<'_> {
        Timer::new(self)
    }

    // =========================================================================
    // Bus plumbing for the façades
    // =========================================================================

    pub(crate) fn submit(&mut self, action: Action) -> Result<Submission> {
        self.bus.submit(action, &self.registry)
    }

    /// Ask the policy whether `instrument` may run with what is on it
    pub(crate) fn check_invocation(&self, instrument: InstrumentKind) -> Result<()> {
        let members = self.registry.members(instrument).len();
        self.bus
            .policy()
            .check_invocation(instrument, members)
            .inspect_err(|e| {
                warn!(
                    instrument = instrument.as_str(),
                    policy = self.bus.policy().name(),
                    "rejected: {}",
                    e.message()
                )
            })
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Flush the log to the sink and hand it back
    pub fn finish(self) -> Result<ExecutionLog> {
        let log = self.bus.into_log();
        self.sink
            .persist(&log)
            .map_err(|e| e.with_operation("session::finish"))?;
        info!(commands = log.len(), sink = %self.sink.location(), "execution log flushed");
        Ok(log)
    }

    /// End the session without persisting anything
    pub fn into_log(self) -> ExecutionLog {
        self.bus.into_log()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LabLayout;
    use crate::error::ErrorKind;
    use crate::location::Location;
    use crate::log::MemorySink;
    use tempfile::TempDir;

    fn session() -> Session {
        Session::with_sink(LabConfig::default(), MemorySink::new()).unwrap()
    }

    #[test]
    fn test_indices_start_at_1000_and_increase() {
        let mut s = session();
        let a = s.new_empty("A", ContainerType::P200).unwrap();
        let w = s.new_replenishable("Water", 0.0).unwrap();
        let p = s.port_tube(PortKind::Priming).unwrap();

        assert_eq!(a, ContainerId(1000));
        assert_eq!(w, ContainerId(1001));
        assert_eq!(p, ContainerId(1002));
        assert_eq!(s.next_container_index(), ContainerId(1003));
    }

    #[test]
    fn test_allocation_commands() {
        let mut s = session();
        s.new_empty("A", ContainerType::P1500).unwrap();
        s.new_replenishable("Buffer", 5000.0).unwrap();

        let steps = &s.log().steps;
        assert_eq!(steps[0].name(), "container_allocate");
        assert_eq!(steps[0].container_type, Some(ContainerType::P1500));
        assert_eq!(steps[1].name(), "container_get");
        assert_eq!(steps[1].container_type, Some(ContainerType::P50K));
    }

    #[test]
    fn test_new_containers_start_in_holder() {
        let mut s = session();
        let a = s.new_empty("A", ContainerType::P200).unwrap();
        let c = s.container(a).unwrap();
        assert_eq!(c.location().as_str(), "ContainerHolder");
        assert_eq!(c.volume(), 0.0);
        assert!(!c.is_replenishable());
    }

    #[test]
    fn test_port_tube() {
        let mut s = session();
        let id = s.port_tube(PortKind::SpotOn).unwrap();
        let tube = s.container(id).unwrap();
        assert_eq!(tube.label(), "SPOTON");
        assert_eq!(tube.container_type(), ContainerType::P50K);
        assert!(tube.is_replenishable());
    }

    #[test]
    fn test_unknown_container() {
        let s = session();
        let err = s.container(ContainerId(77)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ContainerNotFound);
    }

    #[test]
    fn test_finish_flushes_to_sink() {
        let sink = MemorySink::new();
        let mut s = Session::with_sink(LabConfig::default(), sink.clone()).unwrap();
        s.new_empty("A", ContainerType::P200).unwrap();
        s.timer().wait(10).unwrap();

        let log = s.finish().unwrap();
        assert_eq!(sink.count(), 1);
        assert_eq!(sink.last().unwrap(), log);
    }

    #[test]
    fn test_into_log_does_not_flush() {
        let sink = MemorySink::new();
        let mut s = Session::with_sink(LabConfig::default(), sink.clone()).unwrap();
        s.timer().wait(10).unwrap();

        let log = s.into_log();
        assert_eq!(log.len(), 1);
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn test_finish_writes_file() {
        let temp = TempDir::new().unwrap();
        let config = LabConfig::default().with_log_dir(temp.path());
        let mut s = Session::new(config).unwrap();
        s.new_empty("A", ContainerType::P200).unwrap();
        s.finish().unwrap();

        let loaded = ExecutionLog::load(temp.path().join("protocol_flow.json")).unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn test_invalid_layout_rejected() {
        let layout = LabLayout {
            heater: Location::new("capper"),
            ..LabLayout::default()
        };
        let result = Session::with_sink(LabConfig::default().with_layout(layout), MemorySink::new());
        assert_eq!(result.err().map(|e| e.kind()), Some(ErrorKind::ConfigInvalid));
    }

    #[test]
    fn test_reruns_are_deterministic() {
        let run = || {
            let mut s = session();
            let water = s.new_replenishable("Water", 0.0).unwrap();
            let a = s.new_empty("A", ContainerType::P200).unwrap();
            s.pipette().transfer(20.0, water, a).unwrap();
            s.robot().move_container(a, "centrifuge_P200").unwrap();
            s.centrifuge_200ul().run(2500, 15).unwrap();
            s.into_log().steps
        };
        assert_eq!(run(), run());
    }
}
