//! # Command Bus
//!
//! The single choke point every façade submits through. For each action it:
//!
//! 1. runs the policy hook the action needs (fluorometry readings),
//! 2. assigns the next sequence id, starting at 1,
//! 3. resolves the container type the command is labeled with,
//! 4. attaches a membership snapshot for heater, heater-shaker and
//!    thermal-cycler starts,
//! 5. appends the command to the execution log.
//!
//! A rejected action consumes no id and leaves no trace in the log.

use crate::command::{Action, Command, Placement};
use crate::container::{ContainerId, ContainerType};
use crate::error::Result;
use crate::location::Location;
use crate::log::ExecutionLog;
use crate::policy::InstrumentPolicy;
use crate::registry::InstrumentRegistry;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// What the bus hands back to the submitting façade
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: u64,
    /// Synthesized readings, for fluorometry only
    pub readings: Option<Vec<i64>>,
}

pub struct CommandBus {
    next_id: u64,
    types: HashMap<ContainerId, ContainerType>,
    destinations: BTreeMap<ContainerId, Location>,
    policy: Box<dyn InstrumentPolicy>,
    log: ExecutionLog,
}

impl CommandBus {
    pub fn new(policy: Box<dyn InstrumentPolicy>) -> Self {
        Self {
            next_id: 1,
            types: HashMap::new(),
            destinations: BTreeMap::new(),
            policy,
            log: ExecutionLog::new(),
        }
    }

    pub fn policy(&self) -> &dyn InstrumentPolicy {
        self.policy.as_ref()
    }

    /// Record a container's type. Must happen before the allocation
    /// command is submitted so that command resolves its own type.
    pub fn register_container(&mut self, id: ContainerId, container_type: ContainerType) {
        self.types.insert(id, container_type);
    }

    pub fn container_type(&self, id: ContainerId) -> Option<ContainerType> {
        self.types.get(&id).copied()
    }

    /// Containers whose last move ended at `location`, ascending by index
    pub fn snapshot(&self, location: &Location) -> Vec<ContainerId> {
        self.destinations
            .iter()
            .filter(|(_, dst)| *dst == location)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn submit(&mut self, action: Action, registry: &InstrumentRegistry) -> Result<Submission> {
        let readings = match &action {
            Action::FluorometerMeasure { num_containers } => {
                Some(self.policy.fluorometer_readings(*num_containers)?)
            }
            _ => None,
        };

        let container_type = action
            .declared_container_type()
            .or_else(|| action.typed_container().and_then(|id| self.container_type(id)));

        if let Action::RobotMoveContainer {
            dst_pos,
            container_index,
        } = &action
        {
            self.destinations.insert(*container_index, dst_pos.clone());
        }

        let placement = action.snapshot_instrument().map(|kind| {
            let pos = registry.location_of(kind).clone();
            Placement {
                containers_on_machine: self.snapshot(&pos),
                pos,
            }
        });

        let id = self.next_id;
        self.next_id += 1;

        let command = Command {
            id,
            action,
            container_type,
            placement,
        };
        debug!(id, action = command.name(), container_type = command.container_type_name(), "submit");
        self.log.push(command);

        Ok(Submission { id, readings })
    }

    pub fn log(&self) -> &ExecutionLog {
        &self.log
    }

    pub fn into_log(self) -> ExecutionLog {
        self.log
    }
}
