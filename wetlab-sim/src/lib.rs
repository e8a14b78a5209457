//! # wetlab-sim
//!
//! Simulator and auditor for automated wet-lab protocols.
//!
//! ## Core Concepts
//! - **Containers**: Vessels with a capacity tier, a volume and a location
//! - **Instruments**: Façades borrowed from a `Session` that validate, mutate and emit commands
//! - **Command Bus**: Sequences every command, labels it with a container type and snapshots machines
//! - **Execution Log**: The `{protocol_start_time, steps}` artifact the scheduler consumes
//! - **Scripts**: JSON programs interpreted step by step against a session
//! - **Replay**: Re-applies a persisted log to audit it

pub mod bus;
pub mod command;
pub mod config;
pub mod container;
pub mod error;
pub mod instruments;
pub mod interpreter;
pub mod location;
pub mod log;
pub mod policy;
pub mod registry;
pub mod replay;
pub mod schema;
pub mod script;
pub mod session;

pub use bus::{CommandBus, Submission};
pub use command::{Action, Command, Placement, ThermalHold, ThermalStep, UNKNOWN_CONTAINER_TYPE};
pub use config::{LabConfig, LabLayout, Strictness, DEFAULT_FLUOROMETER_SLOTS, LOG_DIR_ENV, LOG_FILE_NAME};
pub use container::{Container, ContainerAllocator, ContainerId, ContainerType, FIRST_CONTAINER_INDEX};
pub use error::{Error, ErrorKind, ErrorStatus, Result};
pub use interpreter::{ExecutionStep, Interpreter};
pub use location::{Location, PortKind};
pub use log::{ExecutionLog, FileSink, LogSink, MemorySink};
pub use policy::{InstrumentPolicy, PermissivePolicy, StrictPolicy, PLACEHOLDER_READING};
pub use registry::{InstrumentKind, InstrumentRegistry};
pub use replay::{replay, ReplayReport};
pub use schema::ScriptSchema;
pub use script::{Script, ScriptStep};
pub use session::Session;
