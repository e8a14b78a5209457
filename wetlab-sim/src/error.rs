//! Simulator error constructors
//!
//! Re-exports wetlab-error and provides the constructors the façades raise.
//! Messages are phrased so that `Error::feedback()` reads well when handed
//! back to whoever wrote the failing script.

pub use wetlab_error::{Error, ErrorKind, ErrorStatus, Result};

use crate::container::ContainerId;
use crate::registry::InstrumentKind;

/// Create an InsufficientVolume error
pub fn insufficient_volume(label: &str, index: ContainerId, required: f64, available: f64) -> Error {
    Error::new(
        ErrorKind::InsufficientVolume,
        format!(
            "Insufficient volume in source {}. Required: {} uL, Available: {} uL.",
            label, required, available
        ),
    )
    .with_operation("pipette::transfer")
    .with_context("source", index.to_string())
    .with_context("required", required.to_string())
    .with_context("available", available.to_string())
}

/// Create an Overflow error
pub fn overflow(label: &str, index: ContainerId, current: f64, capacity: f64, incoming: f64) -> Error {
    Error::new(
        ErrorKind::Overflow,
        format!(
            "Transfer will overflow destination {}. Current Volume: {} uL, Capacity: {} uL.",
            label, current, capacity
        ),
    )
    .with_operation("pipette::transfer")
    .with_context("destination", index.to_string())
    .with_context("incoming", incoming.to_string())
}

/// Create an EmptyInstrumentInvocation error
pub fn empty_instrument(instrument: InstrumentKind) -> Error {
    Error::new(
        ErrorKind::EmptyInstrumentInvocation,
        format!("{} cannot be run with empty containers", instrument.model_name()),
    )
    .with_context("instrument", instrument.as_str())
}

/// Create an InstrumentCapacityExceeded error
pub fn too_many_containers(instrument: InstrumentKind, count: usize, slots: usize) -> Error {
    Error::new(
        ErrorKind::InstrumentCapacityExceeded,
        format!("Too many containers on {}: {} placed, {} slots", instrument.as_str(), count, slots),
    )
    .with_context("instrument", instrument.as_str())
    .with_context("count", count.to_string())
    .with_context("slots", slots.to_string())
}

/// Create an InvalidArgument error for a volume that is negative or not a number
pub fn invalid_volume(volume: f64) -> Error {
    Error::invalid_argument(format!("volume must be a finite, non-negative number, got {}", volume))
        .with_context("volume", volume.to_string())
}

pub fn invalid_temperature(celsius: f64) -> Error {
    Error::invalid_argument(format!("temperature must be a finite number of degrees Celsius, got {}", celsius))
        .with_context("temperature", celsius.to_string())
}

pub fn invalid_duration(seconds: f64) -> Error {
    Error::invalid_argument(format!("duration must be a finite, non-negative number of seconds, got {}", seconds))
        .with_context("duration", seconds.to_string())
}

/// Create a ReplayDiverged error
pub fn replay_diverged(step: usize, message: impl Into<String>) -> Error {
    Error::new(ErrorKind::ReplayDiverged, message)
        .with_operation("replay")
        .with_context("step", step.to_string())
}

/// Create an IoFailed error
pub fn io_error(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::IoFailed, message)
}

/// Create a SerializationFailed error
pub fn serialization_error(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::SerializationFailed, message)
}

/// Create a StorageFailed error
pub fn storage_failed(reason: impl Into<String>) -> Error {
    Error::new(ErrorKind::StorageFailed, reason)
}

/// Create a ParseFailed error
pub fn parse_error(message: impl Into<String>) -> Error {
    Error::parse_failed(message)
}
