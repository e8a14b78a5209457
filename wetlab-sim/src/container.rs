//! # Containers
//!
//! Simulated lab vessels and the allocator that hands out their indices.
//! A container is never destroyed; it lives until its session ends.

use crate::location::Location;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of the first container allocated in a session
pub const FIRST_CONTAINER_INDEX: u64 = 1000;

/// Globally unique, monotonically increasing container index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(pub u64);

impl ContainerId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capacity tier of a container (volumes in uL)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ContainerType {
    /// 200 uL PCR tube
    #[default]
    P200,
    /// 1.5 mL microcentrifuge tube
    P1500,
    /// 50 mL conical tube
    P50K,
}

impl ContainerType {
    pub const ALL: [ContainerType; 3] = [ContainerType::P200, ContainerType::P1500, ContainerType::P50K];

    /// Nominal capacity in uL
    pub fn capacity(&self) -> f64 {
        match self {
            ContainerType::P200 => 200.0,
            ContainerType::P1500 => 1500.0,
            ContainerType::P50K => 50_000.0,
        }
    }

    /// Tier picked for a pre-stocked reagent of the given volume
    pub fn for_stock(required_volume: f64) -> Self {
        if required_volume <= ContainerType::P200.capacity() {
            ContainerType::P200
        } else {
            ContainerType::P50K
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerType::P200 => "P200",
            ContainerType::P1500 => "P1500",
            ContainerType::P50K => "P50K",
        }
    }

    /// Parse a wire name; anything else (including "Unknown") is `None`
    pub fn from_wire(name: &str) -> Option<Self> {
        ContainerType::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A simulated lab vessel.
///
/// Volume only changes through pipette transfers and location only through
/// robot moves, so the mutators are crate-private.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    index: ContainerId,
    label: String,
    container_type: ContainerType,
    capacity: f64,
    volume: f64,
    replenishable: bool,
    location: Location,
}

impl Container {
    pub(crate) fn new(
        index: ContainerId,
        label: impl Into<String>,
        container_type: ContainerType,
        volume: f64,
        replenishable: bool,
        location: Location,
    ) -> Self {
        Self {
            index,
            label: label.into(),
            container_type,
            // A stock larger than its tier still has to fit in the tube.
            capacity: container_type.capacity().max(volume),
            volume,
            replenishable,
            location,
        }
    }

    pub fn index(&self) -> ContainerId {
        self.index
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn container_type(&self) -> ContainerType {
        self.container_type
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn is_replenishable(&self) -> bool {
        self.replenishable
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Waste sinks are exempt from overflow checks. The designation is a
    /// labeling convention: any label containing "waste", in any case.
    pub fn is_waste(&self) -> bool {
        self.label.to_lowercase().contains("waste")
    }

    /// Remaining room before the capacity bound
    pub fn headroom(&self) -> f64 {
        (self.capacity - self.volume).max(0.0)
    }

    pub(crate) fn drain(&mut self, volume: f64) {
        if !self.replenishable {
            self.volume -= volume;
        }
    }

    pub(crate) fn fill(&mut self, volume: f64) {
        self.volume += volume;
    }

    pub(crate) fn set_location(&mut self, location: Location) {
        self.location = location;
    }
}

/// Issues container indices for one session.
#[derive(Debug, Clone)]
pub struct ContainerAllocator {
    next: u64,
}

impl Default for ContainerAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerAllocator {
    pub fn new() -> Self {
        Self::starting_at(FIRST_CONTAINER_INDEX)
    }

    /// Allocator whose first index is `first` (used when replaying a log)
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    /// Index the next allocation will receive
    pub fn peek(&self) -> ContainerId {
        ContainerId(self.next)
    }

    pub fn next_id(&mut self) -> ContainerId {
        let id = ContainerId(self.next);
        self.next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holder() -> Location {
        Location::new("ContainerHolder")
    }

    #[test]
    fn test_allocator_is_monotonic() {
        let mut alloc = ContainerAllocator::new();
        let ids: Vec<_> = (0..5).map(|_| alloc.next_id()).collect();

        assert_eq!(ids[0], ContainerId(FIRST_CONTAINER_INDEX));
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(alloc.peek(), ContainerId(FIRST_CONTAINER_INDEX + 5));
    }

    #[test]
    fn test_stock_tier() {
        assert_eq!(ContainerType::for_stock(0.0), ContainerType::P200);
        assert_eq!(ContainerType::for_stock(200.0), ContainerType::P200);
        assert_eq!(ContainerType::for_stock(200.5), ContainerType::P50K);
    }

    #[test]
    fn test_capacity_never_below_volume() {
        let c = Container::new(ContainerId(1), "bulk", ContainerType::P50K, 80_000.0, true, holder());
        assert_eq!(c.capacity(), 80_000.0);
        assert_eq!(c.headroom(), 0.0);
    }

    #[test]
    fn test_waste_label_is_case_insensitive() {
        let w = Container::new(ContainerId(1), "Liquid WASTE bin", ContainerType::P1500, 0.0, false, holder());
        let t = Container::new(ContainerId(2), "sample", ContainerType::P200, 0.0, false, holder());
        assert!(w.is_waste());
        assert!(!t.is_waste());
    }

    #[test]
    fn test_replenishable_drain_is_noop() {
        let mut water = Container::new(ContainerId(1), "water", ContainerType::P200, 0.0, true, holder());
        water.drain(50.0);
        assert_eq!(water.volume(), 0.0);

        let mut tube = Container::new(ContainerId(2), "tube", ContainerType::P200, 80.0, false, holder());
        tube.drain(30.0);
        assert_eq!(tube.volume(), 50.0);
    }

    #[test]
    fn test_container_type_wire_names() {
        assert_eq!(serde_json::to_value(ContainerType::P50K).unwrap(), serde_json::json!("P50K"));
        assert_eq!(ContainerType::from_wire("P1500"), Some(ContainerType::P1500));
        assert_eq!(ContainerType::from_wire("Unknown"), None);
    }
}
