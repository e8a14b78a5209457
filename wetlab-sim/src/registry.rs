//! # Instrument Registry
//!
//! Maps location names to the instrument whose home they are, and tracks
//! which containers currently sit on each instrument. Instruments are keyed
//! by `InstrumentKind`, never by matching location strings.

use crate::config::LabLayout;
use crate::container::ContainerId;
use crate::error::Result;
use crate::location::Location;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Every instrument a lab session provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    Capper,
    #[serde(rename = "centrifuge_1p5ml")]
    Centrifuge1p5mL,
    #[serde(rename = "centrifuge_200ul")]
    Centrifuge200uL,
    Fluorometer,
    Heater,
    HeaterShaker,
    #[serde(rename = "magrack_1p5ml")]
    MagRack1p5mL,
    #[serde(rename = "magrack_200ul")]
    MagRack200uL,
    ThermalCycler,
    Pipette,
    Robot,
    Sequencer,
    Refrigerator,
}

impl InstrumentKind {
    pub const ALL: [InstrumentKind; 13] = [
        InstrumentKind::Capper,
        InstrumentKind::Centrifuge1p5mL,
        InstrumentKind::Centrifuge200uL,
        InstrumentKind::Fluorometer,
        InstrumentKind::Heater,
        InstrumentKind::HeaterShaker,
        InstrumentKind::MagRack1p5mL,
        InstrumentKind::MagRack200uL,
        InstrumentKind::ThermalCycler,
        InstrumentKind::Pipette,
        InstrumentKind::Robot,
        InstrumentKind::Sequencer,
        InstrumentKind::Refrigerator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentKind::Capper => "capper",
            InstrumentKind::Centrifuge1p5mL => "centrifuge_1p5ml",
            InstrumentKind::Centrifuge200uL => "centrifuge_200ul",
            InstrumentKind::Fluorometer => "fluorometer",
            InstrumentKind::Heater => "heater",
            InstrumentKind::HeaterShaker => "heater_shaker",
            InstrumentKind::MagRack1p5mL => "magrack_1p5ml",
            InstrumentKind::MagRack200uL => "magrack_200ul",
            InstrumentKind::ThermalCycler => "thermal_cycler",
            InstrumentKind::Pipette => "pipette",
            InstrumentKind::Robot => "robot",
            InstrumentKind::Sequencer => "sequencer",
            InstrumentKind::Refrigerator => "refrigerator",
        }
    }

    /// Product-style name used in user-facing messages
    pub fn model_name(&self) -> &'static str {
        match self {
            InstrumentKind::Capper => "Capper",
            InstrumentKind::Centrifuge1p5mL => "Centrifuge1p5mL",
            InstrumentKind::Centrifuge200uL => "Centrifuge200uL",
            InstrumentKind::Fluorometer => "Fluorometer",
            InstrumentKind::Heater => "Heater",
            InstrumentKind::HeaterShaker => "HeaterShaker",
            InstrumentKind::MagRack1p5mL => "MagRack1p5mL",
            InstrumentKind::MagRack200uL => "MagRack200uL",
            InstrumentKind::ThermalCycler => "ThermoCycler",
            InstrumentKind::Pipette => "Pipette",
            InstrumentKind::Robot => "Robot",
            InstrumentKind::Sequencer => "Sequencer",
            InstrumentKind::Refrigerator => "Refrigerator",
        }
    }

    /// Whether the strict policy refuses to run this instrument with no
    /// containers on it.
    pub fn requires_members(&self) -> bool {
        matches!(
            self,
            InstrumentKind::Capper
                | InstrumentKind::Centrifuge1p5mL
                | InstrumentKind::Centrifuge200uL
                | InstrumentKind::Fluorometer
                | InstrumentKind::Heater
                | InstrumentKind::HeaterShaker
                | InstrumentKind::MagRack1p5mL
                | InstrumentKind::MagRack200uL
                | InstrumentKind::ThermalCycler
        )
    }

    /// Whether containers placed at this instrument's location join its
    /// membership set. The sequencer is fed through ports, not by placement.
    pub fn holds_containers(&self) -> bool {
        !matches!(self, InstrumentKind::Sequencer)
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Location lookup and per-instrument membership for one session.
#[derive(Debug, Clone)]
pub struct InstrumentRegistry {
    layout: LabLayout,
    by_location: HashMap<Location, InstrumentKind>,
    members: HashMap<InstrumentKind, Vec<ContainerId>>,
}

impl InstrumentRegistry {
    /// Register every container-holding instrument of the layout
    pub fn from_layout(layout: LabLayout) -> Result<Self> {
        layout.validate()?;

        let mut by_location = HashMap::new();
        let mut members = HashMap::new();
        for kind in InstrumentKind::ALL.into_iter().filter(|k| k.holds_containers()) {
            by_location.insert(layout.location_of(kind).clone(), kind);
            members.insert(kind, Vec::new());
        }

        Ok(Self {
            layout,
            by_location,
            members,
        })
    }

    pub fn layout(&self) -> &LabLayout {
        &self.layout
    }

    /// Instrument registered at a location, if any
    pub fn resolve(&self, location: &Location) -> Option<InstrumentKind> {
        self.by_location.get(location).copied()
    }

    pub fn location_of(&self, kind: InstrumentKind) -> &Location {
        self.layout.location_of(kind)
    }

    /// Containers currently on an instrument, in arrival order
    pub fn members(&self, kind: InstrumentKind) -> &[ContainerId] {
        self.members.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Instrument a container currently sits on
    pub fn instrument_holding(&self, container: ContainerId) -> Option<InstrumentKind> {
        self.members
            .iter()
            .find(|(_, ids)| ids.contains(&container))
            .map(|(kind, _)| *kind)
    }

    /// Move a container's membership from whatever it was on to the
    /// instrument at `to`. Returns the instruments left and joined.
    pub(crate) fn relocate(
        &mut self,
        container: ContainerId,
        to: &Location,
    ) -> (Option<InstrumentKind>, Option<InstrumentKind>) {
        let left = self.instrument_holding(container);
        if let Some(kind) = left {
            if let Some(ids) = self.members.get_mut(&kind) {
                ids.retain(|id| *id != container);
            }
        }

        let joined = self.resolve(to);
        if let Some(kind) = joined {
            self.members.entry(kind).or_default().push(container);
        }
        (left, joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> InstrumentRegistry {
        InstrumentRegistry::from_layout(LabLayout::default()).unwrap()
    }

    #[test]
    fn test_resolve_default_locations() {
        let reg = registry();
        assert_eq!(reg.resolve(&"centrifuge_P200".into()), Some(InstrumentKind::Centrifuge200uL));
        assert_eq!(reg.resolve(&"heater_shaker".into()), Some(InstrumentKind::HeaterShaker));
        assert_eq!(reg.resolve(&"ContainerHolder".into()), None);
        assert_eq!(reg.resolve(&"sequencer".into()), None);
    }

    #[test]
    fn test_no_substring_matching() {
        let reg = registry();
        // "heater" is a prefix of "heater_shaker" and must stay distinct.
        assert_eq!(reg.resolve(&"heater".into()), Some(InstrumentKind::Heater));
        assert_eq!(reg.resolve(&"heater_shake".into()), None);
    }

    #[test]
    fn test_relocate_keeps_single_membership() {
        let mut reg = registry();
        let a = ContainerId(1000);

        let (left, joined) = reg.relocate(a, &"centrifuge_P200".into());
        assert_eq!(left, None);
        assert_eq!(joined, Some(InstrumentKind::Centrifuge200uL));

        let (left, joined) = reg.relocate(a, &"thermal_cycler".into());
        assert_eq!(left, Some(InstrumentKind::Centrifuge200uL));
        assert_eq!(joined, Some(InstrumentKind::ThermalCycler));
        assert!(reg.members(InstrumentKind::Centrifuge200uL).is_empty());
        assert_eq!(reg.members(InstrumentKind::ThermalCycler), &[a]);

        reg.relocate(a, &"ContainerHolder".into());
        assert_eq!(reg.instrument_holding(a), None);
    }

    #[test]
    fn test_move_onto_same_instrument_twice() {
        let mut reg = registry();
        let a = ContainerId(1000);
        reg.relocate(a, &"capper".into());
        reg.relocate(a, &"capper".into());
        assert_eq!(reg.members(InstrumentKind::Capper), &[a]);
    }

    #[test]
    fn test_custom_layout() {
        let layout = LabLayout {
            heater: Location::new("hotplate"),
            ..LabLayout::default()
        };
        let reg = InstrumentRegistry::from_layout(layout).unwrap();
        assert_eq!(reg.resolve(&"hotplate".into()), Some(InstrumentKind::Heater));
        assert_eq!(reg.resolve(&"heater".into()), None);
        assert_eq!(reg.location_of(InstrumentKind::Heater).as_str(), "hotplate");
    }
}
