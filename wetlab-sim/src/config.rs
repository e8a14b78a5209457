//! Lab configuration: strictness, instrument layout and log destination

use crate::error::{Error, Result};
use crate::location::Location;
use crate::policy::{InstrumentPolicy, PermissivePolicy, StrictPolicy};
use crate::registry::InstrumentKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment variable naming the directory the execution log is written to
pub const LOG_DIR_ENV: &str = "SCHEDULER_CONFIG_PATH";

/// File name of the persisted execution log
pub const LOG_FILE_NAME: &str = "protocol_flow.json";

/// Physical slot count of the fluorometer
pub const DEFAULT_FLUOROMETER_SLOTS: usize = 8;

/// How strictly instruments check their preconditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Reject empty instrument runs and fluorometer overfill
    #[default]
    Strict,
    /// Record every invocation as issued
    Permissive,
}

/// Home location of every instrument plus the holder rack new containers start in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabLayout {
    pub container_holder: Location,
    pub capper: Location,
    pub centrifuge_1p5ml: Location,
    pub centrifuge_200ul: Location,
    pub fluorometer: Location,
    pub heater: Location,
    pub heater_shaker: Location,
    pub magrack_1p5ml: Location,
    pub magrack_200ul: Location,
    pub thermal_cycler: Location,
    pub pipette: Location,
    pub robot: Location,
    pub sequencer: Location,
    pub refrigerator: Location,
}

impl Default for LabLayout {
    fn default() -> Self {
        Self {
            container_holder: Location::new("ContainerHolder"),
            capper: Location::new("capper"),
            centrifuge_1p5ml: Location::new("centrifuge_P1500"),
            centrifuge_200ul: Location::new("centrifuge_P200"),
            fluorometer: Location::new("fluorometer"),
            heater: Location::new("heater"),
            heater_shaker: Location::new("heater_shaker"),
            magrack_1p5ml: Location::new("magrack_P1500"),
            magrack_200ul: Location::new("magrack_P200"),
            thermal_cycler: Location::new("thermal_cycler"),
            pipette: Location::new("pipette"),
            robot: Location::new("robot"),
            sequencer: Location::new("sequencer"),
            refrigerator: Location::new("refrigerator"),
        }
    }
}

impl LabLayout {
    /// Home location of an instrument
    pub fn location_of(&self, kind: InstrumentKind) -> &Location {
        match kind {
            InstrumentKind::Capper => &self.capper,
            InstrumentKind::Centrifuge1p5mL => &self.centrifuge_1p5ml,
            InstrumentKind::Centrifuge200uL => &self.centrifuge_200ul,
            InstrumentKind::Fluorometer => &self.fluorometer,
            InstrumentKind::Heater => &self.heater,
            InstrumentKind::HeaterShaker => &self.heater_shaker,
            InstrumentKind::MagRack1p5mL => &self.magrack_1p5ml,
            InstrumentKind::MagRack200uL => &self.magrack_200ul,
            InstrumentKind::ThermalCycler => &self.thermal_cycler,
            InstrumentKind::Pipette => &self.pipette,
            InstrumentKind::Robot => &self.robot,
            InstrumentKind::Sequencer => &self.sequencer,
            InstrumentKind::Refrigerator => &self.refrigerator,
        }
    }

    /// Check that no two slots share a location name
    pub fn validate(&self) -> Result<()> {
        let mut seen: HashMap<&Location, &str> = HashMap::new();
        seen.insert(&self.container_holder, "container_holder");

        for kind in InstrumentKind::ALL {
            let loc = self.location_of(kind);
            if let Some(other) = seen.insert(loc, kind.as_str()) {
                return Err(Error::config_invalid(format!(
                    "{} and {} share location '{}'",
                    other,
                    kind.as_str(),
                    loc
                ))
                .with_operation("layout::validate"));
            }
        }
        Ok(())
    }

    /// Load a layout from a JSON file; missing keys keep their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let layout: LabLayout = serde_json::from_str(&content).map_err(|e| {
            Error::config_invalid(format!("invalid layout file {}: {}", path.display(), e))
                .with_operation("layout::load")
                .set_source(e)
        })?;
        layout.validate()?;
        Ok(layout)
    }
}

/// Everything a session needs to know about the simulated lab.
#[derive(Debug, Clone, PartialEq)]
pub struct LabConfig {
    pub strictness: Strictness,
    pub layout: LabLayout,
    pub fluorometer_slots: usize,
    pub log_path: PathBuf,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            strictness: Strictness::Strict,
            layout: LabLayout::default(),
            fluorometer_slots: DEFAULT_FLUOROMETER_SLOTS,
            log_path: PathBuf::from(LOG_FILE_NAME),
        }
    }
}

impl LabConfig {
    /// Default configuration with the log directory taken from
    /// `SCHEDULER_CONFIG_PATH` when it is set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(dir) = std::env::var_os(LOG_DIR_ENV) {
            config.log_path = PathBuf::from(dir).join(LOG_FILE_NAME);
        }
        config
    }

    pub fn with_log_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.log_path = dir.as_ref().join(LOG_FILE_NAME);
        self
    }

    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    pub fn with_layout(mut self, layout: LabLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn permissive() -> Self {
        Self::default().with_strictness(Strictness::Permissive)
    }

    /// Build the precondition policy this configuration asks for
    pub fn policy(&self) -> Box<dyn InstrumentPolicy> {
        match self.strictness {
            Strictness::Strict => Box::new(StrictPolicy::new(self.fluorometer_slots)),
            Strictness::Permissive => Box::new(PermissivePolicy),
        }
    }
}
