use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    source::{SpatMode, MAX_NUMBER_OF_SOURCES},
    trajectory::TrajectorySettings,
    Result, SpatError,
};

/// Top-level configuration of a [`SpatController`](crate::SpatController).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub number_of_sources: usize,
    pub first_source_id: i32,
    pub spat_mode: SpatMode,
    /// Apply span changes to every source.
    pub span_link: bool,
    pub position_trajectory: TrajectorySettings,
    pub elevation_trajectory: TrajectorySettings,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            number_of_sources: 2,
            first_source_id: 1,
            spat_mode: SpatMode::Dome,
            span_link: true,
            position_trajectory: TrajectorySettings::default(),
            elevation_trajectory: TrajectorySettings::default(),
        }
    }
}

impl ControllerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_NUMBER_OF_SOURCES).contains(&self.number_of_sources) {
            return Err(SpatError::InvalidSourceCount(self.number_of_sources));
        }
        for settings in [&self.position_trajectory, &self.elevation_trajectory] {
            if !(settings.cycle_duration.is_finite() && settings.cycle_duration > 0.0) {
                return Err(SpatError::msg(format!(
                    "trajectory cycle duration must be positive, got {}",
                    settings.cycle_duration
                )));
            }
        }
        Ok(())
    }
}
