use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::OpenOptions;
use std::path::Path;

use crate::core::car::CarPars;
use crate::core::consts::SimConstants;
use crate::core::driver::DriverPars;
use crate::core::race::RacePars;
use crate::core::track::{ControlPoint, Track};

fn default_sample_count() -> usize {
    600
}

fn default_half_width() -> f64 {
    6.0
}

/// Track description inside a scenario file. The centerline either comes
/// from a CSV file (`x_m, z_m, half_width_m` per row) or is resampled from
/// the annotated control polygon itself.
#[derive(Debug, Deserialize, Clone)]
pub struct TrackPars {
    pub name: String,
    #[serde(default)]
    pub centerline_file: Option<String>,
    #[serde(default = "default_sample_count")]
    pub sample_count: usize,
    #[serde(default = "default_half_width")]
    pub default_half_width: f64,
    pub control_points: Vec<ControlPoint>,
}

impl TrackPars {
    pub fn build(&self) -> Result<Track> {
        match &self.centerline_file {
            Some(file) => Track::from_csv(&self.name, Path::new(file), self.control_points.clone()),
            None => Ok(Track::from_control_points(
                &self.name,
                self.control_points.clone(),
                self.sample_count,
                self.default_half_width,
            )),
        }
    }
}

/// SimPars is used to store all other parameter structs.
#[derive(Debug, Deserialize, Clone)]
pub struct SimPars {
    pub race_pars: RacePars,
    pub track: TrackPars,
    pub driver_pars_all: Vec<DriverPars>,
    pub car_pars_all: Vec<CarPars>,
}

/// read_sim_pars reads the JSON file and decodes the JSON string into the
/// simulation parameters struct.
pub fn read_sim_pars(filepath: &Path) -> Result<SimPars> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open parameter file {}!",
            filepath.to_str().unwrap_or("unknown")
        ))?;
    let pars = serde_json::from_reader(&fh).context(format!(
        "Failed to parse parameter file {}!",
        filepath.to_str().unwrap_or("unknown")
    ))?;
    Ok(pars)
}

/// Reads the simulation constants (chassis, engine, AI, ...) from a JSON
/// file. Missing sections and fields fall back to the built-in defaults.
pub fn read_sim_constants(filepath: &Path) -> Result<SimConstants> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open simulation constants file {}!",
            filepath.to_str().unwrap_or("unknown")
        ))?;
    let consts = serde_json::from_reader(&fh).context(format!(
        "Failed to parse simulation constants file {}!",
        filepath.to_str().unwrap_or("unknown")
    ))?;
    Ok(consts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_json_decodes_with_defaults() {
        let raw = r##"{
            "race_pars": {
                "tot_laps": 3,
                "participants": [7, 12]
            },
            "track": {
                "name": "test ring",
                "control_points": [
                    {"x": 0.0, "z": 0.0},
                    {"x": 200.0, "z": 0.0, "corner": true, "corner_speed": 25.0},
                    {"x": 200.0, "z": 200.0},
                    {"x": 0.0, "z": 200.0, "corner": true, "corner_speed": 25.0}
                ]
            },
            "driver_pars_all": [
                {"initials": "VLK", "name": "Viktor Volkov"}
            ],
            "car_pars_all": [
                {"car_no": 7, "color": "#d40000", "p_grid": 1, "driver_initials": "VLK"}
            ]
        }"##;

        let pars: SimPars = serde_json::from_str(raw).unwrap();
        assert_eq!(pars.race_pars.tot_laps, 3);
        assert_eq!(pars.track.sample_count, 600);
        assert!(pars.race_pars.player_car_no.is_none());
        // skill falls back to its default
        assert!(pars.driver_pars_all[0].skill > 0.0);

        let track = pars.track.build().unwrap();
        assert_eq!(track.sample_count(), 600);
    }
}
