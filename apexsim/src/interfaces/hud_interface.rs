use anyhow::{Context, Result};

use crate::core::race::{CameraMode, Race, RacePhase, Standing};
use crate::post::race_result::{FastestLap, RaceResult};

/// Cap on the snapshot rate toward the presentation layer.
pub const MAX_HUD_UPDATE_FREQUENCY: f64 = 20.0;

#[derive(Debug, Clone, Default)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Renderable pose of one car. Positions are on the ground plane, y is
/// always zero.
#[derive(Debug, Clone)]
pub struct CarPose {
    pub car_no: u32,
    pub driver_initials: String,
    pub color: RgbColor,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub heading: f64,
    /// (rad) Current front wheel angle for the steering animation.
    pub wheel_angle: f64,
    /// (rad) Wheel rotation accumulator.
    pub wheel_spin: f64,
    pub speed: f64,
    pub damage: f64,
}

/// On-screen telemetry for the focused car.
#[derive(Debug, Clone)]
pub struct HudData {
    pub speed_kmh: f64,
    pub rpm: f64,
    /// Gear displayed 1-based.
    pub gear: u32,
    pub position: u32,
    pub lap: u32,
    pub tot_laps: u32,
    /// (s) Running time of the current lap.
    pub cur_lap_time: f64,
    pub best_lap: Option<f64>,
    pub surface: String,
    pub damage: f64,
}

/// One frame of presentation data, pushed over the channel at most
/// `MAX_HUD_UPDATE_FREQUENCY` times per simulated second.
#[derive(Debug, Clone)]
pub struct RaceSnapshot {
    pub phase: RacePhase,
    pub race_time: f64,
    pub start_lights: u32,
    pub camera_mode: CameraMode,
    pub show_hud: bool,
    pub car_poses: Vec<CarPose>,
    pub standings: Vec<Standing>,
    pub fastest_lap: Option<FastestLap>,
    /// Telemetry of the player car, or of the leader on full autopilot.
    pub hud: Option<HudData>,
    /// Final results payload, sent once when the race reaches results.
    pub final_result: Option<RaceResult>,
}

/// Telemetry of one car by grid-slot index.
pub fn hud_data(race: &Race, car_idx: usize) -> HudData {
    let car = &race.cars[car_idx];
    let position = race
        .standings
        .iter()
        .find(|s| s.car_idx == car_idx)
        .map(|s| s.position)
        .unwrap_or(0);

    HudData {
        speed_kmh: car.state.speed * 3.6,
        rpm: car.state.rpm,
        gear: car.state.gear as u32 + 1,
        position,
        lap: car.state.lap,
        tot_laps: race.tot_laps,
        cur_lap_time: race.cur_racetime - car.state.lap_start_time,
        best_lap: car.state.best_lap,
        surface: car.state.surface.name().to_owned(),
        damage: car.state.damage,
    }
}

/// Projects the live race into a renderable snapshot. Fails only on an
/// unparsable livery color.
pub fn make_snapshot(race: &Race, final_result: Option<RaceResult>) -> Result<RaceSnapshot> {
    let mut car_poses = Vec::with_capacity(race.cars.len());

    for car in race.cars.iter() {
        let tmp_color = car
            .color
            .parse::<css_color_parser::Color>()
            .context("Could not parse hex color!")?;

        car_poses.push(CarPose {
            car_no: car.car_no,
            driver_initials: car.driver.initials.to_owned(),
            color: RgbColor {
                r: tmp_color.r,
                g: tmp_color.g,
                b: tmp_color.b,
            },
            x: car.state.pos_x,
            y: 0.0,
            z: car.state.pos_z,
            heading: car.state.heading,
            wheel_angle: car.state.steer * race.consts.chassis.max_steer_angle,
            wheel_spin: car.state.wheel_spin,
            speed: car.state.speed,
            damage: car.state.damage,
        });
    }

    let focus_idx = race
        .player_idx
        .or_else(|| race.standings.first().map(|s| s.car_idx));

    Ok(RaceSnapshot {
        phase: race.phase,
        race_time: race.cur_racetime,
        start_lights: race.start_lights,
        camera_mode: race.camera_mode,
        show_hud: race.show_hud,
        car_poses,
        standings: race.standings.clone(),
        fastest_lap: race.fastest_lap.clone(),
        hud: focus_idx.map(|idx| hud_data(race, idx)),
        final_result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::consts::SimConstants;
    use crate::core::race::Race;
    use crate::pre::scenario::demo_sim_pars;

    fn demo_race() -> Race {
        let mut pars = demo_sim_pars();
        pars.race_pars.seed = Some(3);
        let track = pars.track.build().unwrap();
        Race::new(
            &pars.race_pars,
            track,
            &pars.driver_pars_all,
            &pars.car_pars_all,
            SimConstants::default(),
        )
    }

    #[test]
    fn snapshot_carries_one_pose_per_car() {
        let race = demo_race();
        let snapshot = make_snapshot(&race, None).unwrap();
        assert_eq!(snapshot.car_poses.len(), race.cars.len());
        assert!(snapshot.car_poses.iter().all(|p| p.y == 0.0));
    }

    #[test]
    fn invalid_livery_color_is_rejected() {
        let mut race = demo_race();
        race.cars[0].color = "not a color".to_owned();
        assert!(make_snapshot(&race, None).is_err());
    }

    #[test]
    fn hud_gear_is_displayed_one_based() {
        let mut race = demo_race();
        race.cars[0].state.gear = 2;
        let hud = hud_data(&race, 0);
        assert_eq!(hud.gear, 3);
    }
}
