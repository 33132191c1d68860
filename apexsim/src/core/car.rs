use serde::Deserialize;
use std::rc::Rc;

use crate::core::driver::Driver;
use crate::core::track::Surface;

/// Per-frame control intent for one car, either from the presentation layer
/// (player) or from an AI controller.
#[derive(Debug, Clone, Copy, Default)]
pub struct CarInput {
    /// [0, 1]
    pub throttle: f64,
    /// [0, 1]
    pub brake: f64,
    /// [-1, 1]
    pub steer: f64,
}

/// * `car_no` - Car number painted on the livery
/// * `color` - Livery color as a CSS hex string
/// * `p_grid` - Grid position, 1 = pole
/// * `driver_initials` - Driver assigned to this entry
#[derive(Debug, Deserialize, Clone)]
pub struct CarPars {
    pub car_no: u32,
    pub color: String,
    pub p_grid: u32,
    pub driver_initials: String,
}

/// Mutable simulation state of one car. Owned exclusively by the race state
/// machine; AI controllers and projections only read it.
#[derive(Debug, Clone)]
pub struct CarState {
    /// (m) World position on the ground plane (y = 0).
    pub pos_x: f64,
    pub pos_z: f64,
    /// (rad) Heading, 0 points along -Z.
    pub heading: f64,
    /// (m/s) Always >= 0.
    pub speed: f64,
    pub rpm: f64,
    /// Gear index 0..5.
    pub gear: usize,
    /// Smoothed control state actually applied by the physics.
    pub throttle: f64,
    pub brake: f64,
    pub steer: f64,
    /// Normalized track position in [0, 1).
    pub spline_t: f64,
    /// Spline-t at the previous bookkeeping pass, for lap-line crossing.
    pub prev_spline_t: f64,
    pub lap: u32,
    pub lap_times: Vec<f64>,
    pub best_lap: Option<f64>,
    /// (s) Race time at which the current lap started.
    pub lap_start_time: f64,
    /// (s) Completed sector splits within the current lap.
    pub sector_times: Vec<f64>,
    pub cur_sector: usize,
    pub surface: Surface,
    pub finished: bool,
    pub finish_time: f64,
    /// [0, 1] Accumulated damage, never decreases.
    pub damage: f64,
    /// (g) Current cornering load estimate.
    pub lateral_g: f64,
    /// (rad) Wheel rotation accumulator, unbounded, visual only.
    pub wheel_spin: f64,
}

impl Default for CarState {
    fn default() -> Self {
        CarState {
            pos_x: 0.0,
            pos_z: 0.0,
            heading: 0.0,
            speed: 0.0,
            rpm: 0.0,
            gear: 0,
            throttle: 0.0,
            brake: 0.0,
            steer: 0.0,
            spline_t: 0.0,
            prev_spline_t: 0.0,
            lap: 0,
            lap_times: Vec::new(),
            best_lap: None,
            lap_start_time: 0.0,
            sector_times: Vec::new(),
            cur_sector: 0,
            surface: Surface::Asphalt,
            finished: false,
            finish_time: 0.0,
            damage: 0.0,
            lateral_g: 0.0,
            wheel_spin: 0.0,
        }
    }
}

impl CarState {
    /// Unit forward vector derived from the heading.
    pub fn forward(&self) -> (f64, f64) {
        (-self.heading.sin(), -self.heading.cos())
    }

    /// Unit right vector (forward rotated -90 deg about the up axis).
    pub fn right(&self) -> (f64, f64) {
        (self.heading.cos(), -self.heading.sin())
    }

    /// Adds damage, keeping the total within [0, 1].
    pub fn add_damage(&mut self, amount: f64) {
        self.damage = (self.damage + amount.max(0.0)).min(1.0);
    }
}

/// One grid entry: static parameters, the shared driver, and the mutable
/// car state.
#[derive(Debug)]
pub struct Car {
    pub car_no: u32,
    pub color: String,
    pub p_grid: u32,
    pub driver: Rc<Driver>,
    pub state: CarState,
}

impl Car {
    pub fn new(car_pars: &CarPars, driver: Rc<Driver>) -> Car {
        Car {
            car_no: car_pars.car_no,
            color: car_pars.color.to_owned(),
            p_grid: car_pars.p_grid,
            driver,
            state: CarState::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damage_is_clamped_and_monotone() {
        let mut state = CarState::default();
        state.add_damage(0.4);
        state.add_damage(-1.0);
        assert_eq!(state.damage, 0.4);
        state.add_damage(0.9);
        assert_eq!(state.damage, 1.0);
    }

    #[test]
    fn forward_points_along_negative_z_at_zero_heading() {
        let state = CarState::default();
        let (fx, fz) = state.forward();
        assert!(fx.abs() < 1e-12);
        assert!((fz + 1.0).abs() < 1e-12);
    }
}
