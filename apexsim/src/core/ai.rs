use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::rc::Rc;

use helpers::general::wrap_angle;

use crate::core::car::{Car, CarInput};
use crate::core::consts::AiConsts;
use crate::core::driver::{Difficulty, Driver};
use crate::core::racing_line::RacingLine;

/// Per-car AI control policy. Converts the car's state, the precomputed
/// racing line and nearby traffic into throttle/brake/steer once per fixed
/// tick.
///
/// The controller carries private scratch state that must survive across
/// ticks: a slowly-changing heading-error bias modelling imprecision (a
/// persistent aim error resampled every few seconds reads as human, unlike
/// per-tick noise), and a lateral overtake offset that decays toward zero
/// when not reinforced by traffic.
#[derive(Debug)]
pub struct AiDriver {
    driver: Rc<Driver>,
    difficulty: Difficulty,
    line: Rc<RacingLine>,
    rng: StdRng,
    /// (rad) Current heading-error bias.
    error_offset: f64,
    /// Ticks until the bias is resampled.
    error_resample_ticks: u32,
    /// (m) Lateral offset from the racing line used for overtaking.
    overtake_offset: f64,
}

impl AiDriver {
    pub fn new(driver: Rc<Driver>, difficulty: Difficulty, line: Rc<RacingLine>, rng: StdRng) -> AiDriver {
        AiDriver {
            driver,
            difficulty,
            line,
            rng,
            error_offset: 0.0,
            error_resample_ticks: 0,
            overtake_offset: 0.0,
        }
    }

    pub fn overtake_offset(&self) -> f64 {
        self.overtake_offset
    }

    /// Computes the control input for the controlled car. `cars` is the live
    /// grid including the controlled car at `car_idx`.
    pub fn get_input(&mut self, cars: &[Car], car_idx: usize, consts: &AiConsts) -> CarInput {
        let car = &cars[car_idx].state;
        let eff_skill = (self.driver.skill * self.difficulty.skill_mult()).clamp(0.0, 1.0);
        let eff_aggression = self.driver.aggression * self.difficulty.aggression_mult();

        // imprecision model: resample the persistent heading bias every
        // 60-180 ticks, magnitude scaling with (1 - consistency)
        if self.error_resample_ticks == 0 {
            let std_dev = consts.bias_std * (1.0 - self.driver.consistency);
            self.error_offset = if std_dev > 0.0 {
                Normal::new(0.0, std_dev).unwrap().sample(&mut self.rng)
            } else {
                0.0
            };
            self.error_resample_ticks = self
                .rng
                .gen_range(consts.bias_ticks_min..=consts.bias_ticks_max);
        }
        self.error_resample_ticks -= 1;

        // traffic awareness updates the overtake offset and the speed cap
        let speed_cap = self.scan_traffic(cars, car_idx, eff_aggression, consts);

        // lookahead on the racing line scales with speed; braking reacts to a
        // nearer, more conservative horizon than steering
        let n = self.line.len() as i64;
        let base_idx = (car.spline_t.rem_euclid(1.0) * n as f64) as i64;
        let steer_idx =
            base_idx + (consts.steer_lookahead_base + consts.steer_lookahead_gain * car.speed) as i64;
        let brake_idx =
            base_idx + (consts.brake_lookahead_base + consts.brake_lookahead_gain * car.speed) as i64;

        let steer_pt = self.line.point(steer_idx);
        let brake_pt = self.line.point(brake_idx);

        // steering target, laterally offset for overtaking
        let right_x = -steer_pt.dir_z;
        let right_z = steer_pt.dir_x;
        let target_x = steer_pt.x + right_x * self.overtake_offset;
        let target_z = steer_pt.z + right_z * self.overtake_offset;

        let bearing = f64::atan2(-(target_x - car.pos_x), -(target_z - car.pos_z));
        let heading_error = wrap_angle(bearing - car.heading) + self.error_offset;
        let steer = (heading_error * consts.steer_gain).clamp(-1.0, 1.0);

        // target speed from the two lookahead points, scaled by difficulty
        // and skill, capped by traffic ahead
        let mut target_speed = steer_pt.target_speed.min(brake_pt.target_speed)
            * self.difficulty.top_speed_frac()
            * (0.88 + 0.12 * eff_skill);
        if let Some(cap) = speed_cap {
            target_speed = target_speed.min(cap);
        }

        let speed_error = target_speed - car.speed;
        let full = consts.full_response_error;
        let hold = consts.hold_band;

        let (mut throttle, mut brake) = if speed_error > full {
            (1.0, 0.0)
        } else if speed_error > hold {
            (0.35 + 0.65 * (speed_error - hold) / (full - hold), 0.0)
        } else if speed_error >= -hold {
            (consts.hold_throttle, 0.0)
        } else if speed_error >= -full {
            (0.0, consts.light_brake)
        } else {
            // lower skill delays the braking reaction when far above target
            (0.0, 0.6 + 0.4 * eff_skill)
        };

        if car.lateral_g > consts.corner_g_threshold {
            throttle *= consts.corner_throttle_cut;
        }

        // inconsistent drivers occasionally lift mid-corner
        if car.lateral_g > 0.3
            && self.rng.gen::<f64>() < (1.0 - self.driver.consistency) * consts.lift_chance_scale
        {
            throttle *= 0.5;
        }

        CarInput {
            throttle,
            brake,
            steer,
        }
    }

    /// Scans cars within the traffic radius, projecting them onto the
    /// controlled car's forward/right axes. Returns a speed cap when stuck
    /// close behind another car; updates the overtake offset.
    fn scan_traffic(
        &mut self,
        cars: &[Car],
        car_idx: usize,
        eff_aggression: f64,
        consts: &AiConsts,
    ) -> Option<f64> {
        let car = &cars[car_idx].state;
        let (fwd_x, fwd_z) = car.forward();
        let (right_x, right_z) = car.right();

        let mut speed_cap: Option<f64> = None;
        let mut reinforced = false;

        for (i, other) in cars.iter().enumerate() {
            if i == car_idx {
                continue;
            }
            let dx = other.state.pos_x - car.pos_x;
            let dz = other.state.pos_z - car.pos_z;
            if dx * dx + dz * dz > consts.traffic_radius * consts.traffic_radius {
                continue;
            }

            let fwd_d = dx * fwd_x + dz * fwd_z;
            let lat_d = dx * right_x + dz * right_z;

            if fwd_d > 0.0 && fwd_d < consts.ahead_dist && lat_d.abs() < consts.ahead_lat {
                if fwd_d < consts.cap_dist {
                    let cap = other.state.speed + consts.cap_margin;
                    speed_cap = Some(speed_cap.map_or(cap, |c: f64| c.min(cap)));
                }

                if eff_aggression > consts.overtake_min_aggression
                    && car.lateral_g < consts.overtake_max_lat_g
                    && fwd_d < consts.overtake_dist
                {
                    // pull toward whichever side shows more space
                    let side = if lat_d > 0.0 { -1.0 } else { 1.0 };
                    self.overtake_offset = side * consts.overtake_gain * eff_aggression;
                    reinforced = true;
                }
            } else if fwd_d.abs() < consts.side_fwd
                && lat_d.abs() > consts.side_lat_min
                && lat_d.abs() < consts.side_lat_max
            {
                // side-by-side: push away to avoid contact
                self.overtake_offset -= lat_d.signum() * consts.side_push;
                reinforced = true;
            }
        }

        if !reinforced {
            self.overtake_offset *= consts.offset_decay;
        }
        self.overtake_offset = self
            .overtake_offset
            .clamp(-consts.offset_max, consts.offset_max);

        speed_cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::car::CarPars;
    use crate::core::consts::SimConstants;
    use crate::core::driver::DriverPars;
    use crate::core::physics::place_on_sample;
    use crate::core::racing_line::build_racing_line;
    use crate::core::track::Track;
    use crate::pre::scenario::circle_track;
    use rand::SeedableRng;

    fn setup(track: &Track, aggression: f64) -> (AiDriver, SimConstants) {
        let consts = SimConstants::default();
        let line = Rc::new(build_racing_line(track, &consts.line, &consts.chassis));
        let driver = Rc::new(Driver::new(&DriverPars {
            initials: "AIX".to_owned(),
            name: "Test AI".to_owned(),
            skill: 0.9,
            aggression,
            consistency: 0.9,
        }));
        let ai = AiDriver::new(driver, Difficulty::Hard, line, StdRng::seed_from_u64(7));
        (ai, consts)
    }

    fn grid_car(track: &Track, idx: usize, lateral: f64, speed: f64) -> Car {
        let driver = Rc::new(Driver::new(&DriverPars {
            initials: "CAR".to_owned(),
            name: "Grid Car".to_owned(),
            skill: 0.8,
            aggression: 0.5,
            consistency: 0.9,
        }));
        let mut car = Car::new(
            &CarPars {
                car_no: idx as u32 + 1,
                color: "#00ff00".to_owned(),
                p_grid: idx as u32 + 1,
                driver_initials: "CAR".to_owned(),
            },
            driver,
        );
        place_on_sample(&mut car.state, track, idx, lateral);
        car.state.speed = speed;
        car
    }

    #[test]
    fn input_ranges_are_respected() {
        let track = circle_track(200.0, 240, 6.0);
        let (mut ai, consts) = setup(&track, 0.5);
        let cars = vec![grid_car(&track, 0, 0.0, 30.0)];

        for _ in 0..200 {
            let input = ai.get_input(&cars, 0, &consts.ai);
            assert!(input.throttle >= 0.0 && input.throttle <= 1.0);
            assert!(input.brake >= 0.0 && input.brake <= 1.0);
            assert!(input.steer >= -1.0 && input.steer <= 1.0);
        }
    }

    #[test]
    fn blocked_straight_line_car_sets_overtake_offset() {
        let track = circle_track(400.0, 600, 6.0);
        let (mut ai, consts) = setup(&track, 0.9);

        // leader ~10 m ahead along the track with ~1 m lateral offset
        let mut follower = grid_car(&track, 0, 0.0, 40.0);
        follower.state.lateral_g = 0.2;
        let (fwd_x, fwd_z) = follower.state.forward();
        let (right_x, right_z) = follower.state.right();
        let mut leader = grid_car(&track, 0, 0.0, 38.0);
        leader.state.pos_x = follower.state.pos_x + fwd_x * 10.0 + right_x * 1.0;
        leader.state.pos_z = follower.state.pos_z + fwd_z * 10.0 + right_z * 1.0;

        let cars = vec![follower, leader];
        ai.get_input(&cars, 0, &consts.ai);
        assert!(
            ai.overtake_offset().abs() > 0.1,
            "expected overtake offset, got {}",
            ai.overtake_offset()
        );
        // pulled away from the blocking car's side
        assert!(ai.overtake_offset() < 0.0);
    }

    #[test]
    fn overtake_offset_decays_without_traffic() {
        let track = circle_track(200.0, 240, 6.0);
        let (mut ai, consts) = setup(&track, 0.9);
        ai.overtake_offset = 3.0;

        let cars = vec![grid_car(&track, 0, 0.0, 30.0)];
        ai.get_input(&cars, 0, &consts.ai);
        assert!((ai.overtake_offset() - 3.0 * consts.ai.offset_decay).abs() < 1e-9);
    }

    #[test]
    fn far_above_target_speed_brakes_hard() {
        let track = circle_track(200.0, 240, 6.0);
        let (mut ai, consts) = setup(&track, 0.5);
        let mut car = grid_car(&track, 0, 0.0, 0.0);
        car.state.speed = 100.0; // far above any target speed on this circle
        let cars = vec![car];

        let input = ai.get_input(&cars, 0, &consts.ai);
        assert_eq!(input.throttle, 0.0);
        assert!(input.brake >= 0.6);
    }

    #[test]
    fn seeded_controllers_are_deterministic() {
        let track = circle_track(200.0, 240, 6.0);
        let (mut a, consts) = setup(&track, 0.5);
        let (mut b, _) = setup(&track, 0.5);
        let cars = vec![grid_car(&track, 0, 0.0, 25.0)];

        for _ in 0..300 {
            let ia = a.get_input(&cars, 0, &consts.ai);
            let ib = b.get_input(&cars, 0, &consts.ai);
            assert_eq!(ia.steer, ib.steer);
            assert_eq!(ia.throttle, ib.throttle);
            assert_eq!(ia.brake, ib.brake);
        }
    }
}
