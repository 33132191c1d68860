use helpers::general::wrap_angle;
use serde::Deserialize;

use crate::core::car::{CarInput, CarState};
use crate::core::consts::SimConstants;
use crate::core::track::{Surface, Track};

const G: f64 = 9.81;

/// Driving aids toggled per session.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct DrivingAids {
    pub auto_gears: bool,
    pub auto_brakes: bool,
}

impl Default for DrivingAids {
    fn default() -> Self {
        DrivingAids {
            auto_gears: true,
            auto_brakes: false,
        }
    }
}

/// Engine torque at the given rpm: a parabola peaking at `peak_rpm`,
/// floored at 10% of peak torque, derated by accumulated damage.
fn engine_torque(rpm: f64, damage: f64, consts: &SimConstants) -> f64 {
    let e = &consts.engine;
    let ratio = rpm / e.peak_rpm - 1.0;
    let curve = (1.0 - 0.8 * ratio * ratio).max(0.1);
    e.max_torque * curve * (1.0 - e.damage_derate * damage.clamp(0.0, 1.0))
}

/// Advances one car by one fixed sub-step. Mutates the state in place and
/// never fails; all values are clamped back into their valid ranges.
pub fn step_car(
    car: &mut CarState,
    input: &CarInput,
    dt: f64,
    track: &Track,
    consts: &SimConstants,
    aids: DrivingAids,
) {
    let ch = &consts.chassis;
    let en = &consts.engine;

    // 1. input smoothing: steering tracks the command at a bounded rate
    let steer_cmd = input.steer.clamp(-1.0, 1.0);
    let max_delta = ch.steer_speed * dt;
    car.steer += (steer_cmd - car.steer).clamp(-max_delta, max_delta);
    car.throttle = input.throttle.clamp(0.0, 1.0);

    // 2. surface detection
    let nearest = track.nearest_sample(car.pos_x, car.pos_z);
    car.surface = track.classify_surface(nearest, car.pos_x, car.pos_z, &consts.surface);
    let grip_mult = car.surface.grip();
    let drag_mult = car.surface.drag();

    // 3. engine force through the current gear
    let gear_ratio = en.gear_ratios[car.gear.min(en.gear_ratios.len() - 1)];
    let drive_force = engine_torque(car.rpm, car.damage, consts) * car.throttle * gear_ratio
        * en.final_drive
        / ch.wheel_radius;

    // 4. drag + rolling resistance
    let drag_force = ch.drag_coeff * car.speed * car.speed * drag_mult;
    let rolling_force = ch.rolling_resist * car.speed;

    // 5. braking, with the off-asphalt auto-brake floor
    let mut brake_input = input.brake.clamp(0.0, 1.0);
    if aids.auto_brakes && car.surface != Surface::Asphalt && car.speed > ch.auto_brake_speed {
        brake_input = brake_input.max(ch.auto_brake_floor);
    }
    car.brake = brake_input;
    let brake_force = brake_input * ch.max_brake_force;

    // 6. steering/heading update: lock shrinks with speed, yaw rate from the
    //    bicycle model, no heading change when nearly stopped
    let speed_ratio = (car.speed / ch.max_speed).clamp(0.0, 1.0);
    let steer_angle = car.steer * ch.max_steer_angle * (1.0 - speed_ratio * ch.steer_reduction);
    if car.speed > ch.min_steer_speed {
        car.heading = wrap_angle(car.heading + steer_angle * car.speed / ch.wheelbase * dt);
    }

    // 7. longitudinal integration
    let net_force = drive_force - drag_force - rolling_force - brake_force;
    car.speed = (car.speed + net_force / ch.mass * dt).clamp(0.0, ch.max_speed);

    // 8. grip check: downforce raises the limit with speed, a deficit scrubs
    //    speed and perturbs the heading instead of clamping instantly
    let downforce = 1.0 + ch.downforce_gain * speed_ratio;
    let grip_limit = ch.base_grip * grip_mult * downforce;
    let lat_acc = if steer_angle.abs() > 1e-6 {
        car.speed * car.speed * steer_angle.tan().abs() / ch.wheelbase
    } else {
        0.0
    };
    car.lateral_g = lat_acc / G;
    if car.lateral_g > grip_limit && grip_limit > 0.0 {
        let deficit = (car.lateral_g - grip_limit) / grip_limit;
        car.speed = (car.speed * (1.0 - ch.slide_speed_loss * deficit * dt).max(0.0))
            .clamp(0.0, ch.max_speed);
        car.heading =
            wrap_angle(car.heading + steer_angle.signum() * ch.slide_yaw_gain * deficit * dt);
    }

    // 9. position integration
    let (fwd_x, fwd_z) = car.forward();
    car.pos_x += fwd_x * car.speed * dt;
    car.pos_z += fwd_z * car.speed * dt;

    // 10. rpm from wheel speed, idle approximation when nearly stopped
    car.rpm = if car.speed > 1.0 {
        let wheel_omega = car.speed / ch.wheel_radius;
        wheel_omega * gear_ratio * en.final_drive * 60.0 / (2.0 * std::f64::consts::PI)
    } else {
        en.idle_rpm + car.throttle * 0.25 * (en.max_rpm - en.idle_rpm)
    }
    .clamp(en.idle_rpm, en.max_rpm);

    // 11. auto-shift
    if aids.auto_gears {
        if car.rpm > en.upshift_rpm && car.gear < en.gear_ratios.len() - 1 {
            car.gear += 1;
        } else if car.rpm < en.downshift_rpm && car.gear > 0 {
            car.gear -= 1;
        }
    }

    // 12. wheel spin accumulator (visual only)
    car.wheel_spin += car.speed / ch.wheel_radius * dt;

    // 13. track-position refresh, windowed around the previous spline-t
    car.spline_t = track.refresh_spline_t(car.spline_t, car.pos_x, car.pos_z);

    car.damage = car.damage.clamp(0.0, 1.0);
}

/// Places a car on a centerline sample facing along the track.
pub fn place_on_sample(car: &mut CarState, track: &Track, idx: usize, lateral: f64) {
    let n = track.sample_count();
    let s = &track.samples[idx];
    let next = &track.samples[(idx + 1) % n];

    let dx = next.x - s.x;
    let dz = next.z - s.z;

    car.pos_x = s.x + s.normal_x * lateral;
    car.pos_z = s.z + s.normal_z * lateral;
    car.heading = wrap_angle(f64::atan2(-dx, -dz));
    car.spline_t = track.t_for_index(idx);
    car.prev_spline_t = car.spline_t;
}
