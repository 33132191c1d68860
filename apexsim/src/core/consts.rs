use serde::Deserialize;

/// Chassis and tire parameters shared by every car on the grid.
///
/// * `mass` - (kg) Vehicle mass
/// * `max_speed` - (m/s) Hard speed cap
/// * `max_brake_force` - (N) Brake force at full pedal
/// * `drag_coeff` - (N/(m/s)^2) Quadratic aerodynamic drag coefficient
/// * `rolling_resist` - (N/(m/s)) Linear rolling resistance coefficient
/// * `steer_speed` - (1/s) Rate at which the steering input tracks the command
/// * `max_steer_angle` - (rad) Front wheel angle at full lock
/// * `steer_reduction` - Fraction of lock lost at top speed
/// * `min_steer_speed` - (m/s) Below this the heading does not change
/// * `wheelbase` - (m) Used for the bicycle-model yaw rate and turn radius
/// * `wheel_radius` - (m) Driven wheel radius
/// * `base_grip` - (g) Lateral grip limit on asphalt at zero downforce
/// * `downforce_gain` - Grip gain at max speed (grip scales with speed ratio)
/// * `slide_speed_loss` - (1/s) Speed scrub rate per unit of grip deficit
/// * `slide_yaw_gain` - (rad/s) Heading perturbation per unit of grip deficit
/// * `auto_brake_floor` - Minimum brake input applied by the braking aid
/// * `auto_brake_speed` - (m/s) Speed above which the braking aid engages off-asphalt
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChassisConsts {
    pub mass: f64,
    pub max_speed: f64,
    pub max_brake_force: f64,
    pub drag_coeff: f64,
    pub rolling_resist: f64,
    pub steer_speed: f64,
    pub max_steer_angle: f64,
    pub steer_reduction: f64,
    pub min_steer_speed: f64,
    pub wheelbase: f64,
    pub wheel_radius: f64,
    pub base_grip: f64,
    pub downforce_gain: f64,
    pub slide_speed_loss: f64,
    pub slide_yaw_gain: f64,
    pub auto_brake_floor: f64,
    pub auto_brake_speed: f64,
}

impl Default for ChassisConsts {
    fn default() -> Self {
        ChassisConsts {
            mass: 1250.0,
            max_speed: 85.0,
            max_brake_force: 24000.0,
            drag_coeff: 0.45,
            rolling_resist: 14.0,
            steer_speed: 2.5,
            max_steer_angle: 0.55,
            steer_reduction: 0.6,
            min_steer_speed: 0.5,
            wheelbase: 2.6,
            wheel_radius: 0.33,
            base_grip: 1.7,
            downforce_gain: 0.9,
            slide_speed_loss: 0.9,
            slide_yaw_gain: 0.45,
            auto_brake_floor: 0.3,
            auto_brake_speed: 20.0,
        }
    }
}

/// Engine and drivetrain parameters. Torque follows a parabola peaking at
/// `peak_rpm` and never drops below 10% of `max_torque`.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngineConsts {
    pub max_torque: f64,
    pub peak_rpm: f64,
    pub idle_rpm: f64,
    pub max_rpm: f64,
    pub gear_ratios: [f64; 6],
    pub final_drive: f64,
    pub upshift_rpm: f64,
    pub downshift_rpm: f64,
    /// Fraction of engine output lost at full damage.
    pub damage_derate: f64,
}

impl Default for EngineConsts {
    fn default() -> Self {
        EngineConsts {
            max_torque: 480.0,
            peak_rpm: 5600.0,
            idle_rpm: 900.0,
            max_rpm: 7400.0,
            gear_ratios: [3.2, 2.5, 1.9, 1.5, 1.2, 1.0],
            final_drive: 3.6,
            upshift_rpm: 6900.0,
            downshift_rpm: 2600.0,
            damage_derate: 0.5,
        }
    }
}

/// Lateral band widths for the surface classification, measured outward from
/// the centerline sample. Asphalt ends at the sample half-width; the barrier
/// stands `barrier_offset` beyond the half-width.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SurfaceConsts {
    pub curb_width: f64,
    pub gravel_width: f64,
    pub barrier_offset: f64,
}

impl Default for SurfaceConsts {
    fn default() -> Self {
        SurfaceConsts {
            curb_width: 1.2,
            gravel_width: 2.5,
            barrier_offset: 8.0,
        }
    }
}

/// Racing-line construction parameters.
///
/// * `max_speed_frac` - Non-corner target speed as a fraction of `max_speed`
/// * `corner_shift_frac` - Inside shift as a fraction of the half-width
/// * `curvature_span` - Sample offset used for the local curvature estimate
/// * `brake_decel` - (m/s^2) Deceleration capacity for the backward passes
/// * `accel_cap` - (m/s^2) Acceleration capacity for the forward passes
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LineConsts {
    pub max_speed_frac: f64,
    pub corner_shift_frac: f64,
    pub curvature_span: usize,
    pub brake_decel: f64,
    pub brake_passes: usize,
    pub accel_cap: f64,
    pub accel_passes: usize,
}

impl Default for LineConsts {
    fn default() -> Self {
        LineConsts {
            max_speed_frac: 0.92,
            corner_shift_frac: 0.4,
            curvature_span: 5,
            brake_decel: 18.0,
            brake_passes: 5,
            accel_cap: 12.0,
            accel_passes: 3,
        }
    }
}

/// AI control policy parameters. Lookahead distances are in centerline
/// samples: a base offset plus a gain per m/s of current speed.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AiConsts {
    pub steer_lookahead_base: f64,
    pub steer_lookahead_gain: f64,
    pub brake_lookahead_base: f64,
    pub brake_lookahead_gain: f64,
    pub steer_gain: f64,
    /// (rad) Std. deviation of the heading bias at zero consistency.
    pub bias_std: f64,
    pub bias_ticks_min: u32,
    pub bias_ticks_max: u32,
    /// (m/s) Speed errors beyond this get full throttle / hard braking.
    pub full_response_error: f64,
    /// (m/s) Speed errors within this band get maintenance throttle.
    pub hold_band: f64,
    pub hold_throttle: f64,
    pub light_brake: f64,
    pub corner_g_threshold: f64,
    pub corner_throttle_cut: f64,
    /// Per-tick throttle lift probability at zero consistency.
    pub lift_chance_scale: f64,
    pub traffic_radius: f64,
    pub ahead_dist: f64,
    pub ahead_lat: f64,
    pub cap_dist: f64,
    pub cap_margin: f64,
    pub overtake_dist: f64,
    pub overtake_min_aggression: f64,
    pub overtake_max_lat_g: f64,
    pub overtake_gain: f64,
    pub side_fwd: f64,
    pub side_lat_min: f64,
    pub side_lat_max: f64,
    pub side_push: f64,
    pub offset_decay: f64,
    pub offset_max: f64,
}

impl Default for AiConsts {
    fn default() -> Self {
        AiConsts {
            steer_lookahead_base: 5.0,
            steer_lookahead_gain: 0.45,
            brake_lookahead_base: 3.0,
            brake_lookahead_gain: 0.25,
            steer_gain: 3.0,
            bias_std: 0.05,
            bias_ticks_min: 60,
            bias_ticks_max: 180,
            full_response_error: 8.0,
            hold_band: 2.0,
            hold_throttle: 0.25,
            light_brake: 0.3,
            corner_g_threshold: 1.0,
            corner_throttle_cut: 0.6,
            lift_chance_scale: 0.02,
            traffic_radius: 25.0,
            ahead_dist: 20.0,
            ahead_lat: 3.0,
            cap_dist: 8.0,
            cap_margin: 1.0,
            overtake_dist: 15.0,
            overtake_min_aggression: 0.55,
            overtake_max_lat_g: 0.35,
            overtake_gain: 2.8,
            side_fwd: 4.0,
            side_lat_min: 1.5,
            side_lat_max: 3.5,
            side_push: 0.35,
            offset_decay: 0.95,
            offset_max: 5.0,
        }
    }
}

/// Car-to-car and barrier collision response parameters.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CollisionConsts {
    /// (m) Circle radius per car; contact below twice this distance.
    pub radius: f64,
    /// Fraction of the speed difference taken from the faster car.
    pub speed_transfer: f64,
    /// Fraction of the transferred speed the slower car actually receives.
    pub restitution: f64,
    pub contact_friction: f64,
    pub heading_nudge: f64,
    /// (m/s) Closing speed above which contact causes damage.
    pub damage_speed_threshold: f64,
    pub damage_gain: f64,
    pub barrier_pushback: f64,
    pub barrier_speed_cut: f64,
    pub barrier_damage: f64,
}

impl Default for CollisionConsts {
    fn default() -> Self {
        CollisionConsts {
            radius: 1.9,
            speed_transfer: 0.35,
            restitution: 0.6,
            contact_friction: 0.985,
            heading_nudge: 0.03,
            damage_speed_threshold: 8.0,
            damage_gain: 0.012,
            barrier_pushback: 1.5,
            barrier_speed_cut: 0.3,
            barrier_damage: 0.04,
        }
    }
}

/// Race lifecycle parameters.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RaceConsts {
    /// (s) Fixed physics sub-step.
    pub sub_step: f64,
    /// (s) Frame deltas are clamped to this before accumulation.
    pub max_frame_delta: f64,
    pub start_light_interval: f64,
    pub start_light_count: u32,
    pub start_delay_min: f64,
    pub start_delay_max: f64,
    /// (s) AI-only running time after the player finishes.
    pub finish_grace: f64,
    pub sector_count: usize,
    pub lap_cross_high: f64,
    pub lap_cross_low: f64,
    pub lap_min_speed: f64,
    /// Lap weight for the standings sort key; dominates any spline fraction.
    pub standings_lap_key: f64,
    /// (s) Reference lap time for the leader gap when no lap is on the books.
    pub gap_fallback_laptime: f64,
    /// Spline-t gap between the start line and the first grid slot.
    pub grid_back_t: f64,
    pub grid_step_t: f64,
    /// (m) Alternating lateral stagger between grid columns.
    pub grid_lateral: f64,
}

impl Default for RaceConsts {
    fn default() -> Self {
        RaceConsts {
            sub_step: 1.0 / 120.0,
            max_frame_delta: 0.25,
            start_light_interval: 0.8,
            start_light_count: 5,
            start_delay_min: 0.5,
            start_delay_max: 1.0,
            finish_grace: 10.0,
            sector_count: 3,
            lap_cross_high: 0.90,
            lap_cross_low: 0.10,
            lap_min_speed: 5.0,
            standings_lap_key: 1000.0,
            gap_fallback_laptime: 90.0,
            grid_back_t: 0.015,
            grid_step_t: 0.006,
            grid_lateral: 1.6,
        }
    }
}

/// SimConstants bundles every tuning table of the simulation core. The
/// struct is immutable after loading and passed by reference into the
/// physics, AI and race components.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SimConstants {
    pub chassis: ChassisConsts,
    pub engine: EngineConsts,
    pub surface: SurfaceConsts,
    pub line: LineConsts,
    pub ai: AiConsts,
    pub collision: CollisionConsts,
    pub race: RaceConsts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_json_sections() {
        let consts: SimConstants = serde_json::from_str("{}").unwrap();
        assert_eq!(consts.race.start_light_count, 5);
        assert_eq!(consts.engine.gear_ratios.len(), 6);

        let consts: SimConstants =
            serde_json::from_str(r#"{"chassis": {"max_speed": 70.0}}"#).unwrap();
        assert_eq!(consts.chassis.max_speed, 70.0);
        assert_eq!(consts.chassis.mass, 1250.0);
    }
}
