use helpers::general::wrap_index;

use crate::core::consts::{ChassisConsts, LineConsts};
use crate::core::track::Track;

/// One target point of the racing line, matching a centerline sample.
#[derive(Debug, Clone)]
pub struct RacingLinePoint {
    pub x: f64,
    pub z: f64,
    /// (m/s) Target speed at this point after smoothing.
    pub target_speed: f64,
    /// Unit forward direction toward the next point.
    pub dir_x: f64,
    pub dir_z: f64,
}

/// The closed racing line: one point per centerline sample, built once per
/// track per session and shared read-only by all AI controllers.
#[derive(Debug, Clone)]
pub struct RacingLine {
    pub points: Vec<RacingLinePoint>,
}

impl RacingLine {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, idx: i64) -> &RacingLinePoint {
        &self.points[wrap_index(idx, self.points.len())]
    }
}

/// Builds the racing line for a track.
///
/// Corner speed limits are known locally at the annotated control points,
/// but a car needs distance to reach them. The backward passes propagate
/// each braking point upstream under the deceleration capacity, the forward
/// passes cap the ramp-up after a corner under the acceleration capacity;
/// together they relax the per-point targets into a profile a car can
/// actually follow.
pub fn build_racing_line(track: &Track, line: &LineConsts, chassis: &ChassisConsts) -> RacingLine {
    let n = track.sample_count();
    let n_ctrl = track.control_points.len();
    let base_speed = chassis.max_speed * line.max_speed_frac;
    let span = line.curvature_span as i64;

    let mut points = Vec::with_capacity(n);

    // pass 1: per-sample target position and raw target speed
    for i in 0..n {
        let sample = &track.samples[i];
        let ctrl_idx = ((i * n_ctrl + n / 2) / n).min(n_ctrl.saturating_sub(1));
        let ctrl = &track.control_points[ctrl_idx];

        let (x, z, target_speed) = match (ctrl.corner, ctrl.corner_speed) {
            (true, Some(corner_speed)) => {
                // shift toward the inside of the corner: the local curvature
                // vector against the lateral normal decides which side that is
                let ahead = &track.samples[wrap_index(i as i64 + span, n)];
                let behind = &track.samples[wrap_index(i as i64 - span, n)];
                let curv_x = ahead.x - behind.x;
                let curv_z = ahead.z - behind.z;

                let cross = curv_x * sample.normal_z - curv_z * sample.normal_x;
                let side = if cross > 0.0 { -1.0 } else { 1.0 };
                let shift = line.corner_shift_frac * sample.half_width;

                (
                    sample.x + side * sample.normal_x * shift,
                    sample.z + side * sample.normal_z * shift,
                    corner_speed,
                )
            }
            _ => (sample.x, sample.z, base_speed),
        };

        points.push(RacingLinePoint {
            x,
            z,
            target_speed,
            dir_x: 0.0,
            dir_z: 0.0,
        });
    }

    // pass 2: forward direction toward the next point
    for i in 0..n {
        let j = wrap_index(i as i64 + 1, n);
        let dx = points[j].x - points[i].x;
        let dz = points[j].z - points[i].z;
        let len = (dx * dx + dz * dz).sqrt().max(1e-9);
        points[i].dir_x = dx / len;
        points[i].dir_z = dz / len;
    }

    let dist = |points: &[RacingLinePoint], i: usize, j: usize| {
        let dx = points[j].x - points[i].x;
        let dz = points[j].z - points[i].z;
        (dx * dx + dz * dz).sqrt()
    };

    // pass 3: braking-zone smoothing, backward around the closed loop
    for _ in 0..line.brake_passes {
        for i in (0..n).rev() {
            let j = wrap_index(i as i64 + 1, n);
            let d = dist(&points, i, j);
            let reachable =
                (points[j].target_speed.powi(2) + 2.0 * line.brake_decel * d).sqrt();
            if points[i].target_speed > reachable {
                points[i].target_speed = reachable;
            }
        }
    }

    // pass 4: acceleration-zone smoothing, forward
    for _ in 0..line.accel_passes {
        for i in 0..n {
            let j = wrap_index(i as i64 + 1, n);
            let d = dist(&points, i, j);
            let reachable =
                (points[i].target_speed.powi(2) + 2.0 * line.accel_cap * d).sqrt();
            if points[j].target_speed > reachable {
                points[j].target_speed = reachable;
            }
        }
    }

    RacingLine { points }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::consts::SimConstants;
    use crate::pre::scenario::{annotated_circuit, circle_track};
    use helpers::general::wrap_index;

    #[test]
    fn line_has_one_point_per_sample() {
        let consts = SimConstants::default();
        let track = circle_track(200.0, 240, 6.0);
        let line = build_racing_line(&track, &consts.line, &consts.chassis);
        assert_eq!(line.len(), track.sample_count());
    }

    #[test]
    fn braking_capacity_bound_holds_for_all_adjacent_pairs() {
        let consts = SimConstants::default();
        let track = annotated_circuit();
        let line = build_racing_line(&track, &consts.line, &consts.chassis);
        let n = line.len();

        for i in 0..n {
            let j = wrap_index(i as i64 + 1, n);
            let dx = line.points[j].x - line.points[i].x;
            let dz = line.points[j].z - line.points[i].z;
            let d = (dx * dx + dz * dz).sqrt();
            let bound =
                (line.points[j].target_speed.powi(2) + 2.0 * consts.line.brake_decel * d).sqrt();
            assert!(
                line.points[i].target_speed <= bound + 1e-9,
                "braking bound violated at sample {}: {} > {}",
                i,
                line.points[i].target_speed,
                bound
            );
        }
    }

    #[test]
    fn corner_samples_are_slower_than_straights() {
        let consts = SimConstants::default();
        let track = annotated_circuit();
        let line = build_racing_line(&track, &consts.line, &consts.chassis);

        let min = line
            .points
            .iter()
            .map(|p| p.target_speed)
            .fold(f64::INFINITY, f64::min);
        let max = line
            .points
            .iter()
            .map(|p| p.target_speed)
            .fold(0.0f64, f64::max);

        assert!(min < max, "annotated corners must pull target speed down");
        assert!(max <= consts.chassis.max_speed * consts.line.max_speed_frac + 1e-9);
    }

    #[test]
    fn directions_are_unit_vectors() {
        let consts = SimConstants::default();
        let track = circle_track(150.0, 120, 6.0);
        let line = build_racing_line(&track, &consts.line, &consts.chassis);
        for p in &line.points {
            let len = (p.dir_x * p.dir_x + p.dir_z * p.dir_z).sqrt();
            assert!((len - 1.0).abs() < 1e-6);
        }
    }
}
