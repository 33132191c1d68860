use anyhow::{Context, Result};
use helpers::general::{lin_interp, wrap_index};
use serde::Deserialize;
use std::fs::OpenOptions;
use std::path::Path;

use crate::core::consts::SurfaceConsts;

/// Surface a car currently occupies, classified by signed lateral distance
/// from the nearest centerline sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Asphalt,
    Curb,
    Gravel,
    Grass,
    Barrier,
}

impl Surface {
    /// Lateral grip multiplier relative to asphalt.
    pub fn grip(self) -> f64 {
        match self {
            Surface::Asphalt => 1.0,
            Surface::Curb => 0.85,
            Surface::Grass => 0.45,
            Surface::Gravel | Surface::Barrier => 0.25,
        }
    }

    /// Aerodynamic/terrain drag multiplier relative to asphalt.
    pub fn drag(self) -> f64 {
        match self {
            Surface::Asphalt => 1.0,
            Surface::Curb => 1.1,
            Surface::Grass => 2.5,
            Surface::Gravel | Surface::Barrier => 4.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Surface::Asphalt => "asphalt",
            Surface::Curb => "curb",
            Surface::Gravel => "gravel",
            Surface::Grass => "grass",
            Surface::Barrier => "barrier",
        }
    }
}

/// One vertex of the annotated control polygon the track supplier built the
/// centerline from.
///
/// * `x`, `z` - (m) Position on the ground plane
/// * `corner` - True if this control point is flagged as a corner apex
/// * `corner_speed` - (m/s) Annotated corner speed, required for the racing
/// line when `corner` is set
/// * `width` - (m) Optional half-width override at this point
#[derive(Debug, Deserialize, Clone)]
pub struct ControlPoint {
    pub x: f64,
    pub z: f64,
    #[serde(default)]
    pub corner: bool,
    #[serde(default)]
    pub corner_speed: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
}

/// One centerline sample. Samples are uniformly spaced in parametric
/// arc-length t in [0, 1) and form a closed loop: index i and
/// (i + 1) mod n are adjacent.
#[derive(Debug, Clone)]
pub struct CenterlineSample {
    pub x: f64,
    pub z: f64,
    /// Unit lateral normal (right-hand side of the direction of travel).
    pub normal_x: f64,
    pub normal_z: f64,
    /// (m) Half the track width at this sample.
    pub half_width: f64,
}

/// Row format of a centerline CSV file.
#[derive(Debug, Deserialize, Clone)]
pub struct CsvCenterlineEl {
    pub x_m: f64,
    pub z_m: f64,
    pub half_width_m: f64,
}

/// Static track data: the sampled closed centerline plus the annotated
/// control polygon it was derived from. Immutable after construction.
#[derive(Debug, Clone)]
pub struct Track {
    pub name: String,
    pub samples: Vec<CenterlineSample>,
    pub control_points: Vec<ControlPoint>,
}

impl Track {
    /// Builds a track from raw centerline positions, deriving the lateral
    /// normals from the sample tangents.
    pub fn from_positions(
        name: &str,
        positions: &[(f64, f64, f64)],
        control_points: Vec<ControlPoint>,
    ) -> Track {
        let n = positions.len();
        let mut samples = Vec::with_capacity(n);

        for i in 0..n {
            let (x, z, half_width) = positions[i];
            let (nx, nz, _) = positions[wrap_index(i as i64 + 1, n)];
            let (px, pz, _) = positions[wrap_index(i as i64 - 1, n)];

            // central-difference tangent, rotated -90 deg to get the right-hand normal
            let tx = nx - px;
            let tz = nz - pz;
            let len = (tx * tx + tz * tz).sqrt().max(1e-9);

            samples.push(CenterlineSample {
                x,
                z,
                normal_x: -tz / len,
                normal_z: tx / len,
                half_width,
            });
        }

        Track {
            name: name.to_owned(),
            samples,
            control_points,
        }
    }

    /// Builds the sampled centerline by resampling the closed control
    /// polygon uniformly in arc length. Used when a scenario ships only the
    /// annotated polygon and no centerline file.
    pub fn from_control_points(
        name: &str,
        control_points: Vec<ControlPoint>,
        sample_count: usize,
        default_half_width: f64,
    ) -> Track {
        let m = control_points.len();

        // closed polygon: repeat the first vertex so lin_interp covers the
        // final segment
        let mut cum = vec![0.0];
        let mut xs = vec![control_points[0].x];
        let mut zs = vec![control_points[0].z];
        let mut hws = vec![control_points[0].width.unwrap_or(default_half_width)];

        for i in 1..=m {
            let p = &control_points[i % m];
            let q = &control_points[i - 1];
            let d = ((p.x - q.x).powi(2) + (p.z - q.z).powi(2)).sqrt();
            cum.push(cum[i - 1] + d);
            xs.push(p.x);
            zs.push(p.z);
            hws.push(p.width.unwrap_or(default_half_width));
        }

        let total = cum[m];
        let mut positions = Vec::with_capacity(sample_count);
        for k in 0..sample_count {
            let s = total * k as f64 / sample_count as f64;
            positions.push((
                lin_interp(s, &cum, &xs),
                lin_interp(s, &cum, &zs),
                lin_interp(s, &cum, &hws),
            ));
        }

        Track::from_positions(name, &positions, control_points)
    }

    /// Reads the sampled centerline from a CSV file
    /// (`x_m, z_m, half_width_m` per row).
    pub fn from_csv(name: &str, filepath: &Path, control_points: Vec<ControlPoint>) -> Result<Track> {
        let fh = OpenOptions::new()
            .read(true)
            .open(filepath)
            .context(format!(
                "Failed to open centerline file {}!",
                filepath.to_str().unwrap_or("unknown")
            ))?;

        let mut csv_reader = csv::Reader::from_reader(&fh);
        let mut positions: Vec<(f64, f64, f64)> = vec![];

        for result in csv_reader.deserialize() {
            let el: CsvCenterlineEl = result?;
            positions.push((el.x_m, el.z_m, el.half_width_m));
        }

        Ok(Track::from_positions(name, &positions, control_points))
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Sample index corresponding to a spline-t position.
    pub fn index_for_t(&self, t: f64) -> usize {
        let n = self.samples.len();
        wrap_index((t.rem_euclid(1.0) * n as f64) as i64, n)
    }

    /// Spline-t position of a sample index.
    pub fn t_for_index(&self, idx: usize) -> f64 {
        idx as f64 / self.samples.len() as f64
    }

    /// Distance between two adjacent samples.
    pub fn sample_dist(&self, i: usize, j: usize) -> f64 {
        let a = &self.samples[i];
        let b = &self.samples[j];
        let dx = b.x - a.x;
        let dz = b.z - a.z;
        (dx * dx + dz * dz).sqrt()
    }

    fn dist_sq_to(&self, idx: usize, x: f64, z: f64) -> f64 {
        let s = &self.samples[idx];
        let dx = x - s.x;
        let dz = z - s.z;
        dx * dx + dz * dz
    }

    /// Nearest centerline sample to a world position: coarse scan over every
    /// 5th sample, then a refinement pass over +-5 around the best hit.
    pub fn nearest_sample(&self, x: f64, z: f64) -> usize {
        let n = self.samples.len();
        let mut best = 0;
        let mut best_d = f64::INFINITY;

        let mut i = 0;
        while i < n {
            let d = self.dist_sq_to(i, x, z);
            if d < best_d {
                best_d = d;
                best = i;
            }
            i += 5;
        }

        let coarse = best as i64;
        for off in -5..=5 {
            let idx = wrap_index(coarse + off, n);
            let d = self.dist_sq_to(idx, x, z);
            if d < best_d {
                best_d = d;
                best = idx;
            }
        }

        best
    }

    /// Signed lateral distance from the centerline at a sample, positive
    /// along the sample normal.
    pub fn signed_lateral(&self, idx: usize, x: f64, z: f64) -> f64 {
        let s = &self.samples[idx];
        (x - s.x) * s.normal_x + (z - s.z) * s.normal_z
    }

    /// Classifies the surface at a world position given the nearest sample.
    pub fn classify_surface(&self, idx: usize, x: f64, z: f64, consts: &SurfaceConsts) -> Surface {
        let half_width = self.samples[idx].half_width;
        let lat = self.signed_lateral(idx, x, z).abs();

        if lat <= half_width {
            Surface::Asphalt
        } else if lat <= half_width + consts.curb_width {
            Surface::Curb
        } else if lat <= half_width + consts.curb_width + consts.gravel_width {
            Surface::Gravel
        } else if lat <= half_width + consts.barrier_offset {
            Surface::Grass
        } else {
            Surface::Barrier
        }
    }

    /// Refreshes a car's spline-t by a windowed search of +-20 samples around
    /// its previous position. Anchoring the search avoids a global scan and
    /// keeps the result continuous; a teleporting car can desynchronize here,
    /// which is acceptable at the fixed sub-step size.
    pub fn refresh_spline_t(&self, prev_t: f64, x: f64, z: f64) -> f64 {
        let n = self.samples.len();
        let center = self.index_for_t(prev_t) as i64;

        let mut best = wrap_index(center, n);
        let mut best_d = f64::INFINITY;

        for off in -20..=20 {
            let idx = wrap_index(center + off, n);
            let d = self.dist_sq_to(idx, x, z);
            if d < best_d {
                best_d = d;
                best = idx;
            }
        }

        self.t_for_index(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pre::scenario::circle_track;
    use approx::assert_relative_eq;

    #[test]
    fn circle_normals_point_outward_or_inward_consistently() {
        let track = circle_track(100.0, 120, 6.0);
        // every normal must be a unit vector perpendicular to the tangent
        for i in 0..track.sample_count() {
            let s = &track.samples[i];
            let norm = (s.normal_x * s.normal_x + s.normal_z * s.normal_z).sqrt();
            assert_relative_eq!(norm, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn nearest_sample_matches_exact_position() {
        let track = circle_track(150.0, 90, 6.0);
        for &i in &[0usize, 17, 45, 89] {
            let s = &track.samples[i];
            assert_eq!(track.nearest_sample(s.x, s.z), i);
        }
    }

    #[test]
    fn surface_bands_progress_outward() {
        let track = circle_track(150.0, 90, 6.0);
        let consts = SurfaceConsts::default();
        let idx = 10;
        let s = track.samples[idx].clone();

        let probe = |lat: f64| {
            track.classify_surface(idx, s.x + s.normal_x * lat, s.z + s.normal_z * lat, &consts)
        };

        assert_eq!(probe(0.0), Surface::Asphalt);
        assert_eq!(probe(5.9), Surface::Asphalt);
        assert_eq!(probe(6.5), Surface::Curb);
        assert_eq!(probe(8.0), Surface::Gravel);
        assert_eq!(probe(12.0), Surface::Grass);
        assert_eq!(probe(15.0), Surface::Barrier);
    }

    #[test]
    fn polygon_resampling_spaces_samples_evenly() {
        let square = vec![
            ControlPoint { x: 0.0, z: 0.0, corner: true, corner_speed: Some(20.0), width: None },
            ControlPoint { x: 100.0, z: 0.0, corner: true, corner_speed: Some(20.0), width: None },
            ControlPoint { x: 100.0, z: 100.0, corner: true, corner_speed: Some(20.0), width: None },
            ControlPoint { x: 0.0, z: 100.0, corner: true, corner_speed: Some(20.0), width: None },
        ];
        let track = Track::from_control_points("square", square, 80, 5.0);

        assert_eq!(track.sample_count(), 80);
        // perimeter 400 m over 80 samples: 5 m spacing along each edge
        assert_relative_eq!(track.sample_dist(0, 1), 5.0, epsilon = 1e-9);
        assert_relative_eq!(track.samples[0].half_width, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn windowed_refresh_tracks_forward_motion() {
        let track = circle_track(150.0, 300, 6.0);
        let idx = 30;
        let next = &track.samples[34];
        let t = track.refresh_spline_t(track.t_for_index(idx), next.x, next.z);
        assert_relative_eq!(t, track.t_for_index(34), epsilon = 1e-9);
    }
}
