//! Procedural tracks plus the built-in demo scenario used when no scenario
//! file is supplied on the command line.

use std::f64::consts::PI;

use crate::core::car::CarPars;
use crate::core::driver::{Difficulty, DriverPars};
use crate::core::race::RacePars;
use crate::core::track::{ControlPoint, Track};
use crate::pre::read_sim_pars::{SimPars, TrackPars};

/// Closed circular track with a plain (corner-free) control polygon.
pub fn circle_track(radius: f64, sample_count: usize, half_width: f64) -> Track {
    let mut positions = Vec::with_capacity(sample_count);
    for k in 0..sample_count {
        let a = 2.0 * PI * k as f64 / sample_count as f64;
        positions.push((radius * a.cos(), radius * a.sin(), half_width));
    }

    let control_points = (0..4)
        .map(|k| {
            let a = 2.0 * PI * k as f64 / 4.0;
            ControlPoint {
                x: radius * a.cos(),
                z: radius * a.sin(),
                corner: false,
                corner_speed: None,
                width: None,
            }
        })
        .collect();

    Track::from_positions("circle", &positions, control_points)
}

const STADIUM_STRAIGHT: f64 = 300.0;
const STADIUM_RADIUS: f64 = 80.0;
const STADIUM_HALF_WIDTH: f64 = 7.0;
const STADIUM_SAMPLES: usize = 600;

fn stadium_point(s: f64) -> (f64, f64, f64) {
    let arc = PI * STADIUM_RADIUS;
    let (x, z) = if s < STADIUM_STRAIGHT {
        (-STADIUM_STRAIGHT / 2.0 + s, -STADIUM_RADIUS)
    } else if s < STADIUM_STRAIGHT + arc {
        let a = -PI / 2.0 + (s - STADIUM_STRAIGHT) / STADIUM_RADIUS;
        (
            STADIUM_STRAIGHT / 2.0 + STADIUM_RADIUS * a.cos(),
            STADIUM_RADIUS * a.sin(),
        )
    } else if s < 2.0 * STADIUM_STRAIGHT + arc {
        (
            STADIUM_STRAIGHT / 2.0 - (s - STADIUM_STRAIGHT - arc),
            STADIUM_RADIUS,
        )
    } else {
        let a = PI / 2.0 + (s - 2.0 * STADIUM_STRAIGHT - arc) / STADIUM_RADIUS;
        (
            -STADIUM_STRAIGHT / 2.0 + STADIUM_RADIUS * a.cos(),
            STADIUM_RADIUS * a.sin(),
        )
    };
    (x, z, STADIUM_HALF_WIDTH)
}

fn stadium_control_points() -> Vec<ControlPoint> {
    let perimeter = 2.0 * STADIUM_STRAIGHT + 2.0 * PI * STADIUM_RADIUS;
    let arc = PI * STADIUM_RADIUS;

    (0..12)
        .map(|k| {
            let s = perimeter * k as f64 / 12.0;
            let (x, z, _) = stadium_point(s);
            let on_first_arc = s >= STADIUM_STRAIGHT && s < STADIUM_STRAIGHT + arc;
            let on_second_arc = s >= 2.0 * STADIUM_STRAIGHT + arc;
            ControlPoint {
                x,
                z,
                corner: on_first_arc || on_second_arc,
                corner_speed: if on_first_arc {
                    Some(30.0)
                } else if on_second_arc {
                    Some(26.0)
                } else {
                    None
                },
                width: None,
            }
        })
        .collect()
}

/// Stadium-shaped circuit with annotated corner speeds at both 180-degree
/// turns. The geometry is analytic, so the curvature through the turns is
/// smooth rather than polygonal.
pub fn annotated_circuit() -> Track {
    let perimeter = 2.0 * STADIUM_STRAIGHT + 2.0 * PI * STADIUM_RADIUS;
    let mut positions = Vec::with_capacity(STADIUM_SAMPLES);
    for k in 0..STADIUM_SAMPLES {
        positions.push(stadium_point(perimeter * k as f64 / STADIUM_SAMPLES as f64));
    }

    Track::from_positions("stadium", &positions, stadium_control_points())
}

/// Built-in demo scenario: eight AI cars over five laps of the stadium
/// circuit, all slots on autopilot.
pub fn demo_sim_pars() -> SimPars {
    let driver_pars_all = vec![
        driver("VLK", "Viktor Volkov", 0.92, 0.70, 0.90),
        driver("MAR", "Lena Martins", 0.88, 0.55, 0.92),
        driver("OKA", "Ken Okada", 0.85, 0.60, 0.85),
        driver("DUB", "Max Dubois", 0.82, 0.75, 0.80),
        driver("SAN", "Rosa Santos", 0.80, 0.50, 0.88),
        driver("KOW", "Jan Kowalski", 0.78, 0.65, 0.75),
        driver("LIN", "Mei Lin", 0.75, 0.45, 0.90),
        driver("BER", "Tom Berger", 0.70, 0.80, 0.70),
    ];

    let car_pars_all = vec![
        car(7, "#d40000", 1, "VLK"),
        car(12, "#0044cc", 2, "MAR"),
        car(3, "#ff8800", 3, "OKA"),
        car(21, "#00a550", 4, "DUB"),
        car(9, "#ffd700", 5, "SAN"),
        car(44, "#7f00ff", 6, "KOW"),
        car(5, "#00bfbf", 7, "LIN"),
        car(18, "#e75480", 8, "BER"),
    ];

    SimPars {
        race_pars: RacePars {
            tot_laps: 5,
            difficulty: Difficulty::Medium,
            participants: car_pars_all.iter().map(|c| c.car_no).collect(),
            player_car_no: None,
            aids: Default::default(),
            seed: None,
        },
        track: TrackPars {
            name: "stadium".to_owned(),
            centerline_file: None,
            sample_count: STADIUM_SAMPLES,
            default_half_width: STADIUM_HALF_WIDTH,
            control_points: stadium_control_points(),
        },
        driver_pars_all,
        car_pars_all,
    }
}

fn driver(initials: &str, name: &str, skill: f64, aggression: f64, consistency: f64) -> DriverPars {
    DriverPars {
        initials: initials.to_owned(),
        name: name.to_owned(),
        skill,
        aggression,
        consistency,
    }
}

fn car(car_no: u32, color: &str, p_grid: u32, driver_initials: &str) -> CarPars {
    CarPars {
        car_no,
        color: color.to_owned(),
        p_grid,
        driver_initials: driver_initials.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stadium_loop_is_closed_and_smooth() {
        let track = annotated_circuit();
        let n = track.sample_count();
        assert_eq!(n, STADIUM_SAMPLES);

        // adjacent samples are evenly spaced, wrap pair included
        let spacing = track.sample_dist(0, 1);
        for i in 0..n {
            let d = track.sample_dist(i, (i + 1) % n);
            assert!((d - spacing).abs() < 0.05, "uneven spacing at {}: {}", i, d);
        }
    }

    #[test]
    fn stadium_control_polygon_flags_both_turns() {
        let ctrl = stadium_control_points();
        let corners: Vec<_> = ctrl.iter().filter(|c| c.corner).collect();
        assert_eq!(corners.len(), 4);
        assert!(corners.iter().all(|c| c.corner_speed.is_some()));
    }

    #[test]
    fn demo_roster_is_consistent() {
        let pars = demo_sim_pars();
        assert_eq!(pars.car_pars_all.len(), 8);
        assert_eq!(pars.race_pars.participants.len(), 8);
        for car in &pars.car_pars_all {
            assert!(pars
                .driver_pars_all
                .iter()
                .any(|d| d.initials == car.driver_initials));
        }
    }
}
