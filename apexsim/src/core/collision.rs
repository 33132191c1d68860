use helpers::general::wrap_angle;

use crate::core::car::Car;
use crate::core::consts::CollisionConsts;
use crate::core::track::{Surface, Track};

/// Pairwise circle-circle contact resolution between all cars.
///
/// Overlapping pairs are pushed apart half-and-half along the separation
/// normal; a fraction of the speed difference moves from the faster to the
/// slower car with some loss on the receiving side, both speeds take a
/// uniform contact-friction cut, and headings are nudged apart. Contacts
/// closing faster than the damage threshold damage both cars.
pub fn resolve_car_collisions(cars: &mut [Car], consts: &CollisionConsts) {
    let min_dist = 2.0 * consts.radius;

    for i in 0..cars.len() {
        for j in (i + 1)..cars.len() {
            let dx = cars[j].state.pos_x - cars[i].state.pos_x;
            let dz = cars[j].state.pos_z - cars[i].state.pos_z;
            let dist = (dx * dx + dz * dz).sqrt();

            if dist >= min_dist {
                continue;
            }

            // degenerate exact overlap: separate along +X
            let (nx, nz) = if dist > 1e-9 {
                (dx / dist, dz / dist)
            } else {
                (1.0, 0.0)
            };

            let overlap = min_dist - dist;
            let push = overlap * 0.5;
            cars[i].state.pos_x -= nx * push;
            cars[i].state.pos_z -= nz * push;
            cars[j].state.pos_x += nx * push;
            cars[j].state.pos_z += nz * push;

            let speed_i = cars[i].state.speed;
            let speed_j = cars[j].state.speed;
            let closing = (speed_i - speed_j).abs();
            let transfer = closing * consts.speed_transfer;

            let (fast, slow) = if speed_i >= speed_j { (i, j) } else { (j, i) };
            cars[fast].state.speed = (cars[fast].state.speed - transfer).max(0.0);
            cars[slow].state.speed += transfer * consts.restitution;

            cars[i].state.speed *= consts.contact_friction;
            cars[j].state.speed *= consts.contact_friction;

            // keep the bodies from visually overlapping next step
            cars[i].state.heading =
                wrap_angle(cars[i].state.heading - consts.heading_nudge);
            cars[j].state.heading =
                wrap_angle(cars[j].state.heading + consts.heading_nudge);

            if closing > consts.damage_speed_threshold {
                let amount = (closing - consts.damage_speed_threshold) * consts.damage_gain;
                cars[i].state.add_damage(amount);
                cars[j].state.add_damage(amount);
            }
        }
    }
}

/// Barrier-bounce recovery for one car. If the detected surface is the
/// barrier band, the car is pushed back toward the track center along the
/// local normal, its speed is cut sharply and it takes a fixed damage hit.
/// Returns true if a barrier contact occurred.
pub fn handle_barrier_collision(car: &mut Car, track: &Track, consts: &CollisionConsts) -> bool {
    if car.state.surface != Surface::Barrier {
        return false;
    }

    let idx = track.nearest_sample(car.state.pos_x, car.state.pos_z);
    let lat = track.signed_lateral(idx, car.state.pos_x, car.state.pos_z);
    let side = lat.signum();
    let sample = &track.samples[idx];

    car.state.pos_x -= side * sample.normal_x * consts.barrier_pushback;
    car.state.pos_z -= side * sample.normal_z * consts.barrier_pushback;
    car.state.speed *= consts.barrier_speed_cut;
    car.state.add_damage(consts.barrier_damage);

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::car::CarPars;
    use crate::core::consts::SurfaceConsts;
    use crate::core::driver::{Driver, DriverPars};
    use crate::pre::scenario::circle_track;
    use std::rc::Rc;

    fn test_car(pos_x: f64, pos_z: f64, speed: f64) -> Car {
        let driver = Rc::new(Driver::new(&DriverPars {
            initials: "TST".to_owned(),
            name: "Test Driver".to_owned(),
            skill: 0.8,
            aggression: 0.5,
            consistency: 0.9,
        }));
        let mut car = Car::new(
            &CarPars {
                car_no: 1,
                color: "#ff0000".to_owned(),
                p_grid: 1,
                driver_initials: "TST".to_owned(),
            },
            driver,
        );
        car.state.pos_x = pos_x;
        car.state.pos_z = pos_z;
        car.state.speed = speed;
        car
    }

    #[test]
    fn head_on_overlap_is_separated_symmetrically() {
        let consts = CollisionConsts::default();
        // stationary car and an approaching car inside the contact distance
        let mut cars = vec![test_car(0.0, 0.0, 0.0), test_car(2.0, 0.0, 15.0)];

        resolve_car_collisions(&mut cars, &consts);

        let dx = cars[1].state.pos_x - cars[0].state.pos_x;
        let dz = cars[1].state.pos_z - cars[0].state.pos_z;
        let dist = (dx * dx + dz * dz).sqrt();
        assert!(
            dist >= 2.0 * consts.radius - 1e-9,
            "separation not restored: {}",
            dist
        );
        // half the correction on each side
        assert!((cars[0].state.pos_x + cars[1].state.pos_x - 2.0).abs() < 1e-9);
    }

    #[test]
    fn speed_transfer_loses_energy() {
        let consts = CollisionConsts::default();
        let mut cars = vec![test_car(0.0, 0.0, 5.0), test_car(3.0, 0.0, 25.0)];
        let sum_before = cars[0].state.speed + cars[1].state.speed;

        resolve_car_collisions(&mut cars, &consts);

        let sum_after = cars[0].state.speed + cars[1].state.speed;
        assert!(sum_after < sum_before);
        // transfer goes faster -> slower
        assert!(cars[0].state.speed > 5.0 * consts.contact_friction - 1e-9);
        assert!(cars[1].state.speed < 25.0);
    }

    #[test]
    fn hard_contact_damages_both_cars() {
        let consts = CollisionConsts::default();
        let mut cars = vec![test_car(0.0, 0.0, 0.0), test_car(2.0, 0.0, 20.0)];

        resolve_car_collisions(&mut cars, &consts);

        assert!(cars[0].state.damage > 0.0);
        assert!(cars[1].state.damage > 0.0);
    }

    #[test]
    fn gentle_contact_leaves_no_damage() {
        let consts = CollisionConsts::default();
        let mut cars = vec![test_car(0.0, 0.0, 10.0), test_car(2.0, 0.0, 12.0)];

        resolve_car_collisions(&mut cars, &consts);

        assert_eq!(cars[0].state.damage, 0.0);
        assert_eq!(cars[1].state.damage, 0.0);
    }

    #[test]
    fn barrier_contact_recovers_toward_track() {
        let coll = CollisionConsts::default();
        let surf = SurfaceConsts::default();
        let track = circle_track(150.0, 180, 6.0);

        let mut car = test_car(0.0, 0.0, 30.0);
        let idx = 20;
        let s = track.samples[idx].clone();
        // place beyond the barrier offset
        car.state.pos_x = s.x + s.normal_x * (6.0 + surf.barrier_offset + 0.5);
        car.state.pos_z = s.z + s.normal_z * (6.0 + surf.barrier_offset + 0.5);
        car.state.surface = track.classify_surface(
            track.nearest_sample(car.state.pos_x, car.state.pos_z),
            car.state.pos_x,
            car.state.pos_z,
            &surf,
        );
        assert_eq!(car.state.surface, crate::core::track::Surface::Barrier);

        let before = track
            .signed_lateral(idx, car.state.pos_x, car.state.pos_z)
            .abs();
        assert!(handle_barrier_collision(&mut car, &track, &coll));
        let after = track
            .signed_lateral(idx, car.state.pos_x, car.state.pos_z)
            .abs();

        assert!(after < before);
        assert!((car.state.speed - 30.0 * coll.barrier_speed_cut).abs() < 1e-9);
        assert!(car.state.damage > 0.0);
    }

    #[test]
    fn on_track_car_reports_no_barrier_event() {
        let coll = CollisionConsts::default();
        let track = circle_track(150.0, 180, 6.0);
        let mut car = test_car(0.0, -150.0, 20.0);
        car.state.surface = crate::core::track::Surface::Asphalt;
        assert!(!handle_barrier_collision(&mut car, &track, &coll));
    }
}
