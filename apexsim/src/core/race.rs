use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::collections::HashMap;
use std::rc::Rc;

use helpers::general::{argsort, SortOrder};

use crate::core::ai::AiDriver;
use crate::core::car::{Car, CarInput, CarPars};
use crate::core::collision::{handle_barrier_collision, resolve_car_collisions};
use crate::core::consts::SimConstants;
use crate::core::driver::{Difficulty, Driver, DriverPars};
use crate::core::physics::{place_on_sample, step_car, DrivingAids};
use crate::core::racing_line::{build_racing_line, RacingLine};
use crate::core::track::Track;
use crate::post::race_result::{CarDriverPair, ClassifiedCar, FastestLap, RaceEvent, RaceResult};

/// * `tot_laps` - Race distance in laps
/// * `difficulty` - AI difficulty level
/// * `participants` - Car numbers taking part, any order
/// * `player_car_no` - Car controlled by the presentation layer; None runs
/// every slot on autopilot
/// * `aids` - Driving aids applied to all cars
/// * `seed` - Seed for the session RNG; None draws from entropy
#[derive(Debug, Deserialize, Clone)]
pub struct RacePars {
    pub tot_laps: u32,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub participants: Vec<u32>,
    #[serde(default)]
    pub player_car_no: Option<u32>,
    #[serde(default)]
    pub aids: DrivingAids,
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Race lifecycle. Transitions only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RacePhase {
    Setup,
    Grid,
    Race,
    Finish,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMode {
    Chase,
    Cockpit,
    Overhead,
}

impl CameraMode {
    pub fn next(self) -> CameraMode {
        match self {
            CameraMode::Chase => CameraMode::Cockpit,
            CameraMode::Cockpit => CameraMode::Overhead,
            CameraMode::Overhead => CameraMode::Chase,
        }
    }
}

/// One row of the live standings, recomputed once per frame.
#[derive(Debug, Clone)]
pub struct Standing {
    pub position: u32,
    pub car_idx: usize,
    pub car_no: u32,
    pub driver_initials: String,
    pub lap: u32,
    pub best_lap: Option<f64>,
    /// (s) Estimated gap to the leader; exact once both cars are finished.
    pub gap_to_leader: f64,
    pub finished: bool,
}

/// The race state machine. Owns every car, the AI controllers, the racing
/// line and the event log; the presentation layer drives it with
/// `update(player_input, frame_delta)` and reads the public state back.
#[derive(Debug)]
pub struct Race {
    pub phase: RacePhase,
    pub track: Track,
    pub racing_line: Rc<RacingLine>,
    pub consts: SimConstants,
    pub tot_laps: u32,
    pub difficulty: Difficulty,
    pub aids: DrivingAids,
    /// (s) Race time, zeroed at lights-out.
    pub cur_racetime: f64,
    pub start_lights: u32,
    pub cars: Vec<Car>,
    pub player_idx: Option<usize>,
    pub standings: Vec<Standing>,
    pub fastest_lap: Option<FastestLap>,
    pub camera_mode: CameraMode,
    pub show_hud: bool,
    pub events: Vec<RaceEvent>,
    pub print_events: bool,
    controllers: Vec<Option<AiDriver>>,
    drivers_list: HashMap<String, Rc<Driver>>,
    accumulator: f64,
    grid_timer: f64,
    start_delay: f64,
    finish_timer: f64,
}

impl Race {
    pub fn new(
        race_pars: &RacePars,
        track: Track,
        driver_pars_all: &[DriverPars],
        car_pars_all: &[CarPars],
        consts: SimConstants,
    ) -> Race {
        // create drivers
        let mut drivers_list = HashMap::with_capacity(driver_pars_all.len());
        for driver_pars in driver_pars_all {
            drivers_list.insert(
                driver_pars.initials.to_owned(),
                Rc::new(Driver::new(driver_pars)),
            );
        }

        // create cars
        let no_cars = race_pars.participants.len();
        let mut cars: Vec<Car> = Vec::with_capacity(no_cars);
        for car_no in race_pars.participants.iter() {
            let car_pars_tmp = car_pars_all
                .iter()
                .find(|c| c.car_no == *car_no)
                .expect("Missing car number in car parameters!");

            cars.push(Car::new(
                car_pars_tmp,
                Rc::clone(
                    drivers_list
                        .get(&car_pars_tmp.driver_initials)
                        .expect("Could not find driver initials in drivers list!"),
                ),
            ));
        }

        let player_idx = race_pars.player_car_no.map(|no| {
            cars.iter()
                .position(|c| c.car_no == no)
                .expect("Player car number not found among participants!")
        });

        let mut master_rng = match race_pars.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let start_delay = master_rng
            .gen_range(consts.race.start_delay_min..consts.race.start_delay_max);

        let racing_line = Rc::new(build_racing_line(&track, &consts.line, &consts.chassis));

        // every slot gets a controller, except the player-controlled one; the
        // player slot without a player runs on autopilot
        let mut controllers: Vec<Option<AiDriver>> = Vec::with_capacity(no_cars);
        for (i, car) in cars.iter().enumerate() {
            if Some(i) == player_idx {
                controllers.push(None);
            } else {
                controllers.push(Some(AiDriver::new(
                    Rc::clone(&car.driver),
                    race_pars.difficulty,
                    Rc::clone(&racing_line),
                    StdRng::seed_from_u64(master_rng.gen()),
                )));
            }
        }

        // grid placement: pole furthest along the opening straight, rows
        // staggered left/right behind it
        let r = &consts.race;
        for car in cars.iter_mut() {
            let slot = car.p_grid.max(1);
            let t = r.grid_back_t + (no_cars as u32 - slot) as f64 * r.grid_step_t;
            let lateral = if slot % 2 == 1 {
                r.grid_lateral
            } else {
                -r.grid_lateral
            };
            let idx = track.index_for_t(t);
            place_on_sample(&mut car.state, &track, idx, lateral);
        }

        Race {
            phase: RacePhase::Setup,
            track,
            racing_line,
            tot_laps: race_pars.tot_laps,
            difficulty: race_pars.difficulty,
            aids: race_pars.aids,
            cur_racetime: 0.0,
            start_lights: 0,
            cars,
            player_idx,
            standings: vec![],
            fastest_lap: None,
            camera_mode: CameraMode::Chase,
            show_hud: true,
            events: vec![],
            print_events: false,
            controllers,
            drivers_list,
            accumulator: 0.0,
            grid_timer: 0.0,
            start_delay,
            finish_timer: 0.0,
            consts,
        }
    }

    /// Leaves setup and starts the grid light sequence.
    pub fn start(&mut self) {
        if self.phase == RacePhase::Setup {
            self.phase = RacePhase::Grid;
            self.grid_timer = 0.0;
            self.start_lights = 0;
        }
    }

    /// Advances the race by one frame. `player_input` is ignored while no
    /// car is player-controlled or before lights-out.
    pub fn update(&mut self, player_input: &CarInput, frame_delta: f64) {
        match self.phase {
            RacePhase::Setup | RacePhase::Results => {}
            RacePhase::Grid => self.update_grid(frame_delta),
            RacePhase::Race | RacePhase::Finish => self.update_running(player_input, frame_delta),
        }
    }

    fn update_grid(&mut self, frame_delta: f64) {
        let interval = self.consts.race.start_light_interval;
        let count = self.consts.race.start_light_count;
        self.grid_timer += frame_delta;
        self.start_lights = ((self.grid_timer / interval) as u32).min(count);

        if self.grid_timer >= interval * count as f64 + self.start_delay {
            self.start_lights = count + 1;
            self.phase = RacePhase::Race;
            self.cur_racetime = 0.0;
            self.accumulator = 0.0;
            for car in self.cars.iter_mut() {
                car.state.lap_start_time = 0.0;
            }
            self.record_event("RaceStart", vec![]);
        }
    }

    fn update_running(&mut self, player_input: &CarInput, frame_delta: f64) {
        let frame_delta = frame_delta.min(self.consts.race.max_frame_delta);
        self.accumulator += frame_delta;
        let sub_step = self.consts.race.sub_step;

        while self.accumulator >= sub_step {
            self.sub_step(player_input, sub_step);
            self.accumulator -= sub_step;
        }

        self.update_lap_bookkeeping();
        self.compute_standings();

        match self.phase {
            RacePhase::Race => {
                // the checkered flag falls with the player; on full autopilot
                // it falls with the winner
                let finish_triggered = match self.player_idx {
                    Some(p) => self.cars[p].state.finished,
                    None => self.cars.iter().any(|c| c.state.finished),
                };
                if finish_triggered {
                    self.phase = RacePhase::Finish;
                    self.finish_timer = 0.0;
                }
            }
            RacePhase::Finish => {
                self.finish_timer += frame_delta;
                let all_finished = self.cars.iter().all(|c| c.state.finished);
                if all_finished || self.finish_timer >= self.consts.race.finish_grace {
                    let forced: Vec<u32> = self
                        .cars
                        .iter()
                        .filter(|c| !c.state.finished)
                        .map(|c| c.car_no)
                        .collect();
                    for car in self.cars.iter_mut() {
                        if !car.state.finished {
                            car.state.finished = true;
                            car.state.finish_time = self.cur_racetime;
                        }
                    }
                    if !forced.is_empty() {
                        self.record_event("ForceFinish", forced);
                    }
                    self.compute_standings();
                    self.phase = RacePhase::Results;
                    self.record_event("Results", vec![]);
                }
            }
            _ => {}
        }
    }

    /// One fixed physics sub-step: player car, AI cars, then contact
    /// resolution over the whole grid.
    fn sub_step(&mut self, player_input: &CarInput, dt: f64) {
        self.cur_racetime += dt;
        let mut barrier_hits: Vec<u32> = vec![];

        if let Some(p) = self.player_idx {
            // the player car is frozen once the checkered flag is out
            if !self.cars[p].state.finished && self.phase != RacePhase::Finish {
                step_car(
                    &mut self.cars[p].state,
                    player_input,
                    dt,
                    &self.track,
                    &self.consts,
                    self.aids,
                );
                if handle_barrier_collision(&mut self.cars[p], &self.track, &self.consts.collision)
                {
                    barrier_hits.push(self.cars[p].car_no);
                }
            }
        }

        // collect the AI decisions against the frozen snapshot, then step
        let mut ai_inputs: Vec<(usize, CarInput)> = Vec::with_capacity(self.cars.len());
        for i in 0..self.cars.len() {
            if self.cars[i].state.finished {
                continue;
            }
            if let Some(ctrl) = &mut self.controllers[i] {
                ai_inputs.push((i, ctrl.get_input(&self.cars, i, &self.consts.ai)));
            }
        }

        for (i, input) in ai_inputs {
            step_car(
                &mut self.cars[i].state,
                &input,
                dt,
                &self.track,
                &self.consts,
                self.aids,
            );
            if handle_barrier_collision(&mut self.cars[i], &self.track, &self.consts.collision) {
                barrier_hits.push(self.cars[i].car_no);
            }
        }

        resolve_car_collisions(&mut self.cars, &self.consts.collision);

        for car_no in barrier_hits {
            self.record_event("BarrierHit", vec![car_no]);
        }
    }

    /// Lap-line and sector bookkeeping, once per frame. Detection compares
    /// against the spline-t of the previous frame, so it is independent of
    /// the sub-step granularity.
    fn update_lap_bookkeeping(&mut self) {
        let sector_count = self.consts.race.sector_count;
        let cross_high = self.consts.race.lap_cross_high;
        let cross_low = self.consts.race.lap_cross_low;
        let min_speed = self.consts.race.lap_min_speed;
        let now = self.cur_racetime;
        let tot_laps = self.tot_laps;

        let mut new_events: Vec<(String, Vec<u32>)> = vec![];

        for car in self.cars.iter_mut() {
            if car.state.finished {
                continue;
            }
            let t = car.state.spline_t;

            let sec = ((t * sector_count as f64) as usize).min(sector_count - 1);
            if sec != car.state.cur_sector {
                if sec > car.state.cur_sector {
                    car.state
                        .sector_times
                        .push(now - car.state.lap_start_time);
                }
                car.state.cur_sector = sec;
            }

            if car.state.prev_spline_t > cross_high && t < cross_low && car.state.speed > min_speed
            {
                let lap_time = now - car.state.lap_start_time;
                car.state.lap += 1;
                car.state.lap_times.push(lap_time);
                car.state.lap_start_time = now;
                car.state.sector_times.clear();
                car.state.cur_sector = 0;

                if car.state.best_lap.map_or(true, |best| lap_time < best) {
                    car.state.best_lap = Some(lap_time);
                }
                let session_best = self.fastest_lap.as_ref().map_or(true, |f| lap_time < f.time_s);
                if session_best {
                    self.fastest_lap = Some(FastestLap {
                        time_s: lap_time,
                        car_no: car.car_no,
                        driver_initials: car.driver.initials.to_owned(),
                    });
                    new_events.push(("FastestLap".to_owned(), vec![car.car_no]));
                }

                if car.state.lap >= tot_laps {
                    car.state.finished = true;
                    car.state.finish_time = now;
                    new_events.push(("Finish".to_owned(), vec![car.car_no]));
                }
            }

            car.state.prev_spline_t = t;
        }

        for (kind, cars) in new_events {
            self.record_event(&kind, cars);
        }
    }

    /// Total order over the grid: finished cars by finish time, then running
    /// cars by laps plus track position.
    fn compute_standings(&mut self) {
        let lap_key = self.consts.race.standings_lap_key;
        let keys: Vec<f64> = self
            .cars
            .iter()
            .map(|car| {
                if car.state.finished {
                    1e9 - car.state.finish_time
                } else {
                    car.state.lap as f64 * lap_key + car.state.spline_t
                }
            })
            .collect();
        let order = argsort(&keys, SortOrder::Descending);

        let leader = &self.cars[order[0]];
        let leader_progress = if leader.state.finished {
            self.tot_laps as f64
        } else {
            leader.state.lap as f64 + leader.state.spline_t
        };
        let leader_finish = leader.state.finish_time;
        let ref_laptime = leader
            .state
            .best_lap
            .unwrap_or(self.consts.race.gap_fallback_laptime);

        let cars = &self.cars;
        self.standings = order
            .iter()
            .enumerate()
            .map(|(pos, &idx)| {
                let car = &cars[idx];
                let gap_to_leader = if car.state.finished {
                    car.state.finish_time - leader_finish
                } else {
                    let progress = car.state.lap as f64 + car.state.spline_t;
                    (leader_progress - progress).max(0.0) * ref_laptime
                };
                Standing {
                    position: pos as u32 + 1,
                    car_idx: idx,
                    car_no: car.car_no,
                    driver_initials: car.driver.initials.to_owned(),
                    lap: car.state.lap,
                    best_lap: car.state.best_lap,
                    gap_to_leader,
                    finished: car.state.finished,
                }
            })
            .collect();
    }

    fn leader_lap(&self) -> u32 {
        self.cars.iter().map(|c| c.state.lap).max().unwrap_or(0)
    }

    fn record_event(&mut self, kind: &str, cars: Vec<u32>) {
        let event = RaceEvent {
            kind: kind.to_owned(),
            lap: self.leader_lap(),
            time_s: self.cur_racetime,
            cars,
        };
        if self.print_events {
            println!(
                "EVENT: {} at {:8.3}s (lap {}, cars {:?})",
                event.kind, event.time_s, event.lap, event.cars
            );
        }
        self.events.push(event);
    }

    pub fn cycle_camera(&mut self) {
        self.camera_mode = self.camera_mode.next();
    }

    pub fn toggle_hud(&mut self) {
        self.show_hud = !self.show_hud;
    }

    pub fn get_all_finished(&self) -> bool {
        self.cars.iter().all(|car| car.state.finished)
    }

    pub fn driver(&self, initials: &str) -> Option<&Rc<Driver>> {
        self.drivers_list.get(initials)
    }

    /// Final classification and lap data for post-processing.
    pub fn get_race_result(&self) -> RaceResult {
        let car_driver_pairs = self
            .cars
            .iter()
            .map(|car| CarDriverPair {
                car_no: car.car_no,
                driver_initials: car.driver.initials.to_owned(),
            })
            .collect();

        let classification = self
            .standings
            .iter()
            .map(|s| ClassifiedCar {
                position: s.position,
                car_no: s.car_no,
                driver_initials: s.driver_initials.to_owned(),
                best_lap: s.best_lap,
                finish_time: self.cars[s.car_idx].state.finish_time,
                gap_to_leader: s.gap_to_leader,
            })
            .collect();

        RaceResult {
            tot_laps: self.tot_laps,
            car_driver_pairs,
            laptimes: self.cars.iter().map(|c| c.state.lap_times.clone()).collect(),
            classification,
            fastest_lap: self.fastest_lap.clone(),
            events: self.events.clone(),
        }
    }
}
