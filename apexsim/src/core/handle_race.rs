use anyhow::Context;
use flume::Sender;
use std::thread::sleep;
use std::time::{Duration, Instant};

use crate::core::car::CarInput;
use crate::core::consts::SimConstants;
use crate::core::race::{Race, RacePhase};
use crate::interfaces::hud_interface::{make_snapshot, RaceSnapshot, MAX_HUD_UPDATE_FREQUENCY};
use crate::post::race_result::RaceResult;
use crate::pre::read_sim_pars::SimPars;

/// Frame step used when no presentation layer paces the loop.
const HEADLESS_FRAME_DELTA: f64 = 1.0 / 60.0;

/// handle_race creates and simulates a race on the basis of the inserted
/// parameters, and returns the results for post-processing. Every slot runs
/// on autopilot; a presentation layer sender switches the loop to real time
/// and streams snapshots.
pub fn handle_race(
    sim_pars: &SimPars,
    sim_consts: &SimConstants,
    print_debug: bool,
    tx: Option<&Sender<RaceSnapshot>>,
    realtime_factor: f64,
    print_events: bool,
) -> anyhow::Result<RaceResult> {
    let track = sim_pars.track.build()?;
    let mut race = Race::new(
        &sim_pars.race_pars,
        track,
        &sim_pars.driver_pars_all,
        &sim_pars.car_pars_all,
        sim_consts.to_owned(),
    );
    race.print_events = print_events;
    race.start();

    let no_input = CarInput::default();
    let sim_realtime = tx.is_some();

    if !sim_realtime {
        let mut t_race_update_print = 0.0;
        let mut last_printed_lap = 0u32;

        while race.phase != RacePhase::Results {
            race.update(&no_input, HEADLESS_FRAME_DELTA);

            let leader_lap = race.standings.first().map(|s| s.lap).unwrap_or(0);
            if print_debug && race.cur_racetime > t_race_update_print + 0.9999 {
                println!(
                    "INFO: Simulating... Current race time is {:.3}s, current lap is {}",
                    race.cur_racetime, leader_lap
                );
                t_race_update_print = race.cur_racetime;
            }
            if print_debug && leader_lap > last_printed_lap {
                println!("INFO: Leader started lap {}", leader_lap + 1);
                last_printed_lap = leader_lap;
            }
        }
    } else {
        let mut t_race_update_print = 0.0;
        let mut t_race_update_hud = f64::NEG_INFINITY;
        let mut warn_clock = Instant::now();

        while race.phase != RacePhase::Results {
            let t_start = Instant::now();
            race.update(&no_input, HEADLESS_FRAME_DELTA);

            if race.cur_racetime > t_race_update_print + 0.9999 {
                let leader_lap = race.standings.first().map(|s| s.lap).unwrap_or(0);
                println!(
                    "INFO: Simulating... Current race time is {:.3}s, current lap is {}",
                    race.cur_racetime, leader_lap
                );
                t_race_update_print = race.cur_racetime;
            }

            if race.cur_racetime > t_race_update_hud + 1.0 / MAX_HUD_UPDATE_FREQUENCY - 0.001 {
                let snapshot = make_snapshot(&race, None)?;
                tx.unwrap()
                    .send(snapshot)
                    .context("Failed to send race snapshot to the presentation layer!")?;
                t_race_update_hud = race.cur_racetime;
            }

            // sleep until the frame is finished in real-time as well
            // (calculation in ms)
            let t_sleep = (HEADLESS_FRAME_DELTA * 1000.0 / realtime_factor) as i64
                - t_start.elapsed().as_millis() as i64;

            if t_sleep > 0 {
                sleep(Duration::from_millis(t_sleep as u64));
            } else if warn_clock.elapsed().as_secs() >= 1 {
                println!("WARNING: Could not keep up with real-time!");
                warn_clock = Instant::now();
            }
        }

        // after the real-time loop finishes, send the final result once
        if let Some(tx) = tx {
            let result = race.get_race_result();
            let final_msg = make_snapshot(&race, Some(result))?;
            tx.send(final_msg)
                .context("Failed to send final race result to the presentation layer!")?;
        }
    }

    Ok(race.get_race_result())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pre::scenario::demo_sim_pars;

    #[test]
    fn demo_race_runs_to_results_headless() {
        let mut pars = demo_sim_pars();
        pars.race_pars.participants.truncate(4);
        pars.race_pars.tot_laps = 2;
        pars.race_pars.seed = Some(7);

        let result =
            handle_race(&pars, &SimConstants::default(), false, None, 1.0, false).unwrap();

        assert_eq!(result.classification.len(), 4);
        let positions: Vec<u32> = result.classification.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4]);
        assert!(result
            .classification
            .windows(2)
            .all(|w| w[0].gap_to_leader <= w[1].gap_to_leader + 1e-9));

        // the winner completed the full distance
        assert!(result.laptimes.iter().any(|laps| laps.len() == 2));
        for laps in result.laptimes.iter() {
            for &lap_time in laps {
                assert!(
                    lap_time > 10.0 && lap_time < 300.0,
                    "implausible lap time {}",
                    lap_time
                );
            }
        }

        assert!(result.fastest_lap.is_some());
        assert!(result.events.iter().any(|e| e.kind == "RaceStart"));
        assert!(result.events.iter().any(|e| e.kind == "Finish"));
    }

    #[test]
    fn identical_seeds_reproduce_the_result() {
        let mut pars = demo_sim_pars();
        pars.race_pars.participants.truncate(3);
        pars.race_pars.tot_laps = 1;
        pars.race_pars.seed = Some(11);

        let consts = SimConstants::default();
        let a = handle_race(&pars, &consts, false, None, 1.0, false).unwrap();
        let b = handle_race(&pars, &consts, false, None, 1.0, false).unwrap();

        let order_a: Vec<u32> = a.classification.iter().map(|c| c.car_no).collect();
        let order_b: Vec<u32> = b.classification.iter().map(|c| c.car_no).collect();
        assert_eq!(order_a, order_b);
        assert_eq!(a.laptimes, b.laptimes);
    }
}
