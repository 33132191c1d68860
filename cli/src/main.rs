use apexsim::core::consts::SimConstants;
use apexsim::core::handle_race::handle_race;
use apexsim::core::race::RacePhase;
use apexsim::post::race_result::RaceResult;
use apexsim::pre::read_sim_pars::{read_sim_constants, read_sim_pars};
use apexsim::pre::scenario::demo_sim_pars;
use apexsim::pre::sim_opts::SimOpts;
use clap::Parser;
use plotters::prelude::*;
use rayon::prelude::*;
use std::collections::HashMap;
use std::thread;
use std::time::Instant;

/// Writes the per-lap times of every car into a PNG chart in output/.
fn export_laptime_plot(result: &RaceResult) -> anyhow::Result<String> {
    let out_dir = std::path::Path::new("output");
    std::fs::create_dir_all(out_dir)?;
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let filename = format!("race_plot_{}.png", ts);
    let out_path = out_dir.join(filename);

    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    let mut max_laps = 0usize;
    for laps in result.laptimes.iter() {
        max_laps = max_laps.max(laps.len());
        for &lt in laps {
            if lt.is_finite() && lt > 0.0 {
                y_min = y_min.min(lt);
                y_max = y_max.max(lt);
            }
        }
    }
    if !y_min.is_finite() || !y_max.is_finite() {
        y_min = 0.0;
        y_max = 1.0;
    }
    let margin = (y_max - y_min).max(1.0) * 0.05;
    y_min -= margin;
    y_max += margin;

    let root = BitMapBackend::new(out_path.to_str().unwrap(), (1280, 720)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Lap times", ("sans-serif", 24).into_font())
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(1u32..(max_laps as u32 + 1), y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Lap")
        .y_desc("s")
        .label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 16))
        .draw()?;

    let palette = Palette99::pick;
    for (i, pair) in result.car_driver_pairs.iter().enumerate() {
        let series: Vec<(u32, f64)> = result.laptimes[i]
            .iter()
            .enumerate()
            .filter(|(_, lt)| lt.is_finite() && **lt > 0.0)
            .map(|(lap, &lt)| (lap as u32 + 1, lt))
            .collect();
        chart
            .draw_series(LineSeries::new(series.into_iter(), palette(i)))?
            .label(format!("{} ({})", pair.car_no, pair.driver_initials))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], palette(i)));
    }

    for ev in &result.events {
        let x = ev.lap.max(1);
        let (color, width) = match ev.kind.as_str() {
            "BarrierHit" => (RED, 2),
            "FastestLap" => (RGBColor(150, 150, 150), 1),
            _ => (BLACK, 1),
        };
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x, y_min), (x, y_max)],
            color.stroke_width(width),
        )))?;
    }

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .label_font(("sans-serif", 16))
        .position(plotters::chart::SeriesLabelPosition::UpperRight)
        .draw()?;

    root.present()?;
    Ok(out_path.to_string_lossy().into_owned())
}

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    // get simulation options from the command line arguments
    let sim_opts: SimOpts = SimOpts::parse();

    // get simulation parameters
    let mut sim_pars = if let Some(parfile_path) = &sim_opts.parfile_path {
        println!("INFO: Reading simulation parameters from {:?}", parfile_path);
        read_sim_pars(parfile_path)?
    } else {
        println!("INFO: No parameter file provided, using the built-in demo scenario");
        demo_sim_pars()
    };
    if let Some(seed) = sim_opts.seed {
        sim_pars.race_pars.seed = Some(seed);
    }

    // get simulation constants
    let sim_consts = if let Some(constants_path) = &sim_opts.constants_path {
        println!("INFO: Reading simulation constants from {:?}", constants_path);
        read_sim_constants(constants_path)?
    } else {
        SimConstants::default()
    };

    // print race details
    println!(
        "INFO: Simulating {} laps of {} with {} cars",
        sim_pars.race_pars.tot_laps,
        sim_pars.track.name,
        sim_pars.race_pars.participants.len()
    );

    // EXECUTION -----------------------------------------------------------------------------------
    if sim_opts.realtime {
        // REAL-TIME CASE - simulation thread streams snapshots to the console
        println!("INFO: Running simulation in real time...");
        let (tx, rx) = flume::unbounded();

        let sim_pars_thread = sim_pars.clone();
        let sim_consts_thread = sim_consts.clone();
        let realtime_factor = sim_opts.realtime_factor;
        let print_events = sim_opts.events;

        let sim_handle = thread::spawn(move || {
            handle_race(
                &sim_pars_thread,
                &sim_consts_thread,
                false,
                Some(&tx),
                realtime_factor,
                print_events,
            )
        });

        let mut last_printed = f64::NEG_INFINITY;
        for snapshot in rx.iter() {
            if let Some(result) = snapshot.final_result {
                result.print_results();
                break;
            }

            if snapshot.phase == RacePhase::Grid {
                continue;
            }
            if snapshot.race_time > last_printed + 2.0 {
                if let Some(leader) = snapshot.standings.first() {
                    println!(
                        "INFO: {:8.1}s  P1 {} ({}) on lap {}",
                        snapshot.race_time, leader.driver_initials, leader.car_no, leader.lap
                    );
                }
                last_printed = snapshot.race_time;
            }
        }

        let race_result = sim_handle
            .join()
            .expect("Simulation thread panicked!")?;
        race_result.write_results_to_file(None)?;
    } else if sim_opts.no_sim_runs <= 1 {
        // HEADLESS CASE - single run at full speed
        println!("INFO: Running simulation without presentation...");
        let t_start = Instant::now();

        let race_result = handle_race(
            &sim_pars,
            &sim_consts,
            sim_opts.debug,
            None,
            1.0,
            sim_opts.events,
        )?;

        println!("INFO: Execution time: {}ms", t_start.elapsed().as_millis());

        race_result.print_results();
        race_result.write_results_to_file(None)?;

        match export_laptime_plot(&race_result) {
            Ok(path) => println!("INFO: Lap time chart written to {}", path),
            Err(e) => eprintln!("WARNING: Could not write lap time chart: {}", e),
        }
    } else {
        // BATCH CASE - independent runs in parallel with per-run seeds
        println!(
            "INFO: Running {} simulation runs in parallel...",
            sim_opts.no_sim_runs
        );
        let t_start = Instant::now();
        let base_seed = sim_pars.race_pars.seed.unwrap_or(0);

        let results: Vec<anyhow::Result<RaceResult>> = (0..sim_opts.no_sim_runs)
            .into_par_iter()
            .map(|run| {
                let mut run_pars = sim_pars.clone();
                run_pars.race_pars.seed = Some(base_seed.wrapping_add(run as u64));
                handle_race(&run_pars, &sim_consts, false, None, 1.0, false)
            })
            .collect();

        let mut wins: HashMap<u32, u32> = HashMap::new();
        let mut initials: HashMap<u32, String> = HashMap::new();
        let mut no_ok_runs = 0u32;
        for result in results {
            let result = result?;
            if let Some(winner) = result.winner() {
                *wins.entry(winner).or_insert(0) += 1;
                if let Some(pair) = result.car_driver_pairs.iter().find(|p| p.car_no == winner) {
                    initials
                        .entry(winner)
                        .or_insert_with(|| pair.driver_initials.to_owned());
                }
            }
            no_ok_runs += 1;
        }

        println!("INFO: Execution time: {}ms", t_start.elapsed().as_millis());
        println!("RESULT: Win summary over {} runs", no_ok_runs);
        let mut win_rows: Vec<(u32, u32)> = wins.into_iter().collect();
        win_rows.sort_by(|a, b| b.1.cmp(&a.1));
        for (car_no, no_wins) in win_rows {
            println!(
                "{:3} ({}): {:4} wins",
                car_no,
                initials.get(&car_no).map(String::as_str).unwrap_or("?"),
                no_wins
            );
        }
    }

    Ok(())
}
