use std::fmt::Write;
use std::io::Write as IoWrite;

use serde::{Deserialize, Serialize};

/// CarDriverPair is used to store car number and driver initials for
/// post-processing the results.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CarDriverPair {
    pub car_no: u32,
    pub driver_initials: String,
}

/// Session-fastest lap and who set it.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FastestLap {
    pub time_s: f64,
    pub car_no: u32,
    pub driver_initials: String,
}

/// One row of the final classification.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClassifiedCar {
    pub position: u32,
    pub car_no: u32,
    pub driver_initials: String,
    pub best_lap: Option<f64>,
    pub finish_time: f64,
    pub gap_to_leader: f64,
}

/// Notable moments of the session, in chronological order.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RaceEvent {
    /// "RaceStart", "FastestLap", "BarrierHit", "Finish", "ForceFinish", ...
    pub kind: String,
    /// Leader lap at the moment of the event.
    pub lap: u32,
    /// (s) Race time of the event.
    pub time_s: f64,
    /// Affected car numbers, empty for session-wide events.
    pub cars: Vec<u32>,
}

/// RaceResult contains all race information that is required for
/// post-processing the results.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RaceResult {
    pub tot_laps: u32,
    pub car_driver_pairs: Vec<CarDriverPair>,
    /// Completed lap times per grid slot, same order as `car_driver_pairs`.
    pub laptimes: Vec<Vec<f64>>,
    pub classification: Vec<ClassifiedCar>,
    pub fastest_lap: Option<FastestLap>,
    pub events: Vec<RaceEvent>,
}

impl RaceResult {
    /// Winner's car number, if the classification is non-empty.
    pub fn winner(&self) -> Option<u32> {
        self.classification.first().map(|c| c.car_no)
    }

    fn format_classification(&self) -> String {
        let mut content = String::new();
        writeln!(&mut content, "RESULT: Final classification").unwrap();
        writeln!(
            &mut content,
            "pos, car, drv, best lap,   gap"
        )
        .unwrap();

        for row in self.classification.iter() {
            let best = match row.best_lap {
                Some(t) => format!("{:8.3}s", t),
                None => "       -".to_owned(),
            };
            writeln!(
                &mut content,
                "{:3}, {:3}, {}, {}, {:6.3}s",
                row.position, row.car_no, row.driver_initials, best, row.gap_to_leader
            )
            .unwrap();
        }

        if let Some(fastest) = &self.fastest_lap {
            writeln!(
                &mut content,
                "RESULT: Fastest lap {:8.3}s by {} ({})",
                fastest.time_s, fastest.driver_initials, fastest.car_no
            )
            .unwrap();
        }

        content
    }

    fn format_lap_times(&self) -> String {
        let mut header = String::from("lap, ");
        for (i, pair) in self.car_driver_pairs.iter().enumerate() {
            if i < self.car_driver_pairs.len() - 1 {
                write!(&mut header, "{:3} ({}), ", pair.car_no, pair.driver_initials).unwrap();
            } else {
                write!(&mut header, "{:3} ({})", pair.car_no, pair.driver_initials).unwrap();
            }
        }

        let max_laps = self.laptimes.iter().map(|l| l.len()).max().unwrap_or(0);
        let mut body = String::new();
        for lap in 0..max_laps {
            write!(&mut body, "{:3}, ", lap + 1).unwrap();
            for (i, laps) in self.laptimes.iter().enumerate() {
                let cell = match laps.get(lap) {
                    Some(t) => format!("{:8.3}s", t),
                    None => "       -".to_owned(),
                };
                if i < self.laptimes.len() - 1 {
                    write!(&mut body, "{}, ", cell).unwrap();
                } else {
                    writeln!(&mut body, "{}", cell).unwrap();
                }
            }
        }

        let mut content = String::new();
        writeln!(&mut content, "RESULT: Lap times").unwrap();
        writeln!(&mut content, "{}", header).unwrap();
        write!(&mut content, "{}", body).unwrap();
        content
    }

    /// print_results prints the final classification and the lap time table
    /// to the console output.
    pub fn print_results(&self) {
        print!("{}", self.format_classification());
        print!("{}", self.format_lap_times());
    }

    /// write_results_to_file writes the classification and lap times to a
    /// text file in output/. Returns the path to the written file.
    pub fn write_results_to_file(
        &self,
        path: Option<&std::path::Path>,
    ) -> anyhow::Result<String> {
        let mut content = self.format_classification();
        content.push_str(&self.format_lap_times());

        let out_dir = std::path::Path::new("output");
        std::fs::create_dir_all(out_dir)?;
        let out_path = if let Some(p) = path {
            p.to_path_buf()
        } else {
            out_dir.join("last_race.txt")
        };
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&out_path)?;
        file.write_all(content.as_bytes())?;
        file.flush()?;

        Ok(out_path.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> RaceResult {
        RaceResult {
            tot_laps: 2,
            car_driver_pairs: vec![
                CarDriverPair {
                    car_no: 7,
                    driver_initials: "VLK".to_owned(),
                },
                CarDriverPair {
                    car_no: 12,
                    driver_initials: "MAR".to_owned(),
                },
            ],
            laptimes: vec![vec![61.2, 60.8], vec![62.0]],
            classification: vec![
                ClassifiedCar {
                    position: 1,
                    car_no: 7,
                    driver_initials: "VLK".to_owned(),
                    best_lap: Some(60.8),
                    finish_time: 122.0,
                    gap_to_leader: 0.0,
                },
                ClassifiedCar {
                    position: 2,
                    car_no: 12,
                    driver_initials: "MAR".to_owned(),
                    best_lap: Some(62.0),
                    finish_time: 124.5,
                    gap_to_leader: 2.5,
                },
            ],
            fastest_lap: Some(FastestLap {
                time_s: 60.8,
                car_no: 7,
                driver_initials: "VLK".to_owned(),
            }),
            events: vec![],
        }
    }

    #[test]
    fn winner_comes_from_the_classification_head() {
        assert_eq!(sample_result().winner(), Some(7));
    }

    #[test]
    fn formatting_handles_uneven_lap_counts() {
        let text = sample_result().format_lap_times();
        assert!(text.contains("RESULT: Lap times"));
        // the second car has no second lap
        assert!(text.lines().last().unwrap().contains("-"));
    }

    #[test]
    fn result_round_trips_through_json() {
        let result = sample_result();
        let raw = serde_json::to_string(&result).unwrap();
        let back: RaceResult = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.classification.len(), 2);
        assert_eq!(back.winner(), Some(7));
    }
}
