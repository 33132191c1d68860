use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    name = "apexsim",
    about = "A fixed-timestep vehicle racing simulator written in Rust"
)]
pub struct SimOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug printing (only for headless mode)
    #[clap(short, long)]
    pub debug: bool,

    /// Print race events as they happen
    #[clap(short, long)]
    pub events: bool,

    /// Pace the simulation in real time and stream snapshots to the console
    #[clap(long)]
    pub realtime: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Set number of simulation runs (headless batch mode)
    #[clap(short, long, default_value = "1")]
    pub no_sim_runs: u32,

    /// Set path to the simulation parameter file (OPTIONAL: if not set, uses the built-in demo
    /// scenario)
    #[clap(short, long)]
    pub parfile_path: Option<PathBuf>,

    /// Set real-time factor (only relevant with --realtime)
    #[clap(short, long, default_value = "1.0")]
    pub realtime_factor: f64,

    /// Set path to a simulation constants file overriding the built-in defaults
    #[clap(short, long)]
    pub constants_path: Option<PathBuf>,

    /// Override the session RNG seed of the scenario
    #[clap(short, long)]
    pub seed: Option<u64>,
}
