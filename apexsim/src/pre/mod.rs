pub mod read_sim_pars;
pub mod scenario;
pub mod sim_opts;
