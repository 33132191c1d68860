pub mod ai;
pub mod car;
pub mod collision;
pub mod consts;
pub mod driver;
pub mod handle_race;
pub mod physics;
pub mod race;
pub mod racing_line;
pub mod track;
