use serde::Deserialize;

/// * `initials` - Driver initials, e.g. VET
/// * `name` - Driver name
/// * `skill` - [0, 1] Pace and braking precision
/// * `aggression` - [0, 1] Willingness to attempt overtakes
/// * `consistency` - [0, 1] Inverse of the steering imprecision
#[derive(Debug, Deserialize, Clone)]
pub struct DriverPars {
    pub initials: String,
    pub name: String,
    #[serde(default = "default_skill")]
    pub skill: f64,
    #[serde(default = "default_aggression")]
    pub aggression: f64,
    #[serde(default = "default_consistency")]
    pub consistency: f64,
}

fn default_skill() -> f64 {
    0.8
}

fn default_aggression() -> f64 {
    0.5
}

fn default_consistency() -> f64 {
    0.9
}

/// AI driver personality, shared read-only between the car roster and its
/// controller.
#[derive(Debug)]
pub struct Driver {
    pub initials: String,
    pub name: String,
    pub skill: f64,
    pub aggression: f64,
    pub consistency: f64,
}

impl Driver {
    pub fn new(driver_pars: &DriverPars) -> Driver {
        Driver {
            initials: driver_pars.initials.to_owned(),
            name: driver_pars.name.to_owned(),
            skill: driver_pars.skill.clamp(0.0, 1.0),
            aggression: driver_pars.aggression.clamp(0.0, 1.0),
            consistency: driver_pars.consistency.clamp(0.0, 1.0),
        }
    }
}

/// Session difficulty level with its AI multipliers.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Medium
    }
}

impl Difficulty {
    /// Multiplier applied to a driver's base skill.
    pub fn skill_mult(self) -> f64 {
        match self {
            Difficulty::Easy => 0.75,
            Difficulty::Medium => 0.9,
            Difficulty::Hard => 1.0,
        }
    }

    /// Multiplier applied to a driver's base aggression.
    pub fn aggression_mult(self) -> f64 {
        match self {
            Difficulty::Easy => 0.7,
            Difficulty::Medium => 0.9,
            Difficulty::Hard => 1.1,
        }
    }

    /// Fraction of the racing-line target speed the AI aims for.
    pub fn top_speed_frac(self) -> f64 {
        match self {
            Difficulty::Easy => 0.82,
            Difficulty::Medium => 0.92,
            Difficulty::Hard => 1.0,
        }
    }
}
