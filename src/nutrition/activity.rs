//! Activity factor (AF) from daily steps, cardio and strength frequency

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub const MIN_FACTOR: f64 = 1.2;
pub const MAX_FACTOR: f64 = 1.9;

/// Self-reported cardio level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Cardio {
    #[default]
    None,
    Minimal,
    Moderate,
    Intense,
    VeryIntense,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ActivityInputs {
    pub avg_daily_steps: u32,
    pub cardio: Cardio,
    pub strength_sessions_per_week: u32,
}

pub fn from_steps(steps: u32) -> f64 {
    match steps {
        s if s < 6_000 => 1.2,
        s if s < 10_000 => 1.375,
        s if s < 13_000 => 1.55,
        s if s < 16_000 => 1.725,
        _ => 1.9,
    }
}

/// Factor implied by cardio alone, `None` when it shouldn't override steps
pub fn from_cardio(cardio: Cardio) -> Option<f64> {
    match cardio {
        Cardio::Moderate => Some(1.55),
        Cardio::Intense => Some(1.725),
        Cardio::VeryIntense => Some(1.9),
        Cardio::None | Cardio::Minimal => None,
    }
}

/// Next factor up the ladder
pub fn bump(factor: f64) -> f64 {
    if factor <= 1.2 {
        1.375
    } else if factor <= 1.375 {
        1.55
    } else if factor <= 1.55 {
        1.725
    } else {
        MAX_FACTOR
    }
}

/// Final factor: the higher of steps and cardio, bumped one tier for
/// 4+ strength sessions with 8000+ steps, clamped to [1.2, 1.9]
pub fn compute(inputs: &ActivityInputs) -> f64 {
    let steps = from_steps(inputs.avg_daily_steps);
    let mut factor = from_cardio(inputs.cardio).map_or(steps, |c| c.max(steps));

    if inputs.strength_sessions_per_week >= 4 && inputs.avg_daily_steps >= 8_000 {
        factor = bump(factor);
    }

    factor.clamp(MIN_FACTOR, MAX_FACTOR)
}
