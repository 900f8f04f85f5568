//! Nutrition module - daily targets and food portion math
//!
//! Features:
//! - BMR / TDEE / goal-adjusted kcal and macro split
//! - Activity factor from steps, cardio and strength frequency
//! - Household units and per-100 g macro scaling

pub mod activity;
pub mod calculator;
pub mod units;

pub use activity::{ActivityInputs, Cardio};
pub use calculator::{BodyProfile, Goal, NutritionPlan, Sex};
pub use units::{Food, FoodNutrients, Unit};
