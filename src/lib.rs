//! totalgains - training progress KPIs, medal tiers and nutrition targets
//!
//! Sessions come from a coaching backend or the offline set log and are
//! reduced to KPI series, period aggregates and cumulative medals.

pub mod config;
pub mod db;
pub mod kpi;
pub mod medals;
pub mod nutrition;
pub mod progress;
pub mod remote;
pub mod tui;
pub mod workout;

pub use config::Config;
pub use db::Database;
pub use workout::{Exercise, WorkoutSession, WorkoutSet};
