//! KPI module - progress metrics over workout sessions
//!
//! Features:
//! - Period and muscle/exercise filters
//! - Series per metric (volume, e1RM, intensity, reps, compliance, heavy
//!   sets, PRs, session RPE) grouped by week, date or session
//! - Whole-period aggregates (useful volume, compliance, muscle balance)
//! - Percentage change between first and last point

pub mod change;
pub mod period;
pub mod series;

pub use change::{percentage_change, relative_to_baseline};
pub use period::{ComplianceTotal, MuscleShare, UsefulVolume};
pub use series::{SeriesPoint, series, weekly_series};

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::workout::{Exercise, WorkoutSession};

/// Muscle filter value meaning "every muscle"
pub const ALL_MUSCLES: &str = "TOTAL";

/// Time window relative to "now"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Period {
    #[value(name = "7d")]
    #[serde(rename = "7d")]
    Week,
    #[value(name = "30d")]
    #[serde(rename = "30d")]
    Month,
    #[value(name = "90d")]
    #[serde(rename = "90d")]
    Quarter,
    #[default]
    #[value(name = "all")]
    #[serde(rename = "all")]
    All,
}

impl Period {
    pub fn days(&self) -> Option<i64> {
        match self {
            Period::Week => Some(7),
            Period::Month => Some(30),
            Period::Quarter => Some(90),
            Period::All => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Period::Week => "7 days",
            Period::Month => "30 days",
            Period::Quarter => "90 days",
            Period::All => "All",
        }
    }

    pub fn all() -> &'static [Period] {
        &[Period::Week, Period::Month, Period::Quarter, Period::All]
    }

    /// Earliest date inside the window
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.days().map(|d| now - Duration::days(d))
    }
}

/// How a metric reduces sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// One point per bucket on the chosen axis
    Series,
    Period,
}

/// What one point of a series stands for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    #[default]
    Week,
    Date,
    Session,
}

impl Axis {
    pub fn label(&self) -> &'static str {
        match self {
            Axis::Week => "Week",
            Axis::Date => "Date",
            Axis::Session => "Session",
        }
    }

    pub fn all() -> &'static [Axis] {
        &[Axis::Week, Axis::Date, Axis::Session]
    }
}

/// Metric dimension shown on the dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Volume,
    E1rmMax,
    Intensity,
    TotalReps,
    Compliance,
    HeavySets,
    MuscleBalance,
    PrCount,
    SessionRpe,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Volume => "Volume",
            Metric::E1rmMax => "e1RM max",
            Metric::Intensity => "Intensity",
            Metric::TotalReps => "Reps",
            Metric::Compliance => "Compliance",
            Metric::HeavySets => "Heavy sets",
            Metric::MuscleBalance => "Balance",
            Metric::PrCount => "PRs",
            Metric::SessionRpe => "Session RPE",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Metric::Volume => "📊",
            Metric::E1rmMax => "🎯",
            Metric::Intensity => "💪",
            Metric::TotalReps => "🔁",
            Metric::Compliance => "✅",
            Metric::HeavySets => "🏋️",
            Metric::MuscleBalance => "⚖️",
            Metric::PrCount => "🏆",
            Metric::SessionRpe => "🔋",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Metric::Volume => "Total volume (kg x reps)",
            Metric::E1rmMax => "Best estimated 1RM of any set",
            Metric::Intensity => "Average load per rep",
            Metric::TotalReps => "Total repetitions",
            Metric::Compliance => "Share of sets inside the target rep range",
            Metric::HeavySets => "Share of sets at >= 85% of the exercise's best e1RM",
            Metric::MuscleBalance => "Share of volume per muscle group",
            Metric::PrCount => "Estimated personal records (e1RM)",
            Metric::SessionRpe => "Average session effort (1-5)",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Volume | Metric::E1rmMax | Metric::Intensity => "kg",
            Metric::Compliance | Metric::HeavySets | Metric::MuscleBalance => "%",
            Metric::TotalReps | Metric::PrCount | Metric::SessionRpe => "",
        }
    }

    pub fn aggregation(&self) -> Aggregation {
        match self {
            Metric::MuscleBalance => Aggregation::Period,
            _ => Aggregation::Series,
        }
    }

    /// Human-readable value; fractions are shown as percentages
    pub fn format(&self, value: f64) -> String {
        match self {
            Metric::Volume => format!("{value:.0} kg"),
            Metric::E1rmMax | Metric::Intensity => format!("{value:.1} kg"),
            Metric::TotalReps => format!("{value:.0}"),
            Metric::Compliance | Metric::HeavySets => format!("{:.0}%", value * 100.0),
            Metric::MuscleBalance => format!("{value:.1}%"),
            Metric::PrCount => format!("{value:.0}"),
            Metric::SessionRpe => format!("{value:.1}"),
        }
    }

    /// Whether muscle/exercise filters narrow this metric
    pub fn uses_filters(&self) -> bool {
        !matches!(self, Metric::MuscleBalance | Metric::SessionRpe)
    }

    pub fn all() -> &'static [Metric] {
        &[
            Metric::Volume,
            Metric::E1rmMax,
            Metric::Intensity,
            Metric::TotalReps,
            Metric::Compliance,
            Metric::HeavySets,
            Metric::MuscleBalance,
            Metric::PrCount,
            Metric::SessionRpe,
        ]
    }
}

/// Optional muscle-group and exercise-name restriction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExerciseFilter {
    pub muscle: Option<String>,
    pub exercise: Option<String>,
}

impl ExerciseFilter {
    pub fn new(muscle: Option<String>, exercise: Option<String>) -> Self {
        let blank = |s: &String| s.trim().is_empty();
        Self {
            muscle: muscle.filter(|m| !blank(m) && !m.eq_ignore_ascii_case(ALL_MUSCLES)),
            exercise: exercise.filter(|e| !blank(e)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.muscle.is_none() && self.exercise.is_none()
    }

    pub fn matches(&self, exercise: &Exercise) -> bool {
        let muscle_ok = self
            .muscle
            .as_deref()
            .is_none_or(|m| exercise.muscle_group.eq_ignore_ascii_case(m));
        let name_ok = self
            .exercise
            .as_deref()
            .is_none_or(|n| exercise.name.eq_ignore_ascii_case(n));
        muscle_ok && name_ok
    }

    /// Exercises of a session that pass the filter
    pub fn exercises<'a>(&'a self, session: &'a WorkoutSession) -> impl Iterator<Item = &'a Exercise> + 'a {
        session.exercises.iter().filter(move |e| self.matches(e))
    }
}

/// Sessions on or after the period cutoff
pub fn filter_by_period(sessions: &[WorkoutSession], period: Period, now: DateTime<Utc>) -> Vec<WorkoutSession> {
    match period.cutoff(now) {
        Some(cutoff) => sessions.iter().filter(|s| s.date >= cutoff).cloned().collect(),
        None => sessions.to_vec(),
    }
}

/// Where a session falls on an axis. Keys order chronologically within
/// one axis.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BucketKey {
    /// Week given by the program itself
    ProgramWeek(u32),
    /// Week of year taken from the date, so late December sorts before
    /// early January
    CalendarWeek { year: i32, week: u32 },
    Date(NaiveDate),
    Session { date: NaiveDate, routine: String },
}

impl BucketKey {
    pub fn of(session: &WorkoutSession, axis: Axis) -> Self {
        let date = session.date.date_naive();
        match axis {
            Axis::Week => match session.week {
                Some(week) => BucketKey::ProgramWeek(week),
                None => BucketKey::CalendarWeek {
                    year: date.year(),
                    week: session.week_number(),
                },
            },
            Axis::Date => BucketKey::Date(date),
            Axis::Session => BucketKey::Session {
                date,
                routine: session.routine_name.clone().unwrap_or_default(),
            },
        }
    }

    pub fn week(&self) -> Option<u32> {
        match self {
            BucketKey::ProgramWeek(week) | BucketKey::CalendarWeek { week, .. } => Some(*week),
            _ => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            BucketKey::ProgramWeek(week) => format!("S{week}"),
            BucketKey::CalendarWeek { year, week } => format!("S{week} {year}"),
            BucketKey::Date(date) => date.format("%Y-%m-%d").to_string(),
            BucketKey::Session { date, routine } if routine.is_empty() => date.format("%Y-%m-%d").to_string(),
            BucketKey::Session { date, routine } => format!("{} {routine}", date.format("%Y-%m-%d")),
        }
    }
}

/// Sessions sharing one key
#[derive(Debug, Clone)]
pub struct Bucket<'a> {
    pub key: BucketKey,
    pub sessions: Vec<&'a WorkoutSession>,
}

impl Bucket<'_> {
    /// Date of the earliest session in the bucket
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.sessions.first().map(|s| s.date.date_naive())
    }
}

/// Group sessions on an axis, keys ascending, sessions by date
pub fn group_by(sessions: &[WorkoutSession], axis: Axis) -> Vec<Bucket<'_>> {
    let mut buckets: BTreeMap<BucketKey, Vec<&WorkoutSession>> = BTreeMap::new();
    for session in sessions {
        buckets.entry(BucketKey::of(session, axis)).or_default().push(session);
    }

    buckets
        .into_iter()
        .map(|(key, mut sessions)| {
            sessions.sort_by_key(|s| s.date);
            Bucket { key, sessions }
        })
        .collect()
}

/// Muscle groups with the exercises seen for each, both sorted
pub fn muscle_catalog(sessions: &[WorkoutSession]) -> BTreeMap<String, BTreeSet<String>> {
    let mut catalog: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for exercise in sessions.iter().flat_map(|s| s.exercises.iter()) {
        if exercise.name.trim().is_empty() {
            continue;
        }
        catalog
            .entry(exercise.muscle().to_string())
            .or_default()
            .insert(exercise.name.clone());
    }
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workout::WorkoutSet;
    use crate::workout::tests::{day, session};

    #[test]
    fn test_filter_by_period() {
        let now = day(2025, 6, 30);
        let sessions = vec![
            WorkoutSession::new(now - Duration::days(3), None, vec![]),
            WorkoutSession::new(now - Duration::days(20), None, vec![]),
            WorkoutSession::new(now - Duration::days(60), None, vec![]),
            WorkoutSession::new(now - Duration::days(200), None, vec![]),
        ];
        assert_eq!(filter_by_period(&sessions, Period::Week, now).len(), 1);
        assert_eq!(filter_by_period(&sessions, Period::Month, now).len(), 2);
        assert_eq!(filter_by_period(&sessions, Period::Quarter, now).len(), 3);
        assert_eq!(filter_by_period(&sessions, Period::All, now).len(), 4);
    }

    #[test]
    fn test_group_by_week_sorted() {
        let sessions = vec![session(3, vec![]), session(1, vec![]), session(3, vec![])];
        let groups = group_by(&sessions, Axis::Week);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, BucketKey::ProgramWeek(1));
        assert_eq!(groups[1].key.week(), Some(3));
        assert_eq!(groups[1].sessions.len(), 2);
    }

    #[test]
    fn test_calendar_weeks_cross_new_year() {
        let sessions = vec![
            WorkoutSession::new(day(2025, 1, 8), None, vec![]),
            WorkoutSession::new(day(2024, 12, 20), None, vec![]),
        ];
        let groups = group_by(&sessions, Axis::Week);
        assert_eq!(groups[0].key, BucketKey::CalendarWeek { year: 2024, week: 51 });
        assert_eq!(groups[1].key, BucketKey::CalendarWeek { year: 2025, week: 2 });
        assert_eq!(groups[0].key.label(), "S51 2024");
    }

    #[test]
    fn test_group_by_date_and_session() {
        let mut push = WorkoutSession::new(day(2025, 3, 3), None, vec![]);
        push.routine_name = Some("Push".to_string());
        let mut legs = push.clone();
        legs.routine_name = Some("Legs".to_string());
        let later = WorkoutSession::new(day(2025, 3, 5), None, vec![]);
        let sessions = vec![later, push, legs];

        let by_date = group_by(&sessions, Axis::Date);
        assert_eq!(by_date.len(), 2);
        assert_eq!(by_date[0].sessions.len(), 2);
        assert_eq!(by_date[1].key.label(), "2025-03-05");

        let by_session = group_by(&sessions, Axis::Session);
        let labels: Vec<_> = by_session.iter().map(|b| b.key.label()).collect();
        assert_eq!(labels, vec!["2025-03-03 Legs", "2025-03-03 Push", "2025-03-05"]);
        assert_eq!(by_session[2].first_date(), NaiveDate::from_ymd_opt(2025, 3, 5));
        assert_eq!(by_session[0].key.week(), None);
    }

    #[test]
    fn test_group_by_week_empty() {
        assert!(group_by(&[], Axis::Week).is_empty());
    }

    #[test]
    fn test_filter_total_means_everything() {
        let filter = ExerciseFilter::new(Some("total".to_string()), Some("  ".to_string()));
        assert!(filter.is_empty());

        let bench = Exercise::new("Bench", "CHEST", vec![WorkoutSet::new(5, 80.0)]);
        let squat = Exercise::new("Squat", "LEGS", vec![]);
        assert!(filter.matches(&bench));

        let chest = ExerciseFilter::new(Some("chest".to_string()), None);
        assert!(chest.matches(&bench));
        assert!(!chest.matches(&squat));

        let by_name = ExerciseFilter::new(None, Some("squat".to_string()));
        assert!(by_name.matches(&squat));
        assert!(!by_name.matches(&bench));
    }

    #[test]
    fn test_muscle_catalog() {
        let sessions = vec![session(
            1,
            vec![
                Exercise::new("Fly", "CHEST", vec![]),
                Exercise::new("Bench", "CHEST", vec![]),
                Exercise::new("Plank", "", vec![]),
                Exercise::new("", "LEGS", vec![]),
            ],
        )];
        let catalog = muscle_catalog(&sessions);
        assert_eq!(catalog.len(), 2);
        let chest: Vec<_> = catalog["CHEST"].iter().cloned().collect();
        assert_eq!(chest, vec!["Bench", "Fly"]);
        assert!(catalog["OTHER"].contains("Plank"));
    }

    #[test]
    fn test_metric_metadata() {
        assert_eq!(Metric::MuscleBalance.aggregation(), Aggregation::Period);
        assert_eq!(Metric::all().len(), 9);
        assert_eq!(Metric::all().last(), Some(&Metric::SessionRpe));
        assert!(Metric::E1rmMax.uses_filters());
        assert_eq!(Metric::E1rmMax.format(114.04), "114.0 kg");
        assert_eq!(Metric::TotalReps.format(42.0), "42");
        assert!(Metric::Volume.uses_filters());
        assert!(!Metric::SessionRpe.uses_filters());
        assert_eq!(Metric::Compliance.format(0.75), "75%");
        assert_eq!(Metric::Volume.format(1234.4), "1234 kg");
    }
}
