//! Series aggregation: one scalar per bucket (week, date or session) and metric

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::{Axis, Bucket, ExerciseFilter, Metric, group_by};
use crate::workout::{Exercise, WorkoutSession, WorkoutSet};

/// Load at or above this share of the best e1RM counts as heavy
pub const HEAVY_SET_RATIO: f64 = 0.85;

/// A new best e1RM must beat the previous one by more than this factor
pub const PR_MARGIN: f64 = 1.005;

/// One point of a series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week: Option<u32>,
    /// Earliest session date in the bucket
    pub date: Option<NaiveDate>,
    pub value: f64,
    /// Sets (or sessions, for RPE) that contributed
    pub samples: usize,
    /// Exercises that set a PR in this bucket
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exercises: Vec<String>,
}

impl SeriesPoint {
    fn new(bucket: &Bucket<'_>, value: f64, samples: usize) -> Self {
        Self {
            label: bucket.key.label(),
            week: bucket.key.week(),
            date: bucket.first_date(),
            value,
            samples,
            exercises: Vec::new(),
        }
    }
}

fn exercises<'b>(bucket: &'b Bucket<'_>, filter: &'b ExerciseFilter) -> impl Iterator<Item = &'b Exercise> + 'b {
    bucket.sessions.iter().flat_map(move |s| filter.exercises(s))
}

fn sets<'b>(bucket: &'b Bucket<'_>, filter: &'b ExerciseFilter) -> impl Iterator<Item = &'b WorkoutSet> + 'b {
    exercises(bucket, filter).flat_map(|e| e.sets.iter())
}

/// Series for a metric on an axis. Period metrics (muscle balance) have no
/// series form and give an empty one.
pub fn series(sessions: &[WorkoutSession], metric: Metric, filter: &ExerciseFilter, axis: Axis) -> Vec<SeriesPoint> {
    let buckets = group_by(sessions, axis);
    match metric {
        Metric::Volume => volume(&buckets, filter),
        Metric::E1rmMax => e1rm_max(&buckets, filter),
        Metric::Intensity => intensity(&buckets, filter),
        Metric::TotalReps => total_reps(&buckets, filter),
        Metric::Compliance => compliance(&buckets, filter),
        Metric::HeavySets => heavy_sets(&buckets, filter),
        Metric::PrCount => pr_count(&buckets, filter),
        Metric::SessionRpe => session_rpe(&buckets),
        Metric::MuscleBalance => Vec::new(),
    }
}

pub fn weekly_series(sessions: &[WorkoutSession], metric: Metric, filter: &ExerciseFilter) -> Vec<SeriesPoint> {
    series(sessions, metric, filter, Axis::Week)
}

/// Σ reps x load
pub fn volume(buckets: &[Bucket<'_>], filter: &ExerciseFilter) -> Vec<SeriesPoint> {
    buckets
        .iter()
        .map(|bucket| {
            let (volume, samples) = sets(bucket, filter).fold((0.0, 0), |(v, n), set| (v + set.volume(), n + 1));
            SeriesPoint::new(bucket, volume, samples)
        })
        .collect()
}

/// Best single-set e1RM
pub fn e1rm_max(buckets: &[Bucket<'_>], filter: &ExerciseFilter) -> Vec<SeriesPoint> {
    buckets
        .iter()
        .map(|bucket| {
            let (best, samples) = sets(bucket, filter).fold((0.0f64, 0), |(b, n), set| (b.max(set.e1rm()), n + 1));
            SeriesPoint::new(bucket, best, samples)
        })
        .collect()
}

/// Σ (load x reps) / Σ reps
pub fn intensity(buckets: &[Bucket<'_>], filter: &ExerciseFilter) -> Vec<SeriesPoint> {
    buckets
        .iter()
        .map(|bucket| {
            let mut volume = 0.0;
            let mut reps = 0u64;
            let mut samples = 0;
            for set in sets(bucket, filter) {
                volume += set.volume();
                reps += set.reps as u64;
                samples += 1;
            }
            let avg = if reps > 0 { volume / reps as f64 } else { 0.0 };
            SeriesPoint::new(bucket, avg, samples)
        })
        .collect()
}

/// Σ reps
pub fn total_reps(buckets: &[Bucket<'_>], filter: &ExerciseFilter) -> Vec<SeriesPoint> {
    buckets
        .iter()
        .map(|bucket| {
            let (reps, samples) = sets(bucket, filter).fold((0u64, 0), |(r, n), set| (r + set.reps as u64, n + 1));
            SeriesPoint::new(bucket, reps as f64, samples)
        })
        .collect()
}

/// Fraction of sets inside their target rep range, in [0, 1]
pub fn compliance(buckets: &[Bucket<'_>], filter: &ExerciseFilter) -> Vec<SeriesPoint> {
    buckets
        .iter()
        .map(|bucket| {
            let (in_range, total) = sets(bucket, filter)
                .fold((0usize, 0usize), |(hit, n), set| (hit + set.in_target_range() as usize, n + 1));
            let fraction = if total > 0 { in_range as f64 / total as f64 } else { 0.0 };
            SeriesPoint::new(bucket, fraction, total)
        })
        .collect()
}

/// Fraction of loaded sets at or above 85% of the exercise's best e1RM over
/// the whole input, in [0, 1]
pub fn heavy_sets(buckets: &[Bucket<'_>], filter: &ExerciseFilter) -> Vec<SeriesPoint> {
    let mut best_e1rm: HashMap<&str, f64> = HashMap::new();
    for exercise in buckets.iter().flat_map(|b| exercises(b, filter)) {
        let best = best_e1rm.entry(exercise.name.as_str()).or_insert(0.0);
        *best = best.max(exercise.best_e1rm());
    }

    buckets
        .iter()
        .map(|bucket| {
            let mut heavy = 0usize;
            let mut loaded = 0usize;
            for exercise in exercises(bucket, filter) {
                let threshold = best_e1rm.get(exercise.name.as_str()).copied().unwrap_or(0.0) * HEAVY_SET_RATIO;
                for set in exercise.sets.iter().filter(|s| s.load > 0.0) {
                    loaded += 1;
                    if threshold > 0.0 && set.load >= threshold {
                        heavy += 1;
                    }
                }
            }
            let fraction = if loaded > 0 { heavy as f64 / loaded as f64 } else { 0.0 };
            SeriesPoint::new(bucket, fraction, loaded)
        })
        .collect()
}

/// Count of exercises whose session-best e1RM beats the running best by
/// more than 0.5%. The first time an exercise shows up it is a PR.
pub fn pr_count(buckets: &[Bucket<'_>], filter: &ExerciseFilter) -> Vec<SeriesPoint> {
    let mut history: HashMap<String, f64> = HashMap::new();

    buckets
        .iter()
        .map(|bucket| {
            let mut point = SeriesPoint::new(bucket, 0.0, 0);
            for exercise in exercises(bucket, filter) {
                let best = exercise.best_e1rm();
                if best <= 0.0 {
                    continue;
                }
                point.samples += 1;
                let previous = history.get(&exercise.name).copied().unwrap_or(0.0);
                if best > previous * PR_MARGIN {
                    point.exercises.push(exercise.name.clone());
                }
                if best > previous {
                    history.insert(exercise.name.clone(), best);
                }
            }
            point.value = point.exercises.len() as f64;
            point
        })
        .collect()
}

/// Mean session RPE of the sessions that reported one (0 when none did)
pub fn session_rpe(buckets: &[Bucket<'_>]) -> Vec<SeriesPoint> {
    buckets
        .iter()
        .map(|bucket| {
            let rpes: Vec<f64> = bucket.sessions.iter().filter_map(|s| s.session_rpe).map(f64::from).collect();
            let mean = if rpes.is_empty() { 0.0 } else { rpes.iter().sum::<f64>() / rpes.len() as f64 };
            SeriesPoint::new(bucket, mean, rpes.len())
        })
        .collect()
}
