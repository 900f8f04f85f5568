//! Whole-period aggregates: useful volume, compliance and muscle balance

use std::collections::HashMap;

use serde::Serialize;

use crate::workout::WorkoutSession;

fn percent_1dp(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { (part / whole * 1000.0).round() / 10.0 } else { 0.0 }
}

/// Volume lifted inside the target rep range
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UsefulVolume {
    pub useful: f64,
    pub total: f64,
    pub percentage: f64,
}

pub fn useful_volume(sessions: &[WorkoutSession]) -> UsefulVolume {
    let mut useful = 0.0;
    let mut total = 0.0;
    for set in sessions.iter().flat_map(|s| s.sets()) {
        let volume = set.volume();
        total += volume;
        if volume > 0.0 && set.in_target_range() {
            useful += volume;
        }
    }
    UsefulVolume {
        useful: useful.round(),
        total: total.round(),
        percentage: percent_1dp(useful, total),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComplianceTotal {
    pub in_range: usize,
    pub total: usize,
    pub percentage: f64,
}

pub fn compliance_total(sessions: &[WorkoutSession]) -> ComplianceTotal {
    let (in_range, total) = sessions
        .iter()
        .flat_map(|s| s.sets())
        .fold((0, 0), |(hit, n), set| (hit + set.in_target_range() as usize, n + 1));
    ComplianceTotal {
        in_range,
        total,
        percentage: percent_1dp(in_range as f64, total as f64),
    }
}

/// One muscle group's slice of the total volume
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MuscleShare {
    pub muscle: String,
    pub volume: f64,
    pub share: f64,
}

/// Volume per muscle group, largest share first
pub fn muscle_balance(sessions: &[WorkoutSession]) -> Vec<MuscleShare> {
    let mut volumes: HashMap<&str, f64> = HashMap::new();
    let mut total = 0.0;
    for exercise in sessions.iter().flat_map(|s| s.exercises.iter()) {
        let volume = exercise.volume();
        *volumes.entry(exercise.muscle()).or_insert(0.0) += volume;
        total += volume;
    }

    let mut report: Vec<_> = volumes
        .into_iter()
        .map(|(muscle, volume)| MuscleShare {
            muscle: muscle.to_string(),
            volume: volume.round(),
            share: percent_1dp(volume, total),
        })
        .collect();

    report.sort_by(|a, b| b.share.total_cmp(&a.share).then_with(|| a.muscle.cmp(&b.muscle)));
    report
}

/// Text bar for a share, four cells wide
pub fn share_bar(share: f64) -> &'static str {
    match share / 100.0 {
        r if r >= 0.75 => "[++++]",
        r if r >= 0.50 => "[+++.]",
        r if r >= 0.25 => "[++..]",
        r if r > 0.0 => "[+...]",
        _ => "[....]",
    }
}
