//! Medal tiers - cumulative-progress milestones
//!
//! Each table is a fixed, ordered run of `[min, max)` ranges. Consecutive
//! tiers share a boundary and the last one is open-ended, so every
//! non-negative value lands in exactly one tier.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::workout::WorkoutSession;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tier {
    pub min: f64,
    pub max: f64,
    pub label: &'static str,
    pub icon: &'static str,
}

impl Tier {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value < self.max
    }

    /// Threshold of the following tier, none for the last one
    pub fn next(&self) -> Option<f64> {
        self.max.is_finite().then_some(self.max)
    }
}

const fn tier(min: f64, max: f64, label: &'static str, icon: &'static str) -> Tier {
    Tier { min, max, label, icon }
}

/// Total repetitions
pub const REPS_TIERS: &[Tier] = &[
    tier(0.0, 1_000.0, "Rookie", "🌱"),
    tier(1_000.0, 5_000.0, "Bronze", "🥉"),
    tier(5_000.0, 10_000.0, "Silver", "🥈"),
    tier(10_000.0, 50_000.0, "Gold", "🥇"),
    tier(50_000.0, f64::INFINITY, "Rep Legend", "🏛️"),
];

/// Total load moved, summed per set (kg)
pub const WEIGHT_TIERS: &[Tier] = &[
    tier(0.0, 5_000.0, "Rookie", "🌱"),
    tier(5_000.0, 25_000.0, "Bronze", "🥉"),
    tier(25_000.0, 100_000.0, "Silver", "🥈"),
    tier(100_000.0, 250_000.0, "Gold", "🥇"),
    tier(250_000.0, f64::INFINITY, "Iron Titan", "🗿"),
];

/// Total volume, reps x load (kg)
pub const VOLUME_TIERS: &[Tier] = &[
    tier(0.0, 10_000.0, "Rookie", "🌱"),
    tier(10_000.0, 50_000.0, "Bronze", "🥉"),
    tier(50_000.0, 250_000.0, "Silver", "🥈"),
    tier(250_000.0, 1_000_000.0, "Gold", "🥇"),
    tier(1_000_000.0, f64::INFINITY, "Rocket", "🚀"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TierTable {
    Reps,
    Weight,
    Volume,
}

impl TierTable {
    pub fn tiers(&self) -> &'static [Tier] {
        match self {
            TierTable::Reps => REPS_TIERS,
            TierTable::Weight => WEIGHT_TIERS,
            TierTable::Volume => VOLUME_TIERS,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TierTable::Reps => "Reps",
            TierTable::Weight => "Weight",
            TierTable::Volume => "Volume",
        }
    }

    pub fn all() -> &'static [TierTable] {
        &[TierTable::Reps, TierTable::Weight, TierTable::Volume]
    }
}

/// First tier containing `value`; the first tier for anything unmatched
/// (negative, NaN)
pub fn tier_for(value: f64, tiers: &'static [Tier]) -> &'static Tier {
    tiers
        .iter()
        .find(|t| t.contains(value))
        .unwrap_or(&tiers[0])
}

/// How far `value` is from the tier's min to the next threshold, in [0, 1].
/// The last tier is always complete.
pub fn progress_to_next(value: f64, tier: &Tier) -> f64 {
    match tier.next() {
        Some(next) if next > tier.min => ((value - tier.min) / (next - tier.min)).clamp(0.0, 1.0),
        _ => 1.0,
    }
}

/// Cumulative totals the tiers are measured against
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MedalTotals {
    pub reps: f64,
    pub weight: f64,
    pub volume: f64,
}

/// A table's current medal
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Medal {
    pub table: TierTable,
    pub value: f64,
    pub tier: &'static Tier,
    pub progress: f64,
}

impl MedalTotals {
    pub fn from_sessions(sessions: &[WorkoutSession]) -> Self {
        sessions
            .iter()
            .flat_map(|s| s.sets())
            .fold(Self::default(), |acc, set| Self {
                reps: acc.reps + set.reps as f64,
                weight: acc.weight + set.load,
                volume: acc.volume + set.volume(),
            })
    }

    pub fn value(&self, table: TierTable) -> f64 {
        match table {
            TierTable::Reps => self.reps,
            TierTable::Weight => self.weight,
            TierTable::Volume => self.volume,
        }
    }

    pub fn medal(&self, table: TierTable) -> Medal {
        let value = self.value(table);
        let tier = tier_for(value, table.tiers());
        Medal {
            table,
            value,
            tier,
            progress: progress_to_next(value, tier),
        }
    }

    pub fn medals(&self) -> Vec<Medal> {
        TierTable::all().iter().map(|t| self.medal(*t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workout::tests::session;
    use crate::workout::{Exercise, WorkoutSet};
    use proptest::prelude::*;

    #[test]
    fn test_tables_contiguous_and_open_ended() {
        for table in TierTable::all() {
            let tiers = table.tiers();
            assert_eq!(tiers[0].min, 0.0, "{:?} must start at 0", table);
            for pair in tiers.windows(2) {
                assert_eq!(pair[0].max, pair[1].min);
                assert!(pair[0].min < pair[0].max);
                assert_eq!(pair[0].next(), Some(pair[1].min));
            }
            let last = tiers.last().unwrap();
            assert_eq!(last.max, f64::INFINITY);
            assert!(last.next().is_none());
        }
    }

    #[test]
    fn test_boundaries_go_up() {
        assert_eq!(tier_for(999.0, REPS_TIERS).label, "Rookie");
        assert_eq!(tier_for(1_000.0, REPS_TIERS).label, "Bronze");
        assert_eq!(tier_for(1e9, VOLUME_TIERS).label, "Rocket");
    }

    #[test]
    fn test_fallback_to_first() {
        assert_eq!(tier_for(-5.0, WEIGHT_TIERS).label, "Rookie");
        assert_eq!(tier_for(f64::NAN, WEIGHT_TIERS).label, "Rookie");
    }

    #[test]
    fn test_progress_to_next() {
        let bronze = tier_for(3_000.0, REPS_TIERS);
        assert_eq!(progress_to_next(3_000.0, bronze), 0.5);
        let legend = tier_for(60_000.0, REPS_TIERS);
        assert_eq!(progress_to_next(60_000.0, legend), 1.0);
    }

    #[test]
    fn test_totals_from_sessions() {
        let sessions = vec![
            session(1, vec![Exercise::new("Bench", "CHEST", vec![WorkoutSet::new(10, 50.0); 2])]),
            session(2, vec![Exercise::new("Squat", "LEGS", vec![WorkoutSet::new(5, 100.0)])]),
        ];
        let totals = MedalTotals::from_sessions(&sessions);
        assert_eq!(totals.reps, 25.0);
        assert_eq!(totals.weight, 200.0);
        assert_eq!(totals.volume, 1500.0);

        let medals = totals.medals();
        assert_eq!(medals.len(), 3);
        assert!(medals.iter().all(|m| m.tier.label == "Rookie"));
    }

    proptest! {
        #[test]
        fn prop_every_value_in_exactly_one_tier(value in 0.0f64..5e6) {
            for table in TierTable::all() {
                let hits = table.tiers().iter().filter(|t| t.contains(value)).count();
                prop_assert_eq!(hits, 1);
                prop_assert!(tier_for(value, table.tiers()).contains(value));
            }
        }
    }
}
