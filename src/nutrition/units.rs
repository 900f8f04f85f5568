//! Household units and portion macros
//!
//! Food nutrients are stored per 100 g. A portion is an amount in some unit;
//! the unit's gram factor turns it into grams.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    #[default]
    Grams,
    /// One piece, counted as 1 g
    Unit,
    Tablespoon,
    Teaspoon,
    Cup,
    Handful,
    Slice,
    Scoop,
    /// Unweighed, contributes nothing
    ToTaste,
}

impl Unit {
    /// Grams per one of this unit
    pub fn grams(&self) -> f64 {
        match self {
            Unit::Grams | Unit::Unit => 1.0,
            Unit::Tablespoon => 15.0,
            Unit::Teaspoon => 5.0,
            Unit::Cup => 200.0,
            Unit::Handful | Unit::Slice | Unit::Scoop => 30.0,
            Unit::ToTaste => 0.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Unit::Grams => "g",
            Unit::Unit => "unit",
            Unit::Tablespoon => "tbsp",
            Unit::Teaspoon => "tsp",
            Unit::Cup => "cup",
            Unit::Handful => "handful",
            Unit::Slice => "slice",
            Unit::Scoop => "scoop",
            Unit::ToTaste => "to taste",
        }
    }

    pub fn to_grams(&self, amount: f64) -> f64 {
        amount * self.grams()
    }
}

/// Energy and macros (per 100 g when stored on a [`Food`])
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FoodNutrients {
    #[serde(default)]
    pub kcal: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
}

impl FoodNutrients {
    fn scaled(&self, multiplier: f64) -> Self {
        Self {
            kcal: (self.kcal * multiplier).round(),
            protein: round1(self.protein * multiplier),
            carbs: round1(self.carbs * multiplier),
            fat: round1(self.fat * multiplier),
        }
    }

    pub fn add(&self, other: &FoodNutrients) -> FoodNutrients {
        FoodNutrients {
            kcal: self.kcal + other.kcal,
            protein: round1(self.protein + other.protein),
            carbs: round1(self.carbs + other.carbs),
            fat: round1(self.fat + other.fat),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub id: String,
    pub name: String,
    /// Per 100 g
    pub nutrients: FoodNutrients,
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Macros of a portion: kcal to the unit, macros to one decimal
pub fn portion_macros(per_100g: &FoodNutrients, amount: f64, unit: Unit) -> FoodNutrients {
    per_100g.scaled(unit.to_grams(amount) / 100.0)
}

/// Rebuild per-100 g values from the totals of a saved portion.
/// A portion that weighs nothing is taken as 100 g.
pub fn per_100g_from_portion(totals: &FoodNutrients, amount: f64, unit: Unit) -> FoodNutrients {
    let divisor = unit.to_grams(amount) / 100.0;
    let divisor = if divisor > 0.0 { divisor } else { 1.0 };
    totals.scaled(1.0 / divisor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oats() -> FoodNutrients {
        FoodNutrients { kcal: 389.0, protein: 16.9, carbs: 66.3, fat: 6.9 }
    }

    #[test]
    fn test_grams_portion() {
        let m = portion_macros(&oats(), 40.0, Unit::Grams);
        assert_eq!(m.kcal, 156.0);
        assert_eq!(m.protein, 6.8);
        assert_eq!(m.carbs, 26.5);
        assert_eq!(m.fat, 2.8);
    }

    #[test]
    fn test_household_units() {
        assert_eq!(Unit::Tablespoon.to_grams(2.0), 30.0);
        let cup = portion_macros(&oats(), 1.0, Unit::Cup);
        assert_eq!(cup.kcal, 778.0);
        let free = portion_macros(&oats(), 3.0, Unit::ToTaste);
        assert_eq!(free, FoodNutrients::default());
    }

    #[test]
    fn test_piece_counts_as_one_gram() {
        assert_eq!(Unit::Unit.to_grams(3.0), 3.0);
        let pieces = portion_macros(&oats(), 100.0, Unit::Unit);
        assert_eq!(pieces, portion_macros(&oats(), 100.0, Unit::Grams));
    }

    #[test]
    fn test_per_100g_reconstruction() {
        let totals = FoodNutrients { kcal: 195.0, protein: 8.5, carbs: 33.0, fat: 3.5 };
        let base = per_100g_from_portion(&totals, 50.0, Unit::Grams);
        assert_eq!(base.kcal, 390.0);
        assert_eq!(base.protein, 17.0);
        assert_eq!(base.carbs, 66.0);
    }

    #[test]
    fn test_per_100g_zero_weight() {
        let totals = FoodNutrients { kcal: 10.0, ..Default::default() };
        assert_eq!(per_100g_from_portion(&totals, 1.0, Unit::ToTaste).kcal, 10.0);
    }
}
