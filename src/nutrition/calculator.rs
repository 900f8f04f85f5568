//! Daily nutrition targets
//!
//! - BMR: Mifflin-St Jeor
//! - TDEE: BMR x activity factor
//! - kcal: +250 bulk, 0 maintain, -250/-350 cut (training/rest day)
//! - Macros: protein per kg and fat share by sex and goal, carbs fill the rest

use serde::{Deserialize, Serialize};

/// Activity factor used when none is given
pub const DEFAULT_ACTIVITY_FACTOR: f64 = 1.55;

/// Hours assumed for a training day when estimating water
const TRAINING_DAY_HOURS: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Free-text parse; anything not recognisably male is treated as female
    pub fn parse(raw: &str) -> Self {
        let s = raw.trim().to_lowercase();
        if s.contains("hombre") || s.contains("masculino") || s == "male" || s == "m" {
            Sex::Male
        } else {
            Sex::Female
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    /// Caloric surplus
    Bulk,
    /// No adjustment
    Maintain,
    /// Caloric deficit
    Cut,
}

impl Goal {
    /// Keyword parse (English and Spanish); unknown text means cut
    pub fn parse(raw: &str) -> Self {
        let s = raw.trim().to_lowercase();
        let any = |keys: &[&str]| keys.iter().any(|k| s.contains(k));
        if any(&["volumen", "masa", "ganar", "bulk", "gain"]) {
            Goal::Bulk
        } else if any(&["mantener", "recomp", "maint"]) {
            Goal::Maintain
        } else {
            Goal::Cut
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Goal::Bulk => "Bulk",
            Goal::Maintain => "Maintenance",
            Goal::Cut => "Cut",
        }
    }

    /// kcal offset from TDEE
    pub fn kcal_offset(&self, rest_day: bool) -> f64 {
        match self {
            Goal::Bulk => 250.0,
            Goal::Maintain => 0.0,
            Goal::Cut if rest_day => -350.0,
            Goal::Cut => -250.0,
        }
    }
}

/// Body data needed for the calculations. Height may be in cm or metres.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BodyProfile {
    pub age: f64,
    pub weight_kg: f64,
    pub height: f64,
    pub sex: Sex,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
struct MacroPreset {
    protein_per_kg: f64,
    fat_share: f64,
}

fn preset(sex: Sex, goal: Goal) -> MacroPreset {
    // Maintenance uses the more generous bulk preset
    match (sex, goal) {
        (Sex::Male, Goal::Bulk | Goal::Maintain) => MacroPreset { protein_per_kg: 2.0, fat_share: 0.25 },
        (Sex::Female, Goal::Bulk | Goal::Maintain) => MacroPreset { protein_per_kg: 1.8, fat_share: 0.30 },
        (Sex::Male, Goal::Cut) => MacroPreset { protein_per_kg: 2.4, fat_share: 0.25 },
        (Sex::Female, Goal::Cut) => MacroPreset { protein_per_kg: 2.2, fat_share: 0.30 },
    }
}

/// Minimum fat in g per kg of bodyweight
fn min_fat_per_kg(sex: Sex) -> f64 {
    match sex {
        Sex::Male => 0.6,
        Sex::Female => 0.7,
    }
}

/// Macronutrient split for a kcal target
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Macros {
    pub protein_g: f64,
    pub fat_g: f64,
    pub carbs_g: f64,
    pub protein_kcal: f64,
    pub fat_kcal: f64,
    pub carbs_kcal: f64,
    pub protein_per_kg: f64,
    /// Fat share of kcal, in percent
    pub fat_percent: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Water {
    pub ml: f64,
    pub base_ml: f64,
    pub extra_ml: f64,
}

impl Water {
    pub fn liters(&self) -> f64 {
        (self.ml / 100.0).round() / 10.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepsRange {
    pub min: u32,
    pub max: u32,
}

/// Targets for one kind of day
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DayTargets {
    pub kcal: f64,
    pub macros: Macros,
    pub water: Water,
}

/// Complete plan for training and rest days
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutritionPlan {
    pub bmr: f64,
    pub tdee: f64,
    pub activity_factor: f64,
    pub goal: Goal,
    pub training: DayTargets,
    pub rest: DayTargets,
    pub steps: StepsRange,
    pub kcal_difference: f64,
    pub kcal_difference_rest: f64,
}

/// Basal metabolic rate in kcal, rounded. Missing inputs give 0.
pub fn bmr(profile: &BodyProfile) -> f64 {
    let BodyProfile { age, weight_kg, height, sex } = *profile;
    if weight_kg <= 0.0 || height <= 0.0 || age <= 0.0 {
        return 0.0;
    }
    // Nobody is under 3 cm tall, so small values are metres
    let height_cm = if height < 3.0 { height * 100.0 } else { height };
    let sex_term = match sex {
        Sex::Male => 5.0,
        Sex::Female => -161.0,
    };
    (10.0 * weight_kg + 6.25 * height_cm - 5.0 * age + sex_term).round()
}

pub fn tdee(bmr: f64, activity_factor: f64) -> f64 {
    (bmr * activity_factor).round()
}

pub fn target_kcal(tdee: f64, goal: Goal, rest_day: bool) -> f64 {
    tdee + goal.kcal_offset(rest_day)
}

pub fn macros(target_kcal: f64, weight_kg: f64, sex: Sex, goal: Goal) -> Macros {
    if target_kcal <= 0.0 || weight_kg <= 0.0 {
        return Macros::default();
    }
    let preset = preset(sex, goal);

    let protein_g = (weight_kg * preset.protein_per_kg).round();
    let protein_kcal = protein_g * 4.0;

    let mut fat_kcal = (target_kcal * preset.fat_share).round();
    let mut fat_g = (fat_kcal / 9.0).round();

    let min_fat = (weight_kg * min_fat_per_kg(sex)).round();
    if fat_g < min_fat {
        fat_g = min_fat;
        fat_kcal = fat_g * 9.0;
    }

    let carbs_kcal = target_kcal - protein_kcal - fat_kcal;
    Macros {
        protein_g,
        fat_g,
        carbs_g: (carbs_kcal / 4.0).round().max(0.0),
        protein_kcal,
        fat_kcal,
        carbs_kcal: carbs_kcal.max(0.0),
        protein_per_kg: preset.protein_per_kg,
        fat_percent: (preset.fat_share * 100.0).round(),
    }
}

/// 35 ml per kg plus 600 ml per training hour
pub fn water(weight_kg: f64, training_hours: f64) -> Water {
    if weight_kg <= 0.0 {
        return Water::default();
    }
    let base_ml = 35.0 * weight_kg;
    let extra_ml = 600.0 * training_hours.max(0.0);
    Water {
        ml: (base_ml + extra_ml).round(),
        base_ml: base_ml.round(),
        extra_ml: extra_ml.round(),
    }
}

pub fn steps(goal: Goal) -> StepsRange {
    match goal {
        Goal::Bulk => StepsRange { min: 6000, max: 8000 },
        Goal::Maintain => StepsRange { min: 7000, max: 10000 },
        Goal::Cut => StepsRange { min: 8000, max: 12000 },
    }
}

/// Full plan, or `None` when the profile is incomplete
pub fn plan(profile: &BodyProfile, goal: Goal, activity_factor: f64) -> Option<NutritionPlan> {
    if profile.age <= 0.0 || profile.weight_kg <= 0.0 || profile.height <= 0.0 {
        return None;
    }

    let bmr = bmr(profile);
    let tdee = tdee(bmr, activity_factor);

    let day = |rest_day: bool, hours: f64| {
        let kcal = target_kcal(tdee, goal, rest_day);
        DayTargets {
            kcal,
            macros: macros(kcal, profile.weight_kg, profile.sex, goal),
            water: water(profile.weight_kg, hours),
        }
    };

    Some(NutritionPlan {
        bmr,
        tdee,
        activity_factor,
        goal,
        training: day(false, TRAINING_DAY_HOURS),
        rest: day(true, 0.0),
        steps: steps(goal),
        kcal_difference: goal.kcal_offset(false),
        kcal_difference_rest: goal.kcal_offset(true),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn male_80kg() -> BodyProfile {
        BodyProfile { age: 30.0, weight_kg: 80.0, height: 180.0, sex: Sex::Male }
    }

    #[test]
    fn test_bmr_male_and_female() {
        // 800 + 1125 - 150 + 5
        assert_eq!(bmr(&male_80kg()), 1780.0);
        let female = BodyProfile { sex: Sex::Female, ..male_80kg() };
        assert_eq!(bmr(&female), 1614.0);
    }

    #[test]
    fn test_bmr_height_in_metres() {
        let metres = BodyProfile { height: 1.8, ..male_80kg() };
        assert_eq!(bmr(&metres), 1780.0);
    }

    #[test]
    fn test_bmr_missing_input() {
        let missing = BodyProfile { age: 0.0, ..male_80kg() };
        assert_eq!(bmr(&missing), 0.0);
        assert!(plan(&missing, Goal::Cut, 1.55).is_none());
    }

    #[test]
    fn test_target_kcal() {
        assert_eq!(target_kcal(2500.0, Goal::Bulk, false), 2750.0);
        assert_eq!(target_kcal(2500.0, Goal::Maintain, true), 2500.0);
        assert_eq!(target_kcal(2500.0, Goal::Cut, false), 2250.0);
        assert_eq!(target_kcal(2500.0, Goal::Cut, true), 2150.0);
    }

    #[test]
    fn test_macros_split() {
        let m = macros(2750.0, 80.0, Sex::Male, Goal::Bulk);
        assert_eq!(m.protein_g, 160.0);
        assert_eq!(m.fat_kcal, 688.0);
        assert_eq!(m.fat_g, 76.0);
        // 2750 - 640 - 688 = 1422
        assert_eq!(m.carbs_kcal, 1422.0);
        assert_eq!(m.carbs_g, 356.0);
        assert_eq!(m.fat_percent, 25.0);
    }

    #[test]
    fn test_macros_fat_floor() {
        // 25% of 1000 kcal is 28 g, below 0.6 g/kg for 100 kg
        let m = macros(1000.0, 100.0, Sex::Male, Goal::Cut);
        assert_eq!(m.fat_g, 60.0);
        assert_eq!(m.fat_kcal, 540.0);
        // protein 240 g = 960 kcal leaves nothing for carbs
        assert_eq!(m.carbs_g, 0.0);
        assert_eq!(m.carbs_kcal, 0.0);
    }

    #[test]
    fn test_water() {
        let w = water(80.0, 1.5);
        assert_eq!(w.base_ml, 2800.0);
        assert_eq!(w.extra_ml, 900.0);
        assert_eq!(w.ml, 3700.0);
        assert_eq!(w.liters(), 3.7);
    }

    #[test]
    fn test_goal_parse() {
        assert_eq!(Goal::parse("Volumen"), Goal::Bulk);
        assert_eq!(Goal::parse("ganar_peso"), Goal::Bulk);
        assert_eq!(Goal::parse("recomposición"), Goal::Maintain);
        assert_eq!(Goal::parse("definicion"), Goal::Cut);
        assert_eq!(Goal::parse(""), Goal::Cut);
        assert_eq!(Sex::parse("Hombre"), Sex::Male);
        assert_eq!(Sex::parse("mujer"), Sex::Female);
    }

    #[test]
    fn test_full_plan() {
        let p = plan(&male_80kg(), Goal::Cut, 1.55).unwrap();
        assert_eq!(p.bmr, 1780.0);
        assert_eq!(p.tdee, 2759.0);
        assert_eq!(p.training.kcal, 2509.0);
        assert_eq!(p.rest.kcal, 2409.0);
        assert_eq!(p.rest.water.extra_ml, 0.0);
        assert_eq!(p.steps, StepsRange { min: 8000, max: 12000 });
        assert_eq!(p.kcal_difference_rest, -350.0);
    }
}
