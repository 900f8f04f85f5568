//! Workout domain types - sessions, exercises and sets
//!
//! Sessions arrive either from the coaching backend (camelCase JSON) or are
//! rebuilt from the flat offline log. Numbers coming from either side are
//! coerced leniently: anything that isn't a finite number becomes 0.

use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::db::LogEntry;

/// Muscle group used when an exercise carries none
pub const UNGROUPED_MUSCLE: &str = "OTHER";

/// One performed set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSet {
    #[serde(rename = "actualReps", default, deserialize_with = "lenient_count")]
    pub reps: u32,
    #[serde(rename = "weight", default, deserialize_with = "lenient_number")]
    pub load: f64,
    #[serde(default, deserialize_with = "lenient_opt_count", skip_serializing_if = "Option::is_none")]
    pub target_reps_min: Option<u32>,
    #[serde(default, deserialize_with = "lenient_opt_count", skip_serializing_if = "Option::is_none")]
    pub target_reps_max: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
}

impl WorkoutSet {
    pub fn new(reps: u32, load: f64) -> Self {
        Self {
            reps,
            load,
            ..Default::default()
        }
    }

    /// Attach a target rep range
    pub fn with_target(mut self, min: u32, max: u32) -> Self {
        self.target_reps_min = Some(min).filter(|v| *v > 0);
        self.target_reps_max = Some(max).filter(|v| *v > 0);
        self
    }

    /// reps x load
    pub fn volume(&self) -> f64 {
        self.reps as f64 * self.load
    }

    /// True when reps fall inside the target range. A missing bound does
    /// not constrain, so a set without targets is always in range.
    pub fn in_target_range(&self) -> bool {
        let above_min = self.target_reps_min.is_none_or(|min| self.reps >= min);
        let below_max = self.target_reps_max.is_none_or(|max| self.reps <= max);
        above_min && below_max
    }

    pub fn e1rm(&self) -> f64 {
        estimated_one_rep_max(self.load, self.reps)
    }
}

/// One exercise inside a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    #[serde(rename = "exerciseName", default)]
    pub name: String,
    #[serde(default)]
    pub muscle_group: String,
    #[serde(default)]
    pub sets: Vec<WorkoutSet>,
}

impl Exercise {
    pub fn new(name: &str, muscle_group: &str, sets: Vec<WorkoutSet>) -> Self {
        Self {
            name: name.to_string(),
            muscle_group: muscle_group.to_string(),
            sets,
        }
    }

    pub fn volume(&self) -> f64 {
        self.sets.iter().map(WorkoutSet::volume).sum()
    }

    /// Muscle group, or [`UNGROUPED_MUSCLE`] when blank
    pub fn muscle(&self) -> &str {
        if self.muscle_group.trim().is_empty() {
            UNGROUPED_MUSCLE
        } else {
            &self.muscle_group
        }
    }

    /// Best e1RM over all sets (0 when nothing was lifted)
    pub fn best_e1rm(&self) -> f64 {
        self.sets.iter().map(WorkoutSet::e1rm).fold(0.0, f64::max)
    }
}

/// One training occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSession {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient_date")]
    pub date: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient_opt_count", skip_serializing_if = "Option::is_none")]
    pub week: Option<u32>,
    #[serde(default, deserialize_with = "lenient_opt_index", skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routine_name: Option<String>,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[serde(
        rename = "sessionRPE",
        default,
        deserialize_with = "lenient_rpe",
        skip_serializing_if = "Option::is_none"
    )]
    pub session_rpe: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_note: Option<String>,
}

impl WorkoutSession {
    pub fn new(date: DateTime<Utc>, week: Option<u32>, exercises: Vec<Exercise>) -> Self {
        Self {
            id: None,
            date,
            week,
            day: None,
            routine_name: None,
            exercises,
            session_rpe: None,
            session_note: None,
        }
    }

    /// Explicit week number, or the week of the year of the session date
    pub fn week_number(&self) -> u32 {
        self.week.unwrap_or_else(|| week_of_year(self.date.date_naive()))
    }

    pub fn volume(&self) -> f64 {
        self.exercises.iter().map(Exercise::volume).sum()
    }

    pub fn sets(&self) -> impl Iterator<Item = &WorkoutSet> {
        self.exercises.iter().flat_map(|e| e.sets.iter())
    }
}

/// Epley estimate: load x (1 + reps / 30). Zero for empty sets.
pub fn estimated_one_rep_max(load: f64, reps: u32) -> f64 {
    if reps == 0 || load <= 0.0 {
        return 0.0;
    }
    load * (1.0 + reps as f64 / 30.0)
}

/// Sunday-based week of the year; January 1st is always in week 1
pub fn week_of_year(date: NaiveDate) -> u32 {
    use chrono::Datelike;

    let jan1 = NaiveDate::from_yo_opt(date.year(), 1).unwrap_or(date);
    let offset = jan1.weekday().num_days_from_sunday();
    (date.ordinal0() + offset) / 7 + 1
}

/// Rebuild sessions from flat log rows.
///
/// Rows are grouped by routine, calendar date, week and day index, so two
/// routines trained on the same date stay separate sessions. Exercises are
/// ordered by block, then by first appearance in the log; a name repeated
/// in another block is its own exercise. Sets are ordered by set index.
pub fn sessions_from_log(entries: &[LogEntry]) -> Vec<WorkoutSession> {
    type Key = (NaiveDate, String, Option<u32>, Option<u32>);

    let mut groups: BTreeMap<Key, Vec<&LogEntry>> = BTreeMap::new();
    for entry in entries {
        let key = (
            entry.date.date_naive(),
            entry.routine_name.clone(),
            entry.week,
            entry.day,
        );
        groups.entry(key).or_default().push(entry);
    }

    groups
        .into_iter()
        .map(|((_, routine, week, day), rows)| {
            let date = rows.iter().map(|r| r.date).min().unwrap_or_else(Utc::now);

            let mut blocks: Vec<(&LogEntry, Vec<&LogEntry>)> = Vec::new();
            for row in rows {
                match blocks.iter_mut().find(|(first, _)| {
                    first.block == row.block && first.exercise == row.exercise && first.muscle == row.muscle
                }) {
                    Some((_, sets)) => sets.push(row),
                    None => blocks.push((row, vec![row])),
                }
            }
            blocks.sort_by_key(|(first, _)| first.block);

            let exercises = blocks
                .into_iter()
                .map(|(first, mut rows)| {
                    rows.sort_by_key(|r| r.set_index);
                    let sets = rows
                        .into_iter()
                        .map(|row| WorkoutSet {
                            reps: row.reps,
                            load: row.load,
                            target_reps_min: row.target_reps_min,
                            target_reps_max: row.target_reps_max,
                            notes: row.note.clone(),
                            media_url: None,
                        })
                        .collect();
                    Exercise::new(&first.exercise, &first.muscle, sets)
                })
                .collect();

            let mut session = WorkoutSession::new(date, week, exercises);
            session.day = day;
            session.routine_name = Some(routine).filter(|r| !r.is_empty());
            session
        })
        .collect()
}

/// Parse an exported session file: either a bare array of sessions or the
/// backend's `{ "workouts": [...] }` envelope
pub fn sessions_from_json(raw: &str) -> Result<Vec<WorkoutSession>> {
    let value: Value = serde_json::from_str(raw).context("invalid JSON")?;
    let list = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => match map.remove("workouts") {
            Some(list) => list,
            None => bail!("expected an array of sessions or an object with \"workouts\""),
        },
        _ => bail!("expected an array of sessions or an object with \"workouts\""),
    };
    serde_json::from_value(list).context("invalid session data")
}

// ---------------------------------------------------------------------------
// Lenient numeric coercion
// ---------------------------------------------------------------------------

/// Coerce a JSON value to a finite number; anything else is 0
pub fn coerce_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().replace(',', ".").parse().unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };
    if n.is_finite() { n } else { 0.0 }
}

fn coerce_count(value: &Value) -> u32 {
    let n = coerce_number(value);
    if n > 0.0 { n.round().min(u32::MAX as f64) as u32 } else { 0 }
}

fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().map(coerce_number).unwrap_or(0.0).max(0.0))
}

fn lenient_count<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().map(coerce_count).unwrap_or(0))
}

/// Zero or malformed means "not set"
fn lenient_opt_count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().map(coerce_count).filter(|n| *n > 0))
}

/// Day indices start at 0, so only null/missing means "not set"
fn lenient_opt_index<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.filter(|v| !v.is_null()).as_ref().map(coerce_count))
}

fn lenient_rpe<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u8>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value
        .as_ref()
        .map(coerce_count)
        .filter(|n| *n > 0)
        .map(|n| n.min(5) as u8))
}

/// RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC)
fn lenient_date<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(d)?;
    parse_date(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid session date: {raw}")))
}

pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap()
    }

    pub(crate) fn session(week: u32, exercises: Vec<Exercise>) -> WorkoutSession {
        WorkoutSession::new(day(2025, 1, 1) + chrono::Duration::weeks(week as i64), Some(week), exercises)
    }

    #[test]
    fn test_set_volume_and_range() {
        let set = WorkoutSet::new(10, 50.0).with_target(8, 12);
        assert_eq!(set.volume(), 500.0);
        assert!(set.in_target_range());

        let low = WorkoutSet::new(6, 50.0).with_target(8, 12);
        assert!(!low.in_target_range());

        let no_target = WorkoutSet::new(3, 50.0);
        assert!(no_target.in_target_range());
    }

    #[test]
    fn test_sessions_from_json_accepts_both_shapes() {
        let bare = r#"[{"date": "2025-02-03", "exercises": []}]"#;
        assert_eq!(sessions_from_json(bare).unwrap().len(), 1);

        let envelope = r#"{"success": true, "workouts": [{"date": "2025-02-03", "exercises": []}]}"#;
        assert_eq!(sessions_from_json(envelope).unwrap().len(), 1);

        assert!(sessions_from_json(r#"{"items": []}"#).is_err());
        assert!(sessions_from_json("not json").is_err());
    }

    #[test]
    fn test_e1rm() {
        assert_eq!(estimated_one_rep_max(100.0, 0), 0.0);
        assert_eq!(estimated_one_rep_max(0.0, 10), 0.0);
        assert!((estimated_one_rep_max(100.0, 30) - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_week_of_year() {
        // 2025-01-01 is a Wednesday
        assert_eq!(week_of_year(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()), 1);
        assert_eq!(week_of_year(NaiveDate::from_ymd_opt(2025, 1, 4).unwrap()), 1);
        // Sunday starts week 2
        assert_eq!(week_of_year(NaiveDate::from_ymd_opt(2025, 1, 5).unwrap()), 2);
    }

    #[test]
    fn test_session_json_lenient() {
        let json = r#"{
            "_id": "abc",
            "date": "2025-03-10T08:30:00.000Z",
            "week": "3",
            "routineName": "Push Pull",
            "sessionRPE": 9,
            "exercises": [{
                "exerciseName": "Bench",
                "muscleGroup": "CHEST",
                "sets": [
                    {"actualReps": "10", "weight": 60, "targetRepsMin": 8, "targetRepsMax": 12},
                    {"actualReps": null, "weight": "abc"},
                    {"actualReps": -4, "weight": 20.5, "targetRepsMin": 0}
                ]
            }]
        }"#;
        let s: WorkoutSession = serde_json::from_str(json).unwrap();
        assert_eq!(s.id.as_deref(), Some("abc"));
        assert_eq!(s.week, Some(3));
        assert_eq!(s.session_rpe, Some(5));
        let sets = &s.exercises[0].sets;
        assert_eq!(sets[0].reps, 10);
        assert_eq!(sets[0].target_reps_max, Some(12));
        assert_eq!(sets[1].reps, 0);
        assert_eq!(sets[1].load, 0.0);
        assert_eq!(sets[2].reps, 0);
        assert_eq!(sets[2].target_reps_min, None);
    }

    #[test]
    fn test_session_json_bare_date_and_missing_fields() {
        let s: WorkoutSession = serde_json::from_str(r#"{"date": "2025-01-05"}"#).unwrap();
        assert!(s.exercises.is_empty());
        assert_eq!(s.week, None);
        assert_eq!(s.week_number(), 2);
    }

    #[test]
    fn test_session_json_bad_date_is_error() {
        assert!(serde_json::from_str::<WorkoutSession>(r#"{"date": "yesterday"}"#).is_err());
    }

    fn entry(id: &str, routine: &str, date: DateTime<Utc>, day: u32, exercise: &str, set_index: u32) -> LogEntry {
        LogEntry {
            id: id.to_string(),
            date,
            routine_name: routine.to_string(),
            week: Some(1),
            day: Some(day),
            muscle: "CHEST".to_string(),
            exercise: exercise.to_string(),
            block: 0,
            set_index,
            reps: 10,
            load: 50.0,
            target_reps_min: None,
            target_reps_max: None,
            note: None,
        }
    }

    #[test]
    fn test_sessions_from_log_keeps_routines_apart() {
        let d = day(2025, 2, 3);
        let entries = vec![
            entry("1", "A", d, 0, "Bench", 2),
            entry("2", "A", d, 0, "Bench", 1),
            entry("3", "B", d, 0, "Bench", 1),
            entry("4", "A", d, 1, "Fly", 1),
        ];
        let sessions = sessions_from_log(&entries);
        assert_eq!(sessions.len(), 3);

        let a0 = sessions
            .iter()
            .find(|s| s.routine_name.as_deref() == Some("A") && s.day == Some(0))
            .unwrap();
        assert_eq!(a0.exercises.len(), 1);
        assert_eq!(a0.exercises[0].sets.len(), 2);
        assert_eq!(a0.volume(), 1000.0);
    }

    #[test]
    fn test_sessions_from_log_exercise_order() {
        let d = day(2025, 2, 3);
        let mut squat = entry("1", "A", d, 0, "Squat", 2);
        squat.muscle = "LEGS".to_string();
        let mut late_bench = entry("2", "A", d, 0, "Bench", 1);
        late_bench.block = 2;
        let mut early_bench = entry("3", "A", d, 0, "Bench", 1);
        early_bench.load = 80.0;
        let mut squat_first = squat.clone();
        squat_first.set_index = 1;
        squat_first.load = 60.0;

        // log order: Squat set 2, Bench (block 2), Bench, Squat set 1
        let sessions = sessions_from_log(&[squat, late_bench, early_bench, squat_first]);
        let names: Vec<_> = sessions[0].exercises.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Squat", "Bench", "Bench"]);
        assert_eq!(sessions[0].exercises[0].sets[0].load, 60.0);
        assert_eq!(sessions[0].exercises[1].sets[0].load, 80.0);
        assert_eq!(sessions[0].exercises[2].sets[0].load, 50.0);
    }

    #[test]
    fn test_sessions_from_log_empty() {
        assert!(sessions_from_log(&[]).is_empty());
    }
}
