//! Database module - SQLite storage for the offline set log and caches

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::nutrition::units::Food;
use crate::workout::{WorkoutSession, parse_date, sessions_from_log};

/// How many foods the recent list keeps
pub const RECENT_FOODS_LIMIT: usize = 20;

/// Prefix of ids generated by imports; re-importing replaces these rows
pub const BULK_PREFIX: &str = "bulk|";

/// Prefix of ids for sets logged one at a time
pub const MANUAL_PREFIX: &str = "log|";

/// One set in the flat offline log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub date: DateTime<Utc>,
    pub routine_name: String,
    pub week: Option<u32>,
    pub day: Option<u32>,
    pub muscle: String,
    pub exercise: String,
    /// Position of the exercise block in its session (0 for hand-logged sets)
    #[serde(default)]
    pub block: u32,
    pub set_index: u32,
    pub reps: u32,
    pub load: f64,
    pub target_reps_min: Option<u32>,
    pub target_reps_max: Option<u32>,
    pub note: Option<String>,
}

/// Identifies one set: which session it belongs to and where in it
#[derive(Debug, Clone, Copy)]
pub struct SetKey<'a> {
    pub routine: &'a str,
    pub date: DateTime<Utc>,
    pub week: Option<u32>,
    pub day: Option<u32>,
    pub block: u32,
    pub exercise: &'a str,
    pub set_index: u32,
}

impl SetKey<'_> {
    fn id(&self, prefix: &str) -> String {
        format!(
            "{prefix}{}|{}|{}|{}|{}|{}|{}",
            self.routine,
            self.date.format("%Y-%m-%d"),
            self.week.unwrap_or(0),
            self.day.unwrap_or(0),
            self.block,
            self.exercise,
            self.set_index,
        )
    }
}

/// A set typed in by hand
#[derive(Debug, Clone, Default)]
pub struct ManualSet {
    pub date: DateTime<Utc>,
    pub routine: String,
    pub week: Option<u32>,
    pub day: Option<u32>,
    pub muscle: String,
    pub exercise: String,
    pub reps: u32,
    pub load: f64,
    pub target_reps: Option<(u32, u32)>,
    pub note: Option<String>,
}

impl LogEntry {
    /// Deterministic id for an imported set
    pub fn fingerprint(key: &SetKey<'_>) -> String {
        key.id(BULK_PREFIX)
    }

    /// Flatten a session into log rows. Sets with neither reps nor load
    /// carry no information and are skipped.
    pub fn from_session(session: &WorkoutSession) -> Vec<LogEntry> {
        let routine = session.routine_name.clone().unwrap_or_default();
        let week = Some(session.week_number());

        let mut entries = Vec::new();
        for (block, exercise) in session.exercises.iter().enumerate() {
            let block = block as u32;
            for (i, set) in exercise.sets.iter().enumerate() {
                if set.reps == 0 && set.load <= 0.0 {
                    continue;
                }
                let set_index = i as u32 + 1;
                let key = SetKey {
                    routine: &routine,
                    date: session.date,
                    week,
                    day: session.day,
                    block,
                    exercise: &exercise.name,
                    set_index,
                };
                entries.push(LogEntry {
                    id: Self::fingerprint(&key),
                    date: session.date,
                    routine_name: routine.clone(),
                    week,
                    day: session.day,
                    muscle: exercise.muscle_group.clone(),
                    exercise: exercise.name.clone(),
                    block,
                    set_index,
                    reps: set.reps,
                    load: set.load,
                    target_reps_min: set.target_reps_min,
                    target_reps_max: set.target_reps_max,
                    note: set.notes.clone(),
                });
            }
        }
        entries
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let date_str: String = row.get(1)?;
        let date = parse_date(&date_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(1, Type::Text, format!("invalid date {date_str:?}").into())
        })?;
        Ok(LogEntry {
            id: row.get(0)?,
            date,
            routine_name: row.get(2)?,
            week: row.get(3)?,
            day: row.get(4)?,
            muscle: row.get(5)?,
            exercise: row.get(6)?,
            set_index: row.get(7)?,
            reps: row.get(8)?,
            load: row.get(9)?,
            target_reps_min: row.get(10)?,
            target_reps_max: row.get(11)?,
            note: row.get(12)?,
            block: row.get(13)?,
        })
    }
}

/// Database wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database (`:memory:` for a throwaway store)
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).with_context(|| format!("opening database {path}"))?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS log_entries (
                id TEXT PRIMARY KEY,
                date TEXT NOT NULL,
                routine_name TEXT NOT NULL,
                week INTEGER,
                day INTEGER,
                muscle TEXT NOT NULL,
                exercise TEXT NOT NULL,
                set_index INTEGER NOT NULL,
                reps INTEGER NOT NULL,
                load REAL NOT NULL,
                target_reps_min INTEGER,
                target_reps_max INTEGER,
                note TEXT,
                block INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS session_cache (
                client_id TEXT PRIMARY KEY,
                fetched_at TEXT NOT NULL,
                payload TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS recent_foods (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                food_id TEXT NOT NULL,
                name TEXT NOT NULL,
                payload TEXT NOT NULL
            );",
        )?;

        // Migration: add block column if missing
        let has_block = self.conn.prepare("SELECT block FROM log_entries LIMIT 1").is_ok();
        if !has_block {
            self.conn
                .execute("ALTER TABLE log_entries ADD COLUMN block INTEGER NOT NULL DEFAULT 0", [])?;
        }
        Ok(())
    }

    /// Add or replace a log entry (same id = same set)
    pub fn add_log_entry(&self, entry: &LogEntry) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO log_entries
                (id, date, routine_name, week, day, muscle, exercise, set_index, reps, load, target_reps_min, target_reps_max, note, block)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                entry.id,
                entry.date.to_rfc3339(),
                entry.routine_name,
                entry.week,
                entry.day,
                entry.muscle,
                entry.exercise,
                entry.set_index,
                entry.reps,
                entry.load,
                entry.target_reps_min,
                entry.target_reps_max,
                entry.note,
                entry.block,
            ],
        )?;
        Ok(())
    }

    /// Add many entries in one transaction
    pub fn add_log_entries(&self, entries: &[LogEntry]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        for entry in entries {
            self.add_log_entry(entry)?;
        }
        tx.commit()?;
        debug!(count = entries.len(), "log entries written");
        Ok(entries.len())
    }

    /// Get all log entries, oldest first
    pub fn get_log_entries(&self) -> Result<Vec<LogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, date, routine_name, week, day, muscle, exercise, set_index, reps, load,
                    target_reps_min, target_reps_max, note, block
             FROM log_entries ORDER BY date ASC, block ASC, set_index ASC",
        )?;

        let entries = stmt
            .query_map([], LogEntry::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Next 1-based set index for an exercise on a routine's calendar day
    pub fn next_set_index(&self, date: DateTime<Utc>, routine: &str, exercise: &str) -> Result<u32> {
        let next: u32 = self.conn.query_row(
            "SELECT COALESCE(MAX(set_index), 0) + 1 FROM log_entries
             WHERE substr(date, 1, 10) = ?1 AND routine_name = ?2 AND exercise = ?3",
            params![date.format("%Y-%m-%d").to_string(), routine, exercise],
            |row| row.get(0),
        )?;
        Ok(next)
    }

    /// Log one hand-entered set as the next set of its exercise.
    /// The id carries the routine, week and day, so the same exercise
    /// under two routines on one date stays two rows.
    pub fn log_set(&self, set: ManualSet) -> Result<LogEntry> {
        let set_index = self.next_set_index(set.date, &set.routine, &set.exercise)?;
        let week = set.week.filter(|w| *w > 0);
        let (target_reps_min, target_reps_max) = match set.target_reps {
            Some((min, max)) => (Some(min).filter(|n| *n > 0), Some(max).filter(|n| *n > 0)),
            None => (None, None),
        };
        let key = SetKey {
            routine: &set.routine,
            date: set.date,
            week,
            day: set.day,
            block: 0,
            exercise: &set.exercise,
            set_index,
        };
        let entry = LogEntry {
            id: key.id(MANUAL_PREFIX),
            date: set.date,
            week,
            day: set.day,
            muscle: set.muscle,
            block: 0,
            set_index,
            reps: set.reps,
            load: set.load,
            target_reps_min,
            target_reps_max,
            note: set.note,
            routine_name: set.routine,
            exercise: set.exercise,
        };
        self.add_log_entry(&entry)?;
        debug!(id = %entry.id, "set logged");
        Ok(entry)
    }

    /// Sessions rebuilt from the offline log
    pub fn log_sessions(&self) -> Result<Vec<WorkoutSession>> {
        Ok(sessions_from_log(&self.get_log_entries()?))
    }

    /// Wipe the offline log, returning how many rows went
    pub fn clear_log(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM log_entries", [])?)
    }

    /// Replace the cached sessions for a client
    pub fn cache_sessions(&self, client_id: &str, sessions: &[WorkoutSession]) -> Result<()> {
        let payload = serde_json::to_string(sessions)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO session_cache (client_id, fetched_at, payload) VALUES (?1, ?2, ?3)",
            params![client_id, Utc::now().to_rfc3339(), payload],
        )?;
        Ok(())
    }

    /// Cached sessions for a client, if any were ever stored
    pub fn cached_sessions(&self, client_id: &str) -> Result<Option<Vec<WorkoutSession>>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM session_cache WHERE client_id = ?1",
                params![client_id],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json).context("decoding cached sessions")?)),
            None => Ok(None),
        }
    }

    /// Push foods to the front of the recent list, dropping older copies
    /// (same id or same name) and keeping at most [`RECENT_FOODS_LIMIT`]
    pub fn remember_foods(&self, foods: &[Food]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for food in foods {
            self.conn.execute(
                "DELETE FROM recent_foods WHERE food_id = ?1 OR name = ?2",
                params![food.id, food.name],
            )?;
            self.conn.execute(
                "INSERT INTO recent_foods (food_id, name, payload) VALUES (?1, ?2, ?3)",
                params![food.id, food.name, serde_json::to_string(food)?],
            )?;
        }
        self.conn.execute(
            "DELETE FROM recent_foods WHERE seq NOT IN
                (SELECT seq FROM recent_foods ORDER BY seq DESC LIMIT ?1)",
            params![RECENT_FOODS_LIMIT as i64],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Recent foods, most recent first
    pub fn recent_foods(&self) -> Result<Vec<Food>> {
        let mut stmt = self
            .conn
            .prepare("SELECT payload FROM recent_foods ORDER BY seq DESC")?;
        let payloads = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        payloads
            .iter()
            .map(|p| serde_json::from_str(p).context("decoding recent food"))
            .collect()
    }
}
