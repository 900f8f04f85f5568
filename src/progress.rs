//! Client progress summary for the coach overview

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::workout::WorkoutSession;

/// Label for a 1-5 session RPE
pub fn rpe_label(rpe: u8) -> &'static str {
    match rpe {
        1 => "Very easy",
        2 => "Easy",
        3 => "Moderate",
        4 => "Hard",
        5 => "Maximal",
        _ => "Unknown",
    }
}

/// Trend as a word: up, down or flat (within 5%)
pub fn trend_direction(trend: f64) -> &'static str {
    if trend > 5.0 {
        "up"
    } else if trend < -5.0 {
        "down"
    } else {
        "flat"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientProgress {
    /// Rounded % change of last-7-days volume against the 7 days before
    pub trend: f64,
    pub days_since_last: Option<i64>,
    pub sessions_this_week: usize,
    pub last_session: Option<DateTime<Utc>>,
    pub volume_this_week: f64,
    pub volume_last_week: f64,
    pub last_rpe: Option<u8>,
    pub last_rpe_note: Option<String>,
}

/// % change between two consecutive windows. A start from nothing counts as
/// +100%.
pub fn week_trend(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        (current - previous) / previous * 100.0
    } else if current > 0.0 {
        100.0
    } else {
        0.0
    }
}

impl ClientProgress {
    pub fn from_sessions(sessions: &[WorkoutSession], now: DateTime<Utc>) -> Self {
        let Some(latest) = sessions.iter().max_by_key(|s| s.date) else {
            return Self::default();
        };

        let week_ago = now - Duration::days(7);
        let two_weeks_ago = now - Duration::days(14);

        let this_week: Vec<_> = sessions.iter().filter(|s| s.date >= week_ago).collect();
        let volume_this_week: f64 = this_week.iter().map(|s| s.volume()).sum();
        let volume_last_week: f64 = sessions
            .iter()
            .filter(|s| s.date >= two_weeks_ago && s.date < week_ago)
            .map(WorkoutSession::volume)
            .sum();

        Self {
            trend: week_trend(volume_this_week, volume_last_week).round(),
            days_since_last: Some((now - latest.date).num_days()),
            sessions_this_week: this_week.len(),
            last_session: Some(latest.date),
            volume_this_week,
            volume_last_week,
            last_rpe: latest.session_rpe,
            last_rpe_note: latest.session_note.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workout::tests::day;
    use crate::workout::{Exercise, WorkoutSet};

    fn at(date: DateTime<Utc>, load: f64) -> WorkoutSession {
        WorkoutSession::new(date, None, vec![Exercise::new("Bench", "CHEST", vec![WorkoutSet::new(10, load)])])
    }

    #[test]
    fn test_empty_is_default() {
        let p = ClientProgress::from_sessions(&[], day(2025, 5, 1));
        assert_eq!(p, ClientProgress::default());
        assert!(p.days_since_last.is_none());
    }

    #[test]
    fn test_summary() {
        let now = day(2025, 5, 20);
        let mut latest = at(now - Duration::days(2), 60.0);
        latest.session_rpe = Some(4);
        latest.session_note = Some("tough".to_string());
        let sessions = vec![
            at(now - Duration::days(10), 40.0),
            latest,
            at(now - Duration::days(5), 60.0),
            at(now - Duration::days(30), 500.0),
        ];

        let p = ClientProgress::from_sessions(&sessions, now);
        assert_eq!(p.volume_this_week, 1200.0);
        assert_eq!(p.volume_last_week, 400.0);
        assert_eq!(p.trend, 200.0);
        assert_eq!(p.sessions_this_week, 2);
        assert_eq!(p.days_since_last, Some(2));
        assert_eq!(p.last_rpe, Some(4));
        assert_eq!(p.last_rpe_note.as_deref(), Some("tough"));
    }

    #[test]
    fn test_week_trend_from_zero() {
        assert_eq!(week_trend(500.0, 0.0), 100.0);
        assert_eq!(week_trend(0.0, 0.0), 0.0);
        assert_eq!(week_trend(50.0, 100.0), -50.0);
    }

    #[test]
    fn test_labels() {
        assert_eq!(rpe_label(3), "Moderate");
        assert_eq!(rpe_label(9), "Unknown");
        assert_eq!(trend_direction(12.0), "up");
        assert_eq!(trend_direction(-3.0), "flat");
    }
}
