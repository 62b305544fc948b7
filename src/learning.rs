// File: src/learning.rs
//! SM-2 variant scheduling for saved vocabulary.
use crate::config::ReviewConfig;
use crate::error::{LexiconError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_EASINESS: f64 = 1.3;
pub const DEFAULT_EASINESS: f64 = 2.5;
pub const MAX_QUALITY: u8 = 5;
/// Ratings below this count as a lapse even when marked correct.
pub const PASSING_QUALITY: u8 = 3;

/// Spaced-repetition state of one vocabulary item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SrsState {
    /// Consecutive successful reviews.
    pub repetitions: u32,
    pub easiness: f64,
    /// Every review, passed or failed.
    pub review_count: u32,
    pub next_review_at: DateTime<Utc>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl SrsState {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at <= now
    }
}

pub struct ReviewScheduler {
    default_easiness: f64,
}

impl Default for ReviewScheduler {
    fn default() -> Self {
        Self { default_easiness: DEFAULT_EASINESS }
    }
}

impl ReviewScheduler {
    pub fn new(config: &ReviewConfig) -> Self {
        Self { default_easiness: config.default_easiness.max(MIN_EASINESS) }
    }

    /// State of a newly saved word: first review one day out.
    pub fn initial_state(&self, now: DateTime<Utc>) -> SrsState {
        SrsState {
            repetitions: 0,
            easiness: self.default_easiness,
            review_count: 0,
            next_review_at: now + Duration::days(1),
            last_reviewed_at: None,
        }
    }

    /// Applies one review outcome.
    ///
    /// A pass (`correct` with quality >= 3) bumps repetitions, adjusts
    /// easiness and spaces the next review 1, 6, then round(6 * easiness)
    /// days out. Anything else resets repetitions and schedules tomorrow.
    pub fn schedule(&self, state: &SrsState, correct: bool, quality: u8, now: DateTime<Utc>) -> Result<SrsState> {
        if quality > MAX_QUALITY {
            return Err(LexiconError::InvalidInput(format!(
                "quality {} is outside 0..={}",
                quality, MAX_QUALITY
            )));
        }

        let mut next = *state;
        next.review_count += 1;
        next.last_reviewed_at = Some(now);

        if correct && quality >= PASSING_QUALITY {
            next.repetitions += 1;
            let miss = f64::from(MAX_QUALITY - quality);
            next.easiness = (state.easiness + 0.1 - miss * (0.08 + miss * 0.02)).max(MIN_EASINESS);
            let interval_days = match next.repetitions {
                1 => 1,
                2 => 6,
                _ => (6.0 * next.easiness).round() as i64,
            };
            next.next_review_at = now + Duration::days(interval_days);
        } else {
            next.repetitions = 0;
            next.next_review_at = now + Duration::days(1);
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn fresh_item_perfect_recall() {
        let scheduler = ReviewScheduler::default();
        let fresh = scheduler.initial_state(now() - Duration::days(1));
        let next = scheduler.schedule(&fresh, true, 5, now()).unwrap();

        assert_eq!(next.repetitions, 1);
        assert!(close(next.easiness, 2.6));
        assert_eq!(next.next_review_at, now() + Duration::days(1));
        assert_eq!(next.last_reviewed_at, Some(now()));
        assert_eq!(next.review_count, 1);
    }

    #[test]
    fn intervals_grow_one_six_then_easiness() {
        let scheduler = ReviewScheduler::default();
        let mut state = scheduler.initial_state(now());
        let mut intervals = Vec::new();
        for _ in 0..3 {
            state = scheduler.schedule(&state, true, 4, now()).unwrap();
            intervals.push((state.next_review_at - now()).num_days());
        }
        // Quality 4 leaves easiness at 2.5: round(6 * 2.5) = 15.
        assert!(close(state.easiness, 2.5));
        assert_eq!(intervals, vec![1, 6, 15]);
    }

    #[test]
    fn failure_resets_regardless_of_history() {
        let scheduler = ReviewScheduler::default();
        let seasoned = SrsState {
            repetitions: 7,
            easiness: 2.9,
            review_count: 12,
            next_review_at: now() + Duration::days(40),
            last_reviewed_at: None,
        };
        let next = scheduler.schedule(&seasoned, false, 1, now()).unwrap();
        assert_eq!(next.repetitions, 0);
        assert_eq!(next.next_review_at, now() + Duration::days(1));
        assert!(close(next.easiness, 2.9));
        assert_eq!(next.review_count, 13);
    }

    #[test]
    fn correct_but_low_quality_is_a_lapse() {
        let scheduler = ReviewScheduler::default();
        let state = scheduler.initial_state(now());
        let next = scheduler.schedule(&state, true, 2, now()).unwrap();
        assert_eq!(next.repetitions, 0);
        assert_eq!(next.next_review_at, now() + Duration::days(1));
    }

    #[test]
    fn easiness_never_drops_below_floor() {
        let scheduler = ReviewScheduler::default();
        let mut state = scheduler.initial_state(now());
        for _ in 0..10 {
            state = scheduler.schedule(&state, true, 3, now()).unwrap();
        }
        assert!(close(state.easiness, MIN_EASINESS));
        // round(6 * 1.3) = 8
        assert_eq!((state.next_review_at - now()).num_days(), 8);
    }

    #[test]
    fn out_of_range_quality_is_rejected() {
        let scheduler = ReviewScheduler::default();
        let state = scheduler.initial_state(now());
        assert!(matches!(
            scheduler.schedule(&state, true, 6, now()),
            Err(LexiconError::InvalidInput(_))
        ));
    }

    #[test]
    fn due_is_inclusive() {
        let state = ReviewScheduler::default().initial_state(now());
        assert!(!state.is_due(now()));
        assert!(state.is_due(now() + Duration::days(1)));
    }
}
