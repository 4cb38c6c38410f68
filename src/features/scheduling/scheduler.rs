use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, Utc};

/// Recall quality reported when reviewing a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    /// Complete blackout.
    Again = 0,
    /// Still needed to peek at the solution.
    Hard = 1,
    /// Correct but with some difficulty.
    Good = 2,
    /// Perfect response.
    Easy = 3,
}

impl Score {
    pub fn from_rating(rating: i32) -> Option<Score> {
        match rating {
            0 => Some(Score::Again),
            1 => Some(Score::Hard),
            2 => Some(Score::Good),
            3 => Some(Score::Easy),
            _ => None,
        }
    }

    pub fn rating(self) -> i32 {
        self as i32
    }
}

/// Scheduling state of a tracked problem before a review.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleState {
    /// Reviews completed so far.
    pub repetitions_count: i32,
    pub interval_days: i32,
    /// Retained tuning parameter; the current policy reads it through
    /// unchanged.
    pub ease_factor: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleOutcome {
    pub next_interval_days: i32,
    pub next_repetitions_count: i32,
    pub next_ease_factor: f64,
}

/// Interval multiplier while a problem is still young (one prior review).
const EARLY_LEARNING_STEP: f64 = 3.0;
/// Interval multiplier once a problem has two or more prior reviews.
const MATURE_LEARNING_STEP: f64 = 7.0;

/// Computes the next scheduling state from the current one and a review
/// score. Pure; the caller owns loading and persisting.
///
/// The very first review always lands the problem back tomorrow, whatever
/// the score. After that the interval scales with the score and a fixed
/// learning step, except that a blackout resets to one day. Every review
/// attempt increments the repetition count, failures included.
pub fn schedule(state: &ScheduleState, score: Score) -> ScheduleOutcome {
    let n = state.repetitions_count;

    let next_interval_days = match n {
        0 => 1,
        1 => step(n, score, EARLY_LEARNING_STEP),
        _ => step(n, score, MATURE_LEARNING_STEP),
    };

    ScheduleOutcome {
        next_interval_days,
        next_repetitions_count: n + 1,
        next_ease_factor: state.ease_factor,
    }
}

fn step(n: i32, score: Score, learning_step: f64) -> i32 {
    // A failure overrides any learning-step scaling.
    if score == Score::Again {
        return 1;
    }

    let scale = f64::from(score.rating()) / 3.0;
    let repetitions = if n == 1 { n } else { n - 1 };
    let days = (f64::from(repetitions) * scale * learning_step).round() as i32;

    // Never schedule into the past; zero means due immediately.
    days.max(0)
}

/// Due dates are day-granular: the review day's UTC midnight plus the
/// interval.
pub fn due_date_from(now: DateTime<Utc>, interval_days: i32) -> NaiveDateTime {
    now.date_naive().and_time(NaiveTime::MIN) + Duration::days(i64::from(interval_days))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn state(repetitions_count: i32, interval_days: i32) -> ScheduleState {
        ScheduleState {
            repetitions_count,
            interval_days,
            ease_factor: 2.5,
        }
    }

    #[test]
    fn first_review_is_due_tomorrow_for_every_score() {
        for score in [Score::Again, Score::Hard, Score::Good, Score::Easy] {
            let outcome = schedule(&state(0, 0), score);
            assert_eq!(outcome.next_interval_days, 1);
            assert_eq!(outcome.next_repetitions_count, 1);
        }
    }

    #[test]
    fn second_review_scales_the_score_over_three_days() {
        assert_eq!(schedule(&state(1, 1), Score::Easy).next_interval_days, 3);
        assert_eq!(schedule(&state(1, 1), Score::Good).next_interval_days, 2);
        assert_eq!(schedule(&state(1, 1), Score::Hard).next_interval_days, 1);
    }

    #[test]
    fn blackout_resets_to_one_day_at_any_repetition_count() {
        for n in [1, 2, 5, 40] {
            let outcome = schedule(&state(n, 30), Score::Again);
            assert_eq!(outcome.next_interval_days, 1);
            assert_eq!(outcome.next_repetitions_count, n + 1);
        }
    }

    #[test]
    fn mature_reviews_scale_the_score_over_seven_days() {
        // round((n - 1) * (score / 3) * 7)
        assert_eq!(schedule(&state(2, 3), Score::Easy).next_interval_days, 7);
        assert_eq!(schedule(&state(3, 7), Score::Hard).next_interval_days, 5);
        assert_eq!(schedule(&state(4, 14), Score::Good).next_interval_days, 14);
    }

    #[test]
    fn repetitions_always_increment() {
        for n in 0..10 {
            for score in [Score::Again, Score::Hard, Score::Good, Score::Easy] {
                assert_eq!(
                    schedule(&state(n, 1), score).next_repetitions_count,
                    n + 1
                );
            }
        }
    }

    #[test]
    fn ease_factor_passes_through_unchanged() {
        let before = ScheduleState {
            repetitions_count: 3,
            interval_days: 7,
            ease_factor: 1.7,
        };
        assert_eq!(schedule(&before, Score::Good).next_ease_factor, 1.7);
    }

    #[test]
    fn two_identical_reviews_do_not_repeat_the_same_interval() {
        // Scheduling is stateful across calls: a fresh problem reviewed
        // twice with the same score moves 1 day, then score-derived days.
        let first = schedule(&state(0, 0), Score::Good);
        assert_eq!(first.next_interval_days, 1);

        let second = schedule(&state(first.next_repetitions_count, first.next_interval_days), Score::Good);
        assert_eq!(second.next_interval_days, 2);
        assert!(second.next_repetitions_count > first.next_repetitions_count);
    }

    #[test]
    fn due_date_is_midnight_of_today_plus_interval() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap();
        let due = due_date_from(now, 2);
        assert_eq!(due, Utc.with_ymd_and_hms(2026, 3, 16, 0, 0, 0).unwrap().naive_utc());
    }

    #[test]
    fn zero_interval_is_due_immediately() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap();
        assert!(due_date_from(now, 0) <= now.naive_utc());
    }

    proptest! {
        #[test]
        fn schedule_invariants(n in 0..500i32, interval in 0..1000i32, rating in 0..=3i32) {
            let score = Score::from_rating(rating).unwrap();
            let outcome = schedule(&state(n, interval), score);

            prop_assert_eq!(outcome.next_repetitions_count, n + 1);
            prop_assert!(outcome.next_interval_days >= 0);
            if rating == 0 || n == 0 {
                prop_assert_eq!(outcome.next_interval_days, 1);
            }
        }
    }
}
