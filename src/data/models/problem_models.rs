use chrono::NaiveDateTime;
use diesel::{Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::schema::{review_logs, tracked_problems};

/// Scheduling record for one problem within one workspace. Mutated only
/// by the scheduling service; (workspace_id, problem_ref) is unique.
#[derive(Debug, Queryable, Selectable, Serialize)]
#[diesel(table_name = tracked_problems)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TrackedProblem {
    pub tracked_problem_id: i32,
    pub workspace_id: i32,
    pub problem_ref: String,
    pub repetitions_count: i32,
    pub ease_factor: f64,
    pub interval_days: i32,
    pub next_review_date: NaiveDateTime,
    pub last_reviewed_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = tracked_problems)]
pub struct NewTrackedProblem<'a> {
    pub workspace_id: i32,
    pub problem_ref: &'a str,
    pub repetitions_count: i32,
    pub ease_factor: f64,
    pub interval_days: i32,
    pub next_review_date: NaiveDateTime,
}

/// Append-only audit record of one review. Never updated or deleted.
#[derive(Debug, Queryable, Selectable, Serialize)]
#[diesel(table_name = review_logs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ReviewLog {
    pub review_log_id: i32,
    pub tracked_problem_id: i32,
    pub quality_rating: i32,
    pub reviewed_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = review_logs)]
pub struct NewReviewLog {
    pub tracked_problem_id: i32,
    pub quality_rating: i32,
    pub reviewed_at: NaiveDateTime,
}

/// Request payload for tracking a new problem
#[derive(Deserialize, Validate)]
pub struct AddProblemRequest {
    pub workspace_id: i32,
    #[validate(length(min = 1, message = "Problem reference must not be empty"))]
    pub problem_ref: String,
}

/// Request payload for submitting a review
#[derive(Deserialize, Validate)]
pub struct ReviewRequest {
    #[validate(range(min = 0, max = 3, message = "Score must be between 0 and 3"))]
    pub score: i32,
}

/// A workspace's tracked problems split at the current instant.
#[derive(Debug, Serialize)]
pub struct ProblemBoard {
    pub due: Vec<TrackedProblem>,
    pub upcoming: Vec<TrackedProblem>,
}
