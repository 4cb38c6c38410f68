use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::data::models::{NewTrackedProblem, TrackedProblem};
use crate::data::repositories::last_insert_rowid;
use crate::schema::tracked_problems;

/// Initial ease factor per SM-2; retained for future tuning.
pub const INITIAL_EASE_FACTOR: f64 = 2.5;

pub struct TrackedProblemRepository;

impl TrackedProblemRepository {
    /// Inserts a fresh scheduling record, due immediately. A duplicate
    /// (workspace, problem) pair surfaces as a unique violation.
    pub fn insert(
        conn: &mut SqliteConnection,
        workspace_id: i32,
        problem_ref: &str,
        next_review_date: NaiveDateTime,
    ) -> Result<TrackedProblem, diesel::result::Error> {
        diesel::insert_into(tracked_problems::table)
            .values(&NewTrackedProblem {
                workspace_id,
                problem_ref,
                repetitions_count: 0,
                ease_factor: INITIAL_EASE_FACTOR,
                interval_days: 0,
                next_review_date,
            })
            .execute(conn)?;

        let tracked_problem_id = last_insert_rowid(conn)?;
        tracked_problems::table
            .filter(tracked_problems::tracked_problem_id.eq(tracked_problem_id))
            .select(TrackedProblem::as_select())
            .first(conn)
    }

    pub fn find(
        conn: &mut SqliteConnection,
        tracked_problem_id: i32,
    ) -> Result<Option<TrackedProblem>, diesel::result::Error> {
        tracked_problems::table
            .filter(tracked_problems::tracked_problem_id.eq(tracked_problem_id))
            .select(TrackedProblem::as_select())
            .first(conn)
            .optional()
    }

    /// All of a workspace's records, soonest due first.
    pub fn list_for_workspace(
        conn: &mut SqliteConnection,
        workspace_id: i32,
    ) -> Result<Vec<TrackedProblem>, diesel::result::Error> {
        tracked_problems::table
            .filter(tracked_problems::workspace_id.eq(workspace_id))
            .order_by(tracked_problems::next_review_date.asc())
            .select(TrackedProblem::as_select())
            .load(conn)
    }

    /// Writes the post-review scheduling state computed by the scheduler.
    pub fn update_schedule(
        conn: &mut SqliteConnection,
        tracked_problem_id: i32,
        repetitions_count: i32,
        interval_days: i32,
        ease_factor: f64,
        next_review_date: NaiveDateTime,
        last_reviewed_at: NaiveDateTime,
    ) -> Result<usize, diesel::result::Error> {
        diesel::update(
            tracked_problems::table
                .filter(tracked_problems::tracked_problem_id.eq(tracked_problem_id)),
        )
        .set((
            tracked_problems::repetitions_count.eq(repetitions_count),
            tracked_problems::interval_days.eq(interval_days),
            tracked_problems::ease_factor.eq(ease_factor),
            tracked_problems::next_review_date.eq(next_review_date),
            tracked_problems::last_reviewed_at.eq(last_reviewed_at),
        ))
        .execute(conn)
    }
}
