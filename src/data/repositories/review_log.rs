use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::data::models::{NewReviewLog, ReviewLog};
use crate::schema::review_logs;

/// Append-only. Nothing here updates or deletes rows.
pub struct ReviewLogRepository;

impl ReviewLogRepository {
    pub fn append(
        conn: &mut SqliteConnection,
        tracked_problem_id: i32,
        quality_rating: i32,
        reviewed_at: NaiveDateTime,
    ) -> Result<usize, diesel::result::Error> {
        diesel::insert_into(review_logs::table)
            .values(&NewReviewLog {
                tracked_problem_id,
                quality_rating,
                reviewed_at,
            })
            .execute(conn)
    }

    pub fn list_for_problem(
        conn: &mut SqliteConnection,
        tracked_problem_id: i32,
    ) -> Result<Vec<ReviewLog>, diesel::result::Error> {
        review_logs::table
            .filter(review_logs::tracked_problem_id.eq(tracked_problem_id))
            .order_by(review_logs::reviewed_at.asc())
            .select(ReviewLog::as_select())
            .load(conn)
    }
}
