use chrono::Utc;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::data::models::{ProblemBoard, ReviewLog, ServiceError, TrackedProblem};
use crate::data::repositories::{
    ReviewLogRepository, TrackedProblemRepository, WorkspaceRepository,
};
use crate::features::access::{Action, CapabilityChecker};
use crate::features::scheduling::scheduler::{due_date_from, schedule, ScheduleState, Score};
use crate::DbPool;

/// Orchestrates review submissions: capability gate, load, pure
/// scheduling, transactional persist plus review-log append.
pub struct SchedulingService {
    pool: DbPool,
    checker: CapabilityChecker,
}

impl SchedulingService {
    pub fn new(pool: DbPool, checker: CapabilityChecker) -> Self {
        SchedulingService { pool, checker }
    }

    pub async fn add_tracked_problem(
        &self,
        caller_id: i32,
        workspace_id: i32,
        problem_ref: &str,
    ) -> Result<TrackedProblem, ServiceError> {
        self.checker
            .require(caller_id, Action::Create, workspace_id)
            .await?;

        let mut conn = self.pool.get()?;
        WorkspaceRepository::find(&mut conn, workspace_id)?
            .ok_or(ServiceError::NotFound("Workspace"))?;

        // Interval 0: a freshly tracked problem is due immediately.
        let due = due_date_from(Utc::now(), 0);
        match TrackedProblemRepository::insert(&mut conn, workspace_id, problem_ref, due) {
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => Err(
                ServiceError::Conflict("Problem is already being tracked".into()),
            ),
            other => Ok(other?),
        }
    }

    pub async fn submit_review(
        &self,
        caller_id: i32,
        tracked_problem_id: i32,
        score: Score,
    ) -> Result<TrackedProblem, ServiceError> {
        // The owning workspace comes from the item itself, never from the
        // caller, so a mismatched pair cannot bypass the gate.
        let workspace_id = {
            let mut conn = self.pool.get()?;
            TrackedProblemRepository::find(&mut conn, tracked_problem_id)?
                .ok_or(ServiceError::NotFound("Tracked problem"))?
                .workspace_id
        };
        self.checker
            .require(caller_id, Action::Review, workspace_id)
            .await?;

        let now = Utc::now();
        let mut conn = self.pool.get()?;
        let updated = conn.transaction::<TrackedProblem, DieselError, _>(|conn| {
            // Re-read inside the transaction: a concurrent submission must
            // observe the other writer's repetition count, not clobber it.
            let item = TrackedProblemRepository::find(conn, tracked_problem_id)?
                .ok_or(DieselError::NotFound)?;

            let outcome = schedule(
                &ScheduleState {
                    repetitions_count: item.repetitions_count,
                    interval_days: item.interval_days,
                    ease_factor: item.ease_factor,
                },
                score,
            );

            TrackedProblemRepository::update_schedule(
                conn,
                tracked_problem_id,
                outcome.next_repetitions_count,
                outcome.next_interval_days,
                outcome.next_ease_factor,
                due_date_from(now, outcome.next_interval_days),
                now.naive_utc(),
            )?;
            ReviewLogRepository::append(
                conn,
                tracked_problem_id,
                score.rating(),
                now.naive_utc(),
            )?;

            TrackedProblemRepository::find(conn, tracked_problem_id)?
                .ok_or(DieselError::NotFound)
        })?;

        Ok(updated)
    }

    /// A workspace's records split into due and upcoming at now. "Due"
    /// is purely a read-time question; nothing pushes reviews.
    pub async fn list_tracked_problems(
        &self,
        caller_id: i32,
        workspace_id: i32,
    ) -> Result<ProblemBoard, ServiceError> {
        self.checker
            .require(caller_id, Action::Read, workspace_id)
            .await?;

        let mut conn = self.pool.get()?;
        WorkspaceRepository::find(&mut conn, workspace_id)?
            .ok_or(ServiceError::NotFound("Workspace"))?;

        let now = Utc::now().naive_utc();
        let (due, upcoming) = TrackedProblemRepository::list_for_workspace(&mut conn, workspace_id)?
            .into_iter()
            .partition(|item| item.next_review_date <= now);
        Ok(ProblemBoard { due, upcoming })
    }

    /// The immutable review trail of one tracked problem.
    pub async fn review_history(
        &self,
        caller_id: i32,
        tracked_problem_id: i32,
    ) -> Result<Vec<ReviewLog>, ServiceError> {
        let workspace_id = {
            let mut conn = self.pool.get()?;
            TrackedProblemRepository::find(&mut conn, tracked_problem_id)?
                .ok_or(ServiceError::NotFound("Tracked problem"))?
                .workspace_id
        };
        self.checker
            .require(caller_id, Action::Read, workspace_id)
            .await?;

        let mut conn = self.pool.get()?;
        Ok(ReviewLogRepository::list_for_problem(&mut conn, tracked_problem_id)?)
    }
}
