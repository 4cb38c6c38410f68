pub mod review_log;
pub mod share;
pub mod tracked_problem;
pub mod user;
pub mod workspace;

pub use review_log::ReviewLogRepository;
pub use share::ShareRepository;
pub use tracked_problem::TrackedProblemRepository;
pub use user::UserRepository;
pub use workspace::WorkspaceRepository;

use diesel::prelude::*;
use diesel::sql_types::Integer;

/// Rowid of the most recent insert on this connection.
pub(crate) fn last_insert_rowid(conn: &mut SqliteConnection) -> QueryResult<i32> {
    diesel::select(diesel::dsl::sql::<Integer>("last_insert_rowid()")).get_result::<i32>(conn)
}
