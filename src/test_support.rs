use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};

use crate::data::repositories::last_insert_rowid;
use crate::schema::users;
use crate::DbPool;

/// A pooled throwaway SQLite database carrying the real schema. The
/// temp dir must stay alive as long as the pool does.
pub(crate) struct TestDb {
    pub pool: DbPool,
    _dir: tempfile::TempDir,
}

pub(crate) fn test_db() -> TestDb {
    let dir = tempfile::tempdir().expect("create temp dir");
    let db_path = dir.path().join("codegrind.db");

    let manager = ConnectionManager::<SqliteConnection>::new(db_path.to_string_lossy());
    let pool = Pool::builder()
        .max_size(2)
        .build(manager)
        .expect("build test pool");

    pool.get()
        .unwrap()
        .batch_execute(include_str!(
            "../migrations/2026-07-14-000000_create_core_tables/up.sql"
        ))
        .expect("apply schema");

    TestDb { pool, _dir: dir }
}

/// Provisions an identity-provider user row directly, the way the
/// provider's sync would.
pub(crate) fn insert_user(pool: &DbPool, email: &str) -> i32 {
    let mut conn = pool.get().unwrap();
    let display_name = email.split('@').next().unwrap_or(email);

    diesel::insert_into(users::table)
        .values((users::email.eq(email), users::display_name.eq(display_name)))
        .execute(&mut conn)
        .unwrap();
    last_insert_rowid(&mut conn).unwrap()
}
