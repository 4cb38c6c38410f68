use diesel::{Queryable, Selectable};
use serde::Serialize;

use crate::schema::users;

/// Local mirror of an identity-provider account. Credentials live with
/// the provider; this row only supports email lookup and display.
#[derive(Debug, Queryable, Selectable, Serialize)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
    pub user_id: i32,
    pub email: String,
    pub display_name: String,
}
