use diesel::prelude::*;

use crate::data::models::User;
use crate::schema::users;

pub struct UserRepository;

impl UserRepository {
    pub fn find_by_email(
        conn: &mut SqliteConnection,
        email: &str,
    ) -> Result<Option<User>, diesel::result::Error> {
        users::table
            .filter(users::email.eq(email))
            .select(User::as_select())
            .first::<User>(conn)
            .optional()
    }

    pub fn find_by_id(
        conn: &mut SqliteConnection,
        user_id: i32,
    ) -> Result<Option<User>, diesel::result::Error> {
        users::table
            .filter(users::user_id.eq(user_id))
            .select(User::as_select())
            .first::<User>(conn)
            .optional()
    }
}
