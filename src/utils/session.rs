use tower_sessions::Session;

use crate::data::models::ServiceError;

pub async fn set_user_session(
    session: &Session,
    user_id: i32,
    email: &str,
) -> Result<(), ServiceError> {
    session.insert("user_id", user_id).await?;
    session.insert("user_email", email).await?;
    Ok(())
}

/// The authenticated caller, as the identity layer recorded it. Trusted
/// as given; never re-derived.
pub async fn get_current_user_id(session: &Session) -> Option<i32> {
    match session.get::<i32>("user_id").await {
        Ok(user_id) => user_id,
        Err(e) => {
            log::error!("Failed to get user_id from session: {}", e);
            None
        }
    }
}
