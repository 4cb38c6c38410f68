pub mod session;

pub use session::{get_current_user_id, set_user_session};
