mod id;
mod types;

pub use id::new_session_id;
pub use types::{DefaultSession, Session, SessionBuilder, SessionMap, default_builder};
