/// Request extractors
pub mod user;

pub use user::{RemoteUser, USER_HEADER};
