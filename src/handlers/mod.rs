pub mod auth;
pub mod requisitions;
pub mod users;
