pub mod auth;
pub mod interactions;
pub mod search;
