pub mod auth;
pub mod chat;
pub mod companies;
pub mod error;
pub mod matchmaking;
pub mod middleware;
pub mod users;
pub mod views;
