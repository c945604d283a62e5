pub mod auth;
pub mod content;
pub mod route;
pub mod speech;
pub mod tour;
pub mod user;
