pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod http;
pub mod providers;
pub mod repositories;
