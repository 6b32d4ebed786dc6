pub mod api;
pub mod config;
pub mod database;
pub mod models;

pub use api::{routes, AppState};
pub use config::Config;
pub use database::Database;
