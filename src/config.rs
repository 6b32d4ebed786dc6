//! Configuration Management
//!
//! Configuration values are read from environment variables with sensible
//! defaults.
//!
//! ## Configuration Variables
//!
//! - `DATABASE_URL`: Path to the SQLite database file (default: `ambassador-hub.db`)
//! - `BIND_ADDRESS`: HTTP server bind address (default: `0.0.0.0:3000`)

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "ambassador-hub.db".to_string(),
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_address: env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
        }
    }
}
