pub mod config;
pub mod database;
pub mod logger;
pub mod persistence;
