pub mod config;
pub mod database;
pub mod handlers;
pub mod models;
pub mod openapi;
pub mod services;
pub mod utils;

pub use database::Database;
