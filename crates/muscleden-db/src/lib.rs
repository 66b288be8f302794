//! PostgreSQL persistence for generated fitness plans.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
