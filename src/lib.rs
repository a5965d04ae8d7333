pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod policies;
pub mod services;
pub mod store;
pub mod tasks;

pub use config::Config;
pub use error::{AppError, AppResult};
