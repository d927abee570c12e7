pub mod app_config;
pub mod database;

pub use app_config::{AppConfig, ChatConfig, ConfigError};
pub use database::establish_connection;
