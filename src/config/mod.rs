/// Bot settings from config.toml
pub mod bot;

/// Database connection parameters, store timing and table creation
pub mod database;

/// Dev/prod environment selection
pub mod environment;

pub use bot::{BotConfig, load_default_config};
pub use database::{DatabaseConfig, StoreSettings, create_tables};
pub use environment::Environment;
