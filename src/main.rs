use cogbot::bot;
use cogbot::config::{self, DatabaseConfig, Environment, StoreSettings};
use cogbot::errors::Result;
use cogbot::store::{DataStore, MySqlConnector};
use std::{env, sync::Arc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Pick dev/prod from the first argument and load its .env file
    let environment = Environment::from_args(env::args());
    environment.load_env_file();
    info!("{} mode launched, running...", environment);

    // 3. Load configuration
    let bot_config = config::load_default_config()?;
    let db_config = DatabaseConfig::from_env()?;
    let settings = StoreSettings::from_env()?;

    // 4. Connect the data store (blocks until the database is reachable)
    let store = DataStore::new(MySqlConnector::new(db_config), settings)?;
    store
        .connect()
        .await
        .inspect_err(|e| error!("Failed to connect to the database: {}", e))?;

    // 5. Run the bot. TOKEN is read directly before use, not stored in config
    let token = env::var("TOKEN").inspect_err(|e| error!("TOKEN not found: {}", e))?;
    let outcome = bot::run_bot(token, Arc::new(bot_config), store.clone()).await;

    // 6. Shut down the keep-alive task and release the connection
    store.close().await?;
    info!("Bot stopped.");
    outcome
}
