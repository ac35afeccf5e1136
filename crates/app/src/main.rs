use std::{sync::Arc, time::Duration};

use migration::{Migrator, MigratorTrait};
use settings::Database;
use telegram_bot::{MonitorSettings, UserId};
use tokio::sync::watch;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "expense_tracker={level},telegram_bot={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let timezone = settings.app.timezone()?;
    let Some(telegram) = settings.telegram else {
        return Err("missing [telegram] settings".into());
    };
    let currencies = telegram.currencies()?;

    let db = parse_database(&settings.database).await?;
    let engine = engine::Engine::builder()
        .database(db)
        .timezone(timezone)
        .build();

    let bot = telegram_bot::Bot::builder()
        .token(&telegram.token)
        .allowed_users(telegram.allowed_users.into_iter().map(UserId).collect())
        .currencies(currencies)
        .store(Arc::new(engine))
        .build()?;
    let monitor = bot.budget_monitor(MonitorSettings {
        interval: Duration::from_secs(settings.monitor.interval_secs),
        threshold_percent: settings.monitor.threshold_percent,
        timezone,
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = tokio::task::JoinSet::new();
    tasks.spawn(async move { bot.run().await });
    tasks.spawn(async move { monitor.run(shutdown_rx).await });

    // Whichever task ends first takes the other one down with it.
    while let Some(joined) = tasks.join_next().await {
        if let Err(err) = joined {
            tracing::error!("task failed: {err}");
        }
        let _ = shutdown_tx.send(true);
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
