//! Applies, rolls back or reports the embedded schema migrations.
//!
//! Usage: `migration [up|down|status|fresh]`, database taken from the same
//! configuration as the server.

use anyhow::{bail, Context};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use precast_api::{config, db, migrator::Migrator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    let command = std::env::args().nth(1).unwrap_or_else(|| "up".to_string());
    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to the database")?;

    match command.as_str() {
        "up" => {
            Migrator::up(&pool, None).await?;
            info!("migrations applied");
        }
        "down" => {
            Migrator::down(&pool, Some(1)).await?;
            info!("last migration rolled back");
        }
        "fresh" => {
            Migrator::fresh(&pool).await?;
            info!("schema recreated");
        }
        "status" => Migrator::status(&pool).await?,
        other => bail!("unknown command '{}', expected up, down, status or fresh", other),
    }
    Ok(())
}
