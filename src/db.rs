use crate::config::{AppConfig, QueryDeadlines};
use crate::errors::ServiceError;
use crate::tracing::with_timing;
use metrics::{counter, gauge, histogram};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, EntityTrait,
    QuerySelect, Select,
};
use sea_orm_migration::MigratorTrait;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Idle timeout duration
    pub idle_timeout: Duration,
    /// Acquire connection timeout
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

/// Establishes a connection pool to the database with custom configuration
///
/// # Errors
/// Returns a `ServiceError::DatabaseError` if the connection cannot be established
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    debug!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Configuring database connection"
    );

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    gauge!("precast_db.max_connections", config.max_connections as f64);

    let db_pool = Database::connect(opt).await.map_err(|e| {
        error!(error = %e, "Database connection establishment failed");
        ServiceError::DatabaseError(e)
    })?;

    info!(
        backend = ?db_pool.get_database_backend(),
        "Database connection pool established"
    );
    Ok(db_pool)
}

/// Establish DB pool using AppConfig tuning
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    let db_cfg: DbConfig = cfg.into();
    establish_connection_with_config(&db_cfg).await
}

/// Runs the embedded migrations
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    info!("Running database migrations");
    let start = Instant::now();

    let result = crate::migrator::Migrator::up(pool, None)
        .await
        .map_err(ServiceError::DatabaseError);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => info!("Database migrations completed in {:?}", elapsed),
        Err(e) => error!("Database migrations failed after {:?}: {}", elapsed, e),
    }

    result
}

/// Checks if the database connection is active
pub async fn check_connection(pool: &DbPool) -> Result<(), ServiceError> {
    let start = Instant::now();
    let result = pool.ping().await.map_err(ServiceError::DatabaseError);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => {
            gauge!(
                "precast_db.connection_latency_ms",
                elapsed.as_millis() as f64
            );
        }
        Err(e) => {
            error!("Database connection check failed after {:?}: {}", elapsed, e);
            counter!("precast_db.connection_failures", 1);
        }
    }

    result
}

/// Races `fut` against `limit`. On expiry the future is dropped, which rolls
/// back any transaction it owned, and `Timeout` is returned.
pub async fn with_deadline<T, F>(
    limit: Duration,
    operation: &'static str,
    fut: F,
) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    let start = Instant::now();
    let outcome = tokio::time::timeout(limit, fut).await;
    histogram!(
        "precast_db.operation.duration_ms",
        start.elapsed().as_millis() as f64,
        "operation" => operation
    );

    match outcome {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, limit_ms = limit.as_millis() as u64, "deadline exceeded");
            counter!("precast_db.deadline_exceeded", 1, "operation" => operation);
            Err(ServiceError::Timeout(format!(
                "{} exceeded {}ms",
                operation,
                limit.as_millis()
            )))
        }
    }
}

/// The two deadline tiers bound to a helper so services can say
/// `deadlines.run(..)` instead of passing durations around.
#[derive(Clone, Copy, Debug, Default)]
pub struct Deadlines(pub QueryDeadlines);

impl Deadlines {
    pub async fn run<T, F>(&self, operation: &'static str, fut: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        with_deadline(self.0.default, operation, fut).await
    }

    /// Default tier for multi-step writes; also logs and records the
    /// duration of the whole operation.
    pub async fn write<T, F>(&self, operation: &'static str, fut: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        with_timing(operation, || with_deadline(self.0.default, operation, fut)).await
    }

    pub async fn run_fast<T, F>(&self, operation: &'static str, fut: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        with_deadline(self.0.fast, operation, fut).await
    }
}

impl From<QueryDeadlines> for Deadlines {
    fn from(value: QueryDeadlines) -> Self {
        Deadlines(value)
    }
}

/// Adds `FOR UPDATE` when the backend supports row locks. SQLite serialises
/// writers on its own and rejects the clause.
pub fn for_update<E, C>(select: Select<E>, conn: &C) -> Select<E>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    match conn.get_database_backend() {
        DbBackend::Postgres | DbBackend::MySql => select.lock_exclusive(),
        DbBackend::Sqlite => select,
    }
}

/// Maps a missing row to `NotFound` for the given entity label.
pub fn require<T>(row: Option<T>, entity: &str, id: impl std::fmt::Display) -> Result<T, ServiceError> {
    row.ok_or_else(|| ServiceError::not_found(entity, id))
}

/// Wraps an arbitrary driver error raised outside sea-orm's own calls.
pub fn custom_db_error(message: impl Into<String>) -> ServiceError {
    ServiceError::DatabaseError(DbErr::Custom(message.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deadline_expiry_maps_to_timeout() {
        let res: Result<(), ServiceError> = with_deadline(
            Duration::from_millis(10),
            "slow_query",
            async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(())
            },
        )
        .await;
        assert!(matches!(res, Err(ServiceError::Timeout(_))));
    }

    #[tokio::test]
    async fn inner_errors_pass_through_the_deadline() {
        let res: Result<(), ServiceError> =
            with_deadline(Duration::from_secs(1), "q", async {
                Err(ServiceError::NotFound("x".into()))
            })
            .await;
        assert!(matches!(res, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn timed_writes_keep_the_deadline() {
        let deadlines = Deadlines(QueryDeadlines {
            default: Duration::from_millis(10),
            fast: Duration::from_millis(10),
        });
        let done = deadlines.write("quick_write", async { Ok(7) }).await;
        assert_eq!(done.unwrap(), 7);

        let late: Result<(), ServiceError> = deadlines
            .write("slow_write", async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(())
            })
            .await;
        assert!(matches!(late, Err(ServiceError::Timeout(_))));
    }

    #[test]
    fn require_reports_entity_and_id() {
        let err = require::<u8>(None, "element", 9).unwrap_err();
        assert_eq!(err.to_string(), "Not found: element 9 not found");
    }

    #[tokio::test]
    async fn sqlite_memory_pool_connects_and_pings() {
        let cfg = DbConfig {
            url: "sqlite::memory:".into(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = establish_connection_with_config(&cfg).await.unwrap();
        assert!(check_connection(&pool).await.is_ok());
    }
}
