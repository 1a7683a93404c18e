use std::str::FromStr;

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::{Config, NoTls};

use crate::database_error::DatabaseError;

use super::database_client::DatabaseClient;

/// A shared pool of physical connections to one database target. Creating the
/// pool performs no I/O; clients connect lazily on first checkout.
pub struct DatabasePool {
    pool: Pool,
}

impl DatabasePool {
    pub fn from_url(url: &str, pool_size: usize) -> Result<Self, DatabaseError> {
        let config = Config::from_str(url).map_err(|e| {
            DatabaseError::Delegate(e)
                .with_context("Failed to parse PostgreSQL connection string".into())
        })?;

        Self::from_config(config, pool_size)
    }

    pub fn from_config(config: Config, pool_size: usize) -> Result<Self, DatabaseError> {
        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let manager = Manager::from_config(config, NoTls, manager_config);

        let pool = Pool::builder(manager)
            .max_size(pool_size)
            .build()
            .map_err(|e| DatabaseError::Config(format!("Failed to create connection pool: {e}")))?;

        Ok(Self { pool })
    }

    pub async fn get_client(&self) -> Result<DatabaseClient, DatabaseError> {
        Ok(DatabaseClient::Pooled(self.pool.get().await?))
    }
}
