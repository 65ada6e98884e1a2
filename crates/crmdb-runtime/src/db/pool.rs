use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crmdb_core::config::DatabaseConfig;
use crmdb_core::error::{CrmError, Result};

/// Database connection wrapper providing connection pooling.
#[derive(Clone)]
pub struct Database {
    pool: Arc<PgPool>,
}

impl Database {
    /// Connect using the given configuration.
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.pool_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| CrmError::StoreUnavailable(format!("Failed to connect: {}", e)))?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    pub fn primary(&self) -> &PgPool {
        &self.pool
    }

    /// Close all connections gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_config_unreachable_is_unavailable() {
        let config = DatabaseConfig {
            url: "postgres://crmdb@127.0.0.1:1/crm".to_string(),
            pool_timeout_secs: 1,
            ..Default::default()
        };

        let result = Database::from_config(&config).await;
        assert!(matches!(result, Err(CrmError::StoreUnavailable(_))));
    }
}
