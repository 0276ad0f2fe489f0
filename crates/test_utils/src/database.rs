//! Database Test Utilities
//!
//! Testcontainer management for integration tests against real PostgreSQL.
//! The servicing core uses two stores, so the harness can start either a
//! single container (primary only) or a pair (primary + collection).

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

use infra_db::DualPools;

const POSTGRES_IMAGE: &str = "postgres";
const POSTGRES_TAG: &str = "16-alpine";
const POSTGRES_USER: &str = "test_user";
const POSTGRES_PASSWORD: &str = "test_password";
const POSTGRES_DB: &str = "servicing_test";

/// Connection settings of one started test container
#[derive(Debug, Clone)]
pub struct TestDatabaseConfig {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
}

impl TestDatabaseConfig {
    /// Creates the database connection URL
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

/// A wrapper around one PostgreSQL test container
pub struct TestDatabase {
    _container: ContainerAsync<GenericImage>,
    pub config: TestDatabaseConfig,
    pub pool: PgPool,
}

impl TestDatabase {
    /// Starts a PostgreSQL container and applies the primary-store schema
    pub async fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Self::with_migrations("./migrations").await
    }

    /// Starts a PostgreSQL container and applies the given migrations
    pub async fn with_migrations(
        migrations_path: &str,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let container = GenericImage::new(POSTGRES_IMAGE, POSTGRES_TAG)
            .with_exposed_port(5432.tcp())
            .with_wait_for(WaitFor::message_on_stderr(
                "database system is ready to accept connections",
            ))
            .with_env_var("POSTGRES_USER", POSTGRES_USER)
            .with_env_var("POSTGRES_PASSWORD", POSTGRES_PASSWORD)
            .with_env_var("POSTGRES_DB", POSTGRES_DB)
            .start()
            .await?;

        let port = container.get_host_port_ipv4(5432).await?;
        let host = container.get_host().await?.to_string();

        let config = TestDatabaseConfig {
            user: POSTGRES_USER.to_string(),
            password: POSTGRES_PASSWORD.to_string(),
            database: POSTGRES_DB.to_string(),
            host,
            port,
        };

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&config.connection_url())
            .await?;

        let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(migrations_path)).await?;
        migrator.run(&pool).await?;

        Ok(Self {
            _container: container,
            config,
            pool,
        })
    }
}

/// Both stores of the servicing core, each in its own container
pub struct TestDualStores {
    pub primary: TestDatabase,
    pub collection: TestDatabase,
}

impl TestDualStores {
    /// Starts primary and collection containers with their schemas
    ///
    /// Paths are relative to the crate under test; the defaults match
    /// `infra_db`'s layout.
    pub async fn new(
        primary_migrations: &str,
        collection_migrations: &str,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let primary = TestDatabase::with_migrations(primary_migrations).await?;
        let collection = TestDatabase::with_migrations(collection_migrations).await?;
        Ok(Self {
            primary,
            collection,
        })
    }

    /// The dual pools the repositories expect
    pub fn pools(&self) -> DualPools {
        DualPools {
            primary: self.primary.pool.clone(),
            collection: self.collection.pool.clone(),
        }
    }
}
