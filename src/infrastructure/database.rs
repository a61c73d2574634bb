//! Pooled SQLite connection with a change feed

use crate::config::AppConfig;
use crate::infrastructure::entities::StoreChange;
use di::{Ref, inject, injectable};
use log::debug;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::ops::Deref;
use std::sync::Mutex;
use tokio::sync::broadcast;

const CHANGE_FEED_CAPACITY: usize = 256;

static TEST_POOL: Mutex<Option<SqlitePool>> = Mutex::new(None);

pub struct DatabaseConnection {
    connection: SqlitePool,
    changes: broadcast::Sender<StoreChange>,
}

#[injectable]
impl DatabaseConnection {
    #[inject]
    pub fn create(config: Ref<AppConfig>) -> DatabaseConnection {
        if let Some(pool) = Self::test_pool() {
            debug!("using installed test pool");
            return Self::from_pool(pool);
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_lazy(&config.database_url)
            .expect("Cannot connect to database");

        Self::from_pool(pool)
    }
}

impl DatabaseConnection {
    pub fn from_pool(pool: SqlitePool) -> DatabaseConnection {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        DatabaseConnection {
            connection: pool,
            changes,
        }
    }

    /// Applies the bundled migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!().run(&self.connection).await
    }

    pub fn changes(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    pub fn publish(&self, change: StoreChange) {
        // No receivers is fine, nobody is watching yet.
        let _ = self.changes.send(change);
    }

    pub fn set_test_pool(pool: SqlitePool) {
        *TEST_POOL.lock().unwrap_or_else(|p| p.into_inner()) = Some(pool);
    }

    pub fn clear_test_pool() {
        *TEST_POOL.lock().unwrap_or_else(|p| p.into_inner()) = None;
    }

    fn test_pool() -> Option<SqlitePool> {
        TEST_POOL.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl Deref for DatabaseConnection {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.connection
    }
}
