use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use shared::domain::{Counter, CounterAction, CounterId};
use storage::{CounterStore, Storage, StoreError};

/// In-memory storage whose writes can be made to fail on demand, the way a
/// closed pool fails them.
#[derive(Clone)]
pub(crate) struct FlakyStore {
    inner: Storage,
    failing: Arc<AtomicBool>,
}

impl FlakyStore {
    pub(crate) async fn new() -> Self {
        Self {
            inner: Storage::new("sqlite::memory:").await.expect("db"),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn failing_switch(&self) -> Arc<AtomicBool> {
        self.failing.clone()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

#[async_trait]
impl CounterStore for FlakyStore {
    async fn get_by_name(&self, name: &str) -> Result<Option<Counter>, StoreError> {
        self.inner.get_by_name(name).await
    }

    async fn get_by_id(&self, id: CounterId) -> Result<Option<Counter>, StoreError> {
        self.inner.get_by_id(id).await
    }

    async fn create(&self, name: &str, initial_value: i64) -> Result<Counter, StoreError> {
        self.inner.create(name, initial_value).await
    }

    async fn update_value(
        &self,
        id: CounterId,
        new_value: i64,
    ) -> Result<Option<Counter>, StoreError> {
        self.check()?;
        self.inner.update_value(id, new_value).await
    }

    async fn get_or_create(&self, name: &str) -> Result<Counter, StoreError> {
        self.inner.get_or_create(name).await
    }

    async fn write_action(
        &self,
        id: CounterId,
        action: CounterAction,
    ) -> Result<Option<Counter>, StoreError> {
        self.check()?;
        self.inner.write_action(id, action).await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.check()?;
        self.inner.health_check().await
    }
}
