use std::sync::Arc;

use shared::{
    domain::{
        validate_counter_name, Counter, CounterAction, CounterCreate, CounterId, CounterUpdate,
    },
    error::{ApiError, ErrorCode},
};
use storage::{CounterStore, StoreError};
use tracing::{info, warn};

mod page;
#[cfg(test)]
mod test_support;

pub use page::{CounterPage, PageStatus};

#[derive(Clone)]
pub struct ApiContext {
    pub store: Arc<dyn CounterStore>,
    /// Counter shown on the page.
    pub counter_name: String,
}

impl ApiContext {
    pub fn new(store: impl CounterStore + 'static, counter_name: impl Into<String>) -> Self {
        Self {
            store: Arc::new(store),
            counter_name: counter_name.into(),
        }
    }
}

pub async fn get_counter(ctx: &ApiContext, name: &str) -> Result<Counter, ApiError> {
    ctx.store
        .get_by_name(name)
        .await
        .map_err(store_error)?
        .ok_or_else(|| ApiError::not_found(format!("no counter named '{name}'")))
}

pub async fn create_counter(ctx: &ApiContext, req: CounterCreate) -> Result<Counter, ApiError> {
    validate_counter_name(&req.name)
        .map_err(|e| ApiError::new(ErrorCode::Validation, e.to_string()))?;
    let counter = ctx
        .store
        .create(&req.name, req.value)
        .await
        .map_err(store_error)?;
    info!(
        counter_id = %counter.id,
        counter = %counter.name,
        value = counter.value,
        "counter created"
    );
    Ok(counter)
}

/// Applies a partial update. An update without a value leaves the row as is.
pub async fn update_counter(
    ctx: &ApiContext,
    id: CounterId,
    update: CounterUpdate,
) -> Result<Counter, ApiError> {
    let updated = match update.value {
        Some(value) => ctx.store.update_value(id, value).await,
        None => ctx.store.get_by_id(id).await,
    }
    .map_err(store_error)?;
    updated.ok_or_else(|| ApiError::not_found(format!("no counter with id {id}")))
}

pub async fn apply_action(
    ctx: &ApiContext,
    name: &str,
    action: CounterAction,
) -> Result<Counter, ApiError> {
    ctx.store.apply(name, action).await.map_err(|err| {
        warn!(counter = name, %action, error = %err, "counter action failed");
        store_error(err)
    })
}

pub async fn check_health(ctx: &ApiContext) -> Result<(), ApiError> {
    ctx.store.health_check().await.map_err(store_error)
}

fn store_error(err: StoreError) -> ApiError {
    let code = match &err {
        _ if err.is_unique_violation() => ErrorCode::Conflict,
        StoreError::InvalidName(_) => ErrorCode::Validation,
        StoreError::Vanished { .. } => ErrorCode::NotFound,
        StoreError::OutOfRange { .. } => ErrorCode::Conflict,
        StoreError::Database(_) => ErrorCode::Internal,
    };
    ApiError::new(code, err.to_string())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
