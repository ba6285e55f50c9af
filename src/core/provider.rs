//! Abstractions over where rate tables come from

use crate::core::error::RateError;
use crate::core::rate::RateTable;
use async_trait::async_trait;
use std::sync::Arc;

/// Supplies a full USD-anchored rate table.
#[async_trait]
pub trait RateTableProvider: Send + Sync {
    async fn fetch_rates(&self) -> Result<RateTable, RateError>;
}

/// Liveness probe for the rate backend.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn health_check(&self) -> Result<(), RateError>;
}

#[async_trait]
impl<T: RateTableProvider + ?Sized> RateTableProvider for Arc<T> {
    async fn fetch_rates(&self) -> Result<RateTable, RateError> {
        (**self).fetch_rates().await
    }
}

#[async_trait]
impl<T: HealthCheck + ?Sized> HealthCheck for Arc<T> {
    async fn health_check(&self) -> Result<(), RateError> {
        (**self).health_check().await
    }
}
