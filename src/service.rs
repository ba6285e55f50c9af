//! Owns the state a conversion view needs and feeds it to the resolver.

use crate::core::config::AppConfig;
use crate::core::connectivity::{ConnectivityMonitor, ConnectivityState};
use crate::core::error::RateError;
use crate::core::rate::{ConversionRequest, ConversionResult, RateTable};
use crate::core::resolver::{RateResolver, TableResolution};
use crate::providers::backend::BackendClient;
use crate::store::SnapshotStore;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

pub struct ExchangeService {
    backend: Arc<BackendClient>,
    resolver: RateResolver,
    snapshots: Option<SnapshotStore>,
    monitor: ConnectivityMonitor,
}

impl ExchangeService {
    /// Starts the service, including its connectivity monitor. Must be called
    /// from within a tokio runtime.
    pub fn new(
        backend: Arc<BackendClient>,
        fallback: RateTable,
        snapshots: Option<SnapshotStore>,
        health_check_interval: Duration,
    ) -> Self {
        let monitor = ConnectivityMonitor::start(backend.clone(), health_check_interval);
        let resolver = RateResolver::new(backend.clone(), fallback);
        Self {
            backend,
            resolver,
            snapshots,
            monitor,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let backend = Arc::new(BackendClient::new(
            &config.api.base_url,
            Duration::from_secs(config.api.timeout_secs),
        )?);
        let snapshots = SnapshotStore::from_config(config)?;
        Ok(Self::new(
            backend,
            config.fallback_table(),
            snapshots,
            config.polling.health_check_interval(),
        ))
    }

    pub fn backend(&self) -> &BackendClient {
        &self.backend
    }

    pub fn connectivity(&self) -> ConnectivityState {
        self.monitor.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.monitor.subscribe()
    }

    /// Re-runs the health check now instead of waiting for the next interval.
    pub fn retry_connection(&self) {
        self.monitor.retry();
    }

    async fn stored_table(&self) -> Option<RateTable> {
        match &self.snapshots {
            Some(store) => store.latest().await.map(|snapshot| snapshot.table),
            None => None,
        }
    }

    async fn record_live(&self, table: Option<&RateTable>, failure: Option<&RateError>) {
        if let (Some(table), Some(store)) = (table, &self.snapshots) {
            debug!("Saving live rate table as snapshot");
            store.save(table).await;
        }
        if failure.is_some() {
            self.monitor.report_failure();
        }
    }

    /// Converts locally against the best available rate table. Only
    /// `InvalidAmount`, or a pair no table can resolve, is returned as an error.
    pub async fn convert(&self, request: &ConversionRequest) -> Result<ConversionResult, RateError> {
        let stored = self.stored_table().await;
        let resolution = self
            .resolver
            .resolve(request, self.connectivity(), stored.as_ref())
            .await?;
        self.record_live(
            resolution.live_table.as_ref(),
            resolution.live_failure.as_ref(),
        )
        .await;
        Ok(resolution.result)
    }

    /// Lets the backend convert, degrading to [`ExchangeService::convert`]
    /// when it cannot.
    pub async fn convert_remote(
        &self,
        request: &ConversionRequest,
    ) -> Result<ConversionResult, RateError> {
        request.validate()?;
        if self.connectivity() != ConnectivityState::Offline {
            match self.backend.convert_remote(request).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_recoverable() => {
                    warn!(error = %e, "Remote conversion failed, resolving locally");
                    if matches!(e, RateError::NetworkFailure(_)) {
                        self.monitor.report_failure();
                    }
                }
                Err(e) => return Err(e),
            }
        }
        self.convert(request).await
    }

    /// The freshest rate table available, with its provenance.
    pub async fn rates(&self) -> TableResolution {
        let stored = self.stored_table().await;
        let resolution = self.resolver.table(self.connectivity(), stored.as_ref()).await;
        self.record_live(
            resolution.live_table.as_ref(),
            resolution.live_failure.as_ref(),
        )
        .await;
        resolution
    }

    /// Stops background health checks.
    pub async fn shutdown(self) {
        self.monitor.stop().await;
    }
}
