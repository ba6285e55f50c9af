//! Tiered rate resolution: live table, then stored snapshot, then the
//! embedded fallback table.

use crate::core::connectivity::ConnectivityState;
use crate::core::error::RateError;
use crate::core::provider::RateTableProvider;
use crate::core::rate::{ConversionRequest, ConversionResult, DataSource, RateTable, convert};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Converts against one tier. Failures the next tier can absorb come back as
/// `Ok(None)`; anything else is returned as an error.
pub fn attempt(
    table: &RateTable,
    request: &ConversionRequest,
    source: DataSource,
) -> Result<Option<ConversionResult>, RateError> {
    match convert(table, request, source) {
        Ok(result) => Ok(Some(result)),
        Err(e) if e.is_recoverable() => {
            warn!(%source, error = %e, "Rate table could not resolve pair");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Converts with the table from `primary`, or with `fallback` when the fetch
/// fails or the fetched table cannot resolve the pair. The primary failure is
/// only logged.
pub async fn with_fallback<P>(
    primary: &P,
    fallback: &RateTable,
    request: &ConversionRequest,
) -> Result<ConversionResult, RateError>
where
    P: RateTableProvider + ?Sized,
{
    request.validate()?;

    match primary.fetch_rates().await {
        Ok(table) => {
            if let Some(result) = attempt(&table, request, DataSource::Realtime)? {
                return Ok(result);
            }
        }
        Err(e) => warn!(error = %e, "Primary rate fetch failed, using fallback table"),
    }

    convert(fallback, request, DataSource::Fallback)
}

/// Outcome of a tiered conversion.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub result: ConversionResult,
    /// Table fetched from the live source during this call, if any
    pub live_table: Option<RateTable>,
    /// Why the live source was not usable, if it was attempted and failed
    pub live_failure: Option<RateError>,
}

/// Outcome of picking the best available table.
#[derive(Debug, Clone)]
pub struct TableResolution {
    /// The freshest tier layered over the lower ones
    pub table: RateTable,
    pub source: DataSource,
    /// Codes the freshest tier lacked (or rated zero), filled from a lower tier
    pub backfilled: Vec<String>,
    pub live_table: Option<RateTable>,
    pub live_failure: Option<RateError>,
}

/// Resolves conversions against the live provider, a caller-supplied stored
/// snapshot and the fallback table, in that order.
///
/// The resolver holds no mutable state: connectivity and the stored snapshot
/// are passed in by the caller on every call.
pub struct RateResolver {
    live: Arc<dyn RateTableProvider>,
    fallback: RateTable,
}

impl RateResolver {
    pub fn new(live: Arc<dyn RateTableProvider>, fallback: RateTable) -> Self {
        Self { live, fallback }
    }

    pub fn fallback(&self) -> &RateTable {
        &self.fallback
    }

    async fn fetch_live(
        &self,
        connectivity: ConnectivityState,
    ) -> (Option<RateTable>, Option<RateError>) {
        if connectivity == ConnectivityState::Offline {
            debug!("Backend offline, skipping live rate fetch");
            return (None, None);
        }
        match self.live.fetch_rates().await {
            Ok(table) => (Some(table), None),
            Err(e) => {
                warn!(error = %e, "Live rate fetch failed");
                (None, Some(e))
            }
        }
    }

    #[instrument(
        name = "ResolveConversion",
        skip(self, request, stored),
        fields(from = %request.from_currency, to = %request.to_currency)
    )]
    pub async fn resolve(
        &self,
        request: &ConversionRequest,
        connectivity: ConnectivityState,
        stored: Option<&RateTable>,
    ) -> Result<Resolution, RateError> {
        request.validate()?;

        let (live_table, live_failure) = self.fetch_live(connectivity).await;
        if let Some(table) = &live_table {
            if let Some(result) = attempt(table, request, DataSource::Realtime)? {
                return Ok(Resolution {
                    result,
                    live_table,
                    live_failure,
                });
            }
        }

        if let Some(table) = stored {
            if let Some(result) = attempt(table, request, DataSource::Stored)? {
                debug!("Resolved from stored snapshot");
                return Ok(Resolution {
                    result,
                    live_table,
                    live_failure,
                });
            }
        }

        let result = convert(&self.fallback, request, DataSource::Fallback)?;
        debug!("Resolved from fallback table");
        Ok(Resolution {
            result,
            live_table,
            live_failure,
        })
    }

    /// Picks the freshest table available without converting anything.
    ///
    /// Entries the freshest tier is missing are taken from the stored
    /// snapshot, then the fallback table, so every fallback currency stays
    /// resolvable.
    pub async fn table(
        &self,
        connectivity: ConnectivityState,
        stored: Option<&RateTable>,
    ) -> TableResolution {
        let (live_table, live_failure) = self.fetch_live(connectivity).await;
        let (top, source) = match (&live_table, stored) {
            (Some(live), _) => (Some(live), DataSource::Realtime),
            (None, Some(stored)) => (Some(stored), DataSource::Stored),
            (None, None) => (None, DataSource::Fallback),
        };

        let mut table = self.fallback.clone();
        for tier in [stored, live_table.as_ref()].into_iter().flatten() {
            table = table.merged_with(tier.iter().filter(|(_, rate)| *rate > 0.0));
        }

        let backfilled: Vec<String> = match top {
            Some(top) => table
                .currencies()
                .filter(|code| !top.get(code).is_some_and(|rate| rate > 0.0))
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        };
        if !backfilled.is_empty() {
            debug!(%source, ?backfilled, "Filled missing rates from lower tier");
        }

        TableResolution {
            table,
            source,
            backfilled,
            live_table,
            live_failure,
        }
    }
}
