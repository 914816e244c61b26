/*!
Observability for SetVault.

- Structured logging setup on top of `tracing`
- Prometheus counters for discovery and storage failures (feature `metrics`)
*/

#[cfg(feature = "metrics")]
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};
#[cfg(feature = "metrics")]
use std::sync::OnceLock;
use tracing::subscriber::set_global_default;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry as TracingRegistry};

use crate::{Result, VaultError};

/// Global metrics instance
#[cfg(feature = "metrics")]
static METRICS: OnceLock<VaultMetrics> = OnceLock::new();

/// Counters for backup set discovery
#[cfg(feature = "metrics")]
#[derive(Debug)]
pub struct VaultMetrics {
    pub discovery_runs_total: IntCounter,
    pub backup_sets_discovered_total: IntCounter,
    pub entries_skipped_total: IntCounter,
    pub storage_errors_total: IntCounter,

    registry: Registry,
}

#[cfg(feature = "metrics")]
impl VaultMetrics {
    fn new() -> Result<Self> {
        let registry = Registry::new();

        let counter = |name: &str, help: &str| -> Result<IntCounter> {
            let counter = IntCounter::new(name, help).map_err(|e| {
                VaultError::storage(format!("Failed to create {name} metric: {e}"))
            })?;
            registry
                .register(Box::new(counter.clone()))
                .map_err(|e| VaultError::storage(format!("Failed to register {name}: {e}")))?;
            Ok(counter)
        };

        Ok(Self {
            discovery_runs_total: counter(
                "setvault_discovery_runs_total",
                "Backup set discovery passes started",
            )?,
            backup_sets_discovered_total: counter(
                "setvault_backup_sets_discovered_total",
                "Valid backup sets found by discovery",
            )?,
            entries_skipped_total: counter(
                "setvault_entries_skipped_total",
                "Backup root entries skipped by discovery",
            )?,
            storage_errors_total: counter(
                "setvault_storage_errors_total",
                "Storage failures absorbed by discovery",
            )?,
            registry,
        })
    }

    /// Get or initialize global metrics instance
    pub fn global() -> &'static VaultMetrics {
        METRICS.get_or_init(|| Self::new().expect("Failed to initialize SetVault metrics"))
    }

    pub fn record_discovery(&self) {
        self.discovery_runs_total.inc();
    }

    pub fn record_set_discovered(&self) {
        self.backup_sets_discovered_total.inc();
    }

    pub fn record_skipped_entry(&self) {
        self.entries_skipped_total.inc();
    }

    pub fn record_storage_error(&self) {
        self.storage_errors_total.inc();
    }

    /// Gather metrics in Prometheus text format
    pub fn gather_metrics(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| VaultError::storage(format!("Failed to encode metrics: {e}")))?;

        String::from_utf8(buffer)
            .map_err(|e| VaultError::storage(format!("Failed to convert metrics to string: {e}")))
    }
}

/// Build the env filter, defaulting to `setvault=info` when `RUST_LOG` is unset
fn env_filter() -> Result<EnvFilter> {
    let directive = "setvault=info"
        .parse()
        .map_err(|e| VaultError::config(format!("Invalid log directive: {e}")))?;
    Ok(EnvFilter::from_default_env().add_directive(directive))
}

/// Initialize the global tracing subscriber, logging to stderr
///
/// # Arguments
/// * `json` - Emit one JSON object per event instead of human-readable lines
pub fn init_observability(json: bool) -> Result<()> {
    #[cfg(feature = "metrics")]
    VaultMetrics::global();

    let filter = env_filter()?;
    let result = if json {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_current_span(false);
        set_global_default(TracingRegistry::default().with(filter).with(fmt_layer))
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false);
        set_global_default(TracingRegistry::default().with(filter).with(fmt_layer))
    };
    result.map_err(|e| {
        VaultError::config(format!("Failed to set global tracing subscriber: {e}"))
    })?;

    tracing::debug!("SetVault observability initialized");
    Ok(())
}
