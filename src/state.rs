//! # Application State Management
//!
//! The shared context handed to every HTTP request handler and WebSocket
//! connection. It is built exactly once at startup and is read-only
//! afterwards: configuration and the external-service clients never change
//! for the lifetime of the process (there is no reinitialization path).
//! Only the request metrics are mutable, behind an RwLock.
//!
//! ## Sharing pattern:
//! - `Arc<AppConfig>`: plain shared ownership, no lock — the config is frozen
//! - `Option<Arc<…Client>>`: `None` means the external service was not
//!   configured at startup, which gates features into fallback mode
//! - `Arc<RwLock<AppMetrics>>`: many readers or one writer for the counters

use crate::ai::ProviderClient;
use crate::config::AppConfig;
use crate::directory::DirectoryClient;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::{info, warn};

/// The application context shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Frozen configuration, loaded once at startup.
    pub config: Arc<AppConfig>,

    /// AI provider client; `None` when no usable API key was configured.
    /// Absence disables the streaming relay and activates static fallbacks
    /// on the text endpoints.
    pub ai: Option<Arc<ProviderClient>>,

    /// User-directory client; `None` when no directory URL was configured.
    /// Absence turns the management endpoints into 503s.
    pub directory: Option<Arc<DirectoryClient>>,

    /// Request metrics, updated by middleware on every request.
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started (never changes).
    pub start_time: Instant,
}

/// Request metrics collected across all HTTP requests and WS connections.
#[derive(Debug, Default)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed since server start
    pub request_count: u64,

    /// Total number of errors encountered since server start
    pub error_count: u64,

    /// Current number of open streaming connections
    pub active_connections: u32,

    /// Per-endpoint statistics, keyed by "METHOD /path"
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Request statistics for a single endpoint.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    /// Build the context from frozen configuration.
    ///
    /// External-service clients are constructed here, once, based on what the
    /// configuration provides. Missing services are logged loudly because
    /// they change user-visible behavior for the whole process lifetime.
    pub fn new(config: AppConfig) -> Result<Self> {
        let ai = if config.provider_configured() {
            info!(
                transcription_model = %config.provider.transcription_model,
                generation_model = %config.provider.generation_model,
                "AI provider client initialized"
            );
            Some(Arc::new(ProviderClient::new(config.provider.clone())?))
        } else {
            warn!("OPENAI_API_KEY not set; streaming disabled, text endpoints use static fallbacks");
            None
        };

        let directory = if config.directory_configured() {
            info!(base_url = %config.directory.base_url, "User directory client initialized");
            Some(Arc::new(DirectoryClient::new(config.directory.clone())?))
        } else {
            warn!("User directory not configured; management endpoints will return 503");
            None
        };

        Ok(Self {
            config: Arc::new(config),
            ai,
            directory,
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
        })
    }

    /// Increment the total request counter (called by middleware for every request).
    pub fn increment_request_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.request_count += 1;
    }

    /// Increment the total error counter (called when any request fails).
    pub fn increment_error_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.error_count += 1;
    }

    /// Record duration and outcome for a specific endpoint.
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();
        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();

        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;
        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Track a newly opened streaming connection.
    pub fn increment_active_connections(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.active_connections += 1;
    }

    /// Track a closed streaming connection. Saturates at zero.
    pub fn decrement_active_connections(&self) {
        let mut metrics = self.metrics.write().unwrap();
        if metrics.active_connections > 0 {
            metrics.active_connections -= 1;
        }
    }

    /// Snapshot of the current metrics, cloned so no lock is held while the
    /// HTTP response is serialized.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        let metrics = self.metrics.read().unwrap();
        AppMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            active_connections: metrics.active_connections,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
        }
    }

    /// Server uptime in seconds.
    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    /// Average response time for this endpoint in milliseconds.
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    /// Error rate for this endpoint (0.0 to 1.0).
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> AppState {
        AppState::new(AppConfig::default()).unwrap()
    }

    #[test]
    fn test_unconfigured_services_are_absent() {
        let state = test_state();
        assert!(state.ai.is_none());
        assert!(state.directory.is_none());
    }

    #[test]
    fn test_request_counters() {
        let state = test_state();
        state.increment_request_count();
        state.increment_request_count();
        state.increment_error_count();

        let snapshot = state.get_metrics_snapshot();
        assert_eq!(snapshot.request_count, 2);
        assert_eq!(snapshot.error_count, 1);
    }

    #[test]
    fn test_connection_counter_saturates_at_zero() {
        let state = test_state();
        state.decrement_active_connections();
        assert_eq!(state.get_metrics_snapshot().active_connections, 0);

        state.increment_active_connections();
        state.increment_active_connections();
        state.decrement_active_connections();
        assert_eq!(state.get_metrics_snapshot().active_connections, 1);
    }

    #[test]
    fn test_endpoint_metrics() {
        let state = test_state();
        state.record_endpoint_request("POST /api/generate-paragraph", 10, false);
        state.record_endpoint_request("POST /api/generate-paragraph", 30, true);

        let snapshot = state.get_metrics_snapshot();
        let metric = &snapshot.endpoint_metrics["POST /api/generate-paragraph"];
        assert_eq!(metric.request_count, 2);
        assert_eq!(metric.average_duration_ms(), 20.0);
        assert_eq!(metric.error_rate(), 0.5);
    }
}
