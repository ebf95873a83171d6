//! Health checking for the HTTP service.

use hook_ledger_core::EventStore;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Health check result for individual components
#[derive(Debug, Serialize, Clone)]
pub struct HealthCheckResult {
    pub healthy: bool,
    pub message: String,
    pub duration_ms: u64,
}

/// Overall health status
#[derive(Debug)]
pub struct HealthStatus {
    pub is_healthy: bool,
    pub checks: HashMap<String, HealthCheckResult>,
}

/// Interface for system health monitoring
#[async_trait::async_trait]
pub trait HealthChecker: Send + Sync {
    /// Basic health check (fast)
    async fn check_basic_health(&self) -> HealthStatus;

    /// Deep health check with dependencies
    async fn check_deep_health(&self) -> HealthStatus;

    /// Readiness check for load balancers
    async fn check_readiness(&self) -> bool;
}

/// Health checker backed by the event store
pub struct StoreHealthChecker {
    event_store: Arc<dyn EventStore>,
}

impl StoreHealthChecker {
    pub fn new(event_store: Arc<dyn EventStore>) -> Self {
        Self { event_store }
    }

    fn service_check(start: Instant) -> HealthCheckResult {
        HealthCheckResult {
            healthy: true,
            message: "Service is running".to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}

#[async_trait::async_trait]
impl HealthChecker for StoreHealthChecker {
    async fn check_basic_health(&self) -> HealthStatus {
        let start = Instant::now();
        let mut checks = HashMap::new();

        // If we can respond, we're alive
        checks.insert("service".to_string(), Self::service_check(start));

        HealthStatus {
            is_healthy: true,
            checks,
        }
    }

    async fn check_deep_health(&self) -> HealthStatus {
        let start = Instant::now();
        let mut checks = HashMap::new();
        checks.insert("service".to_string(), Self::service_check(start));

        let store_start = Instant::now();
        let store_check = match self.event_store.health_check().await {
            Ok(health) if health.reachable => HealthCheckResult {
                healthy: true,
                message: match health.last_id {
                    Some(last_id) => format!(
                        "{} event records stored, last id {}",
                        health.record_count, last_id
                    ),
                    None => format!("{} event records stored", health.record_count),
                },
                duration_ms: store_start.elapsed().as_millis() as u64,
            },
            Ok(_) => HealthCheckResult {
                healthy: false,
                message: "Event store unreachable".to_string(),
                duration_ms: store_start.elapsed().as_millis() as u64,
            },
            Err(e) => HealthCheckResult {
                healthy: false,
                message: e.to_string(),
                duration_ms: store_start.elapsed().as_millis() as u64,
            },
        };

        let is_healthy = store_check.healthy;
        checks.insert("event_store".to_string(), store_check);

        HealthStatus { is_healthy, checks }
    }

    async fn check_readiness(&self) -> bool {
        matches!(self.event_store.health_check().await, Ok(health) if health.reachable)
    }
}
