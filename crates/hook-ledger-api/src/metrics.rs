//! Metrics collection and observability types for the API service.

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Service metrics for observability
///
/// Every instance owns its registry, so routers built side by side in one
/// process (as tests do) never collide on metric names.
#[derive(Debug)]
pub struct ServiceMetrics {
    registry: Registry,

    // Webhook intake metrics
    pub webhooks_received_total: IntCounterVec,
    pub webhook_duration_seconds: Histogram,
    pub events_stored_total: IntCounter,
    pub webhooks_ignored_total: IntCounterVec,
    pub webhooks_rejected_total: IntCounter,

    // Retrieval metrics
    pub polls_served_total: IntCounterVec,
    pub events_served_total: IntCounter,

    // Storage metrics
    pub storage_failures_total: IntCounterVec,
    pub events_cleared_total: IntCounter,
}

impl ServiceMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new_custom(Some("hook_ledger".to_string()), None)?;

        let webhooks_received_total = IntCounterVec::new(
            Opts::new("webhooks_received_total", "Webhook deliveries received"),
            &["kind"],
        )?;
        let webhook_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "webhook_duration_seconds",
                "Webhook processing time distribution",
            )
            .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0]),
        )?;
        let events_stored_total =
            IntCounter::new("events_stored_total", "Event records stored from webhooks")?;
        let webhooks_ignored_total = IntCounterVec::new(
            Opts::new(
                "webhooks_ignored_total",
                "Deliveries acknowledged without storing a record",
            ),
            &["reason"],
        )?;
        let webhooks_rejected_total = IntCounter::new(
            "webhooks_rejected_total",
            "Deliveries rejected for missing headers or payload",
        )?;
        let polls_served_total = IntCounterVec::new(
            Opts::new("polls_served_total", "Event retrieval requests served"),
            &["mode"],
        )?;
        let events_served_total =
            IntCounter::new("events_served_total", "Event records returned to pollers")?;
        let storage_failures_total = IntCounterVec::new(
            Opts::new("storage_failures_total", "Failed event store operations"),
            &["operation"],
        )?;
        let events_cleared_total =
            IntCounter::new("events_cleared_total", "Event records removed by clear")?;

        registry.register(Box::new(webhooks_received_total.clone()))?;
        registry.register(Box::new(webhook_duration_seconds.clone()))?;
        registry.register(Box::new(events_stored_total.clone()))?;
        registry.register(Box::new(webhooks_ignored_total.clone()))?;
        registry.register(Box::new(webhooks_rejected_total.clone()))?;
        registry.register(Box::new(polls_served_total.clone()))?;
        registry.register(Box::new(events_served_total.clone()))?;
        registry.register(Box::new(storage_failures_total.clone()))?;
        registry.register(Box::new(events_cleared_total.clone()))?;

        Ok(Arc::new(Self {
            registry,
            webhooks_received_total,
            webhook_duration_seconds,
            events_stored_total,
            webhooks_ignored_total,
            webhooks_rejected_total,
            polls_served_total,
            events_served_total,
            storage_failures_total,
            events_cleared_total,
        }))
    }

    pub fn record_webhook_received(&self, kind: &str) {
        self.webhooks_received_total.with_label_values(&[kind]).inc();
    }

    pub fn record_webhook_duration(&self, duration: std::time::Duration) {
        self.webhook_duration_seconds
            .observe(duration.as_secs_f64());
    }

    pub fn record_event_stored(&self) {
        self.events_stored_total.inc();
    }

    pub fn record_webhook_ignored(&self, reason: &str) {
        self.webhooks_ignored_total
            .with_label_values(&[reason])
            .inc();
    }

    pub fn record_webhook_rejected(&self) {
        self.webhooks_rejected_total.inc();
    }

    pub fn record_poll(&self, mode: &str, events: usize) {
        self.polls_served_total.with_label_values(&[mode]).inc();
        self.events_served_total.inc_by(events as u64);
    }

    pub fn record_storage_failure(&self, operation: &str) {
        self.storage_failures_total
            .with_label_values(&[operation])
            .inc();
    }

    pub fn record_clear(&self, deleted: u64) {
        self.events_cleared_total.inc_by(deleted);
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}
