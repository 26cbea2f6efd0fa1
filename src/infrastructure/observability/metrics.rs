// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new();

    // Start the exporter
    // Ignore error if address is already in use (for development/testing)
    if let Err(e) = builder.with_http_listener(addr).install() {
        tracing::warn!("Failed to install Prometheus recorder: {}. This might happen if the port is already in use.", e);
    }

    describe_metrics();

    info!("Metrics exporter listening on {}", addr);
}

fn describe_metrics() {
    describe_counter!(
        "paysync_event_attempts_total",
        "Total webhook event processing attempts"
    );
    describe_counter!(
        "paysync_event_processed_total",
        "Webhook events processed successfully"
    );
    describe_counter!(
        "paysync_event_retries_total",
        "Webhook events rescheduled for retry"
    );
    describe_counter!(
        "paysync_event_failed_total",
        "Webhook events moved to the terminal failed state"
    );
    describe_histogram!(
        "paysync_event_duration_seconds",
        "Time spent processing a single webhook event"
    );
    describe_counter!(
        "paysync_sync_runs_total",
        "Reconciliation batches started, labeled by sync type"
    );
    describe_counter!(
        "paysync_sync_synthetic_events_total",
        "Synthetic webhook events enqueued by reconciliation"
    );
    describe_counter!(
        "paysync_sync_missing_alerts_total",
        "Sync batches whose missing-record count exceeded the alert threshold"
    );
    describe_counter!(
        "paysync_metrics_recalc_signals_total",
        "Daily metrics recalculation signals emitted after persistence"
    );
    describe_counter!(
        "paysync_webhook_received_total",
        "Webhook deliveries accepted over HTTP"
    );
    describe_counter!(
        "paysync_webhook_duplicate_total",
        "Webhook deliveries deduplicated by external id"
    );
    describe_counter!(
        "paysync_webhook_rejected_total",
        "Webhook deliveries rejected by signature verification"
    );
}
