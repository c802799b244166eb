//! # Touch Telemetry - Metrics & Observability
//!
//! Prometheus metrics for the touch tracking engine.
//! Provides real-time metrics for:
//! - Contact lifecycle events by kind and coordinate space
//! - Live contacts and fiducial markers
//! - Contact speeds
//! - Frame throughput and processing time

use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;
use thiserror::Error;
use touch_core::{CoordinateSpace, TouchEvent, TouchEventKind};
use touch_tracker::{TouchEngine, TouchListener, TrackerStats};
use tracing::{debug, info};

/// Errors raised while building or exporting metrics
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("Metrics export is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

pub type TelemetryResult<T> = Result<T, TelemetryError>;

fn space_label(space: CoordinateSpace) -> &'static str {
    match space {
        CoordinateSpace::Raw => "raw",
        CoordinateSpace::Calibrated => "calibrated",
    }
}

/// Metrics collector for the touch tracking engine
pub struct MetricsCollector {
    registry: Registry,

    // Lifecycle metrics
    events_total: IntCounterVec,
    contacts_active: IntGauge,
    contact_speed: Histogram,

    // Marker metrics
    objects_active: IntGauge,

    // Frame metrics
    frames_processed: IntCounter,
    detections_total: IntCounter,
    frame_processing_time: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> TelemetryResult<Self> {
        let registry = Registry::new();

        // Lifecycle metrics
        let events_total = IntCounterVec::new(
            Opts::new("touch_events_total", "Contact lifecycle events"),
            &["kind", "space"],
        )?;
        registry.register(Box::new(events_total.clone()))?;

        let contacts_active = IntGauge::new(
            "touch_contacts_active",
            "Number of live contacts",
        )?;
        registry.register(Box::new(contacts_active.clone()))?;

        let contact_speed = Histogram::with_opts(
            HistogramOpts::new(
                "touch_contact_speed",
                "Calibrated contact speed in frame widths per second",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;
        registry.register(Box::new(contact_speed.clone()))?;

        // Marker metrics
        let objects_active = IntGauge::new(
            "touch_objects_active",
            "Number of fiducial markers in view",
        )?;
        registry.register(Box::new(objects_active.clone()))?;

        // Frame metrics
        let frames_processed = IntCounter::new(
            "touch_frames_processed_total",
            "Total detection frames processed",
        )?;
        registry.register(Box::new(frames_processed.clone()))?;

        let detections_total = IntCounter::new(
            "touch_detections_total",
            "Total blob detections",
        )?;
        registry.register(Box::new(detections_total.clone()))?;

        let frame_processing_time = Histogram::with_opts(
            HistogramOpts::new(
                "touch_frame_processing_seconds",
                "Tracking time per frame",
            )
            .buckets(vec![0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05]),
        )?;
        registry.register(Box::new(frame_processing_time.clone()))?;

        info!("Metrics collector initialized");

        Ok(Self {
            registry,
            events_total,
            contacts_active,
            contact_speed,
            objects_active,
            frames_processed,
            detections_total,
            frame_processing_time,
        })
    }

    /// Get Prometheus registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> TelemetryResult<String> {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    // ========================================================================
    // LIFECYCLE METRICS
    // ========================================================================

    /// Count one event and follow the live contact gauge
    pub fn record_event(&self, event: &TouchEvent) {
        self.events_total
            .with_label_values(&[event.kind.as_str(), space_label(event.space)])
            .inc();

        // Gauge and speed follow the calibrated stream only
        if event.space != CoordinateSpace::Calibrated {
            return;
        }

        match event.kind {
            TouchEventKind::Arrived => self.contacts_active.inc(),
            TouchEventKind::Departed => self.contacts_active.dec(),
            TouchEventKind::Moved | TouchEventKind::Held => {
                self.contact_speed.observe(event.contact.speed);
            }
        }
    }

    /// Number of events recorded for a kind and space
    pub fn event_count(&self, kind: TouchEventKind, space: CoordinateSpace) -> u64 {
        self.events_total
            .with_label_values(&[kind.as_str(), space_label(space)])
            .get()
    }

    /// Set live contact count
    pub fn set_contacts_active(&self, count: i64) {
        self.contacts_active.set(count);
    }

    pub fn contacts_active(&self) -> i64 {
        self.contacts_active.get()
    }

    // ========================================================================
    // MARKER METRICS
    // ========================================================================

    /// Set fiducial marker count
    pub fn set_objects_active(&self, count: i64) {
        self.objects_active.set(count);
    }

    // ========================================================================
    // FRAME METRICS
    // ========================================================================

    /// Record one processed detection frame
    pub fn record_frame(&self, processing_time_secs: f64, detections: u64) {
        self.frames_processed.inc();
        self.detections_total.inc_by(detections);
        self.frame_processing_time.observe(processing_time_secs);
    }

    /// Reset both live gauges from the engine's current state.
    ///
    /// `TouchEngine::clear` publishes no departures, so the event-driven
    /// contact gauge is only exact after a resync.
    pub fn sync_engine(&self, engine: &TouchEngine) {
        self.contacts_active.set(engine.active_track_count() as i64);
        self.objects_active.set(engine.raw_objects().len() as i64);
    }

    /// Log a summary of engine statistics next to the collected metrics
    pub fn log_stats(&self, stats: &TrackerStats) {
        debug!(
            "Engine stats: {} (collector saw {} frames)",
            stats,
            self.frames_processed.get()
        );
    }
}

// ============================================================================
// LISTENER
// ============================================================================

/// Listener that feeds every published event into a [`MetricsCollector`]
pub struct MetricsListener {
    metrics: Arc<MetricsCollector>,
}

impl MetricsListener {
    pub fn new(metrics: Arc<MetricsCollector>) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }
}

impl TouchListener for MetricsListener {
    fn touch_arrived(&self, event: TouchEvent) {
        self.metrics.record_event(&event);
    }

    fn touch_moved(&self, event: TouchEvent) {
        self.metrics.record_event(&event);
    }

    fn touch_held(&self, event: TouchEvent) {
        self.metrics.record_event(&event);
    }

    fn touch_departed(&self, event: TouchEvent) {
        self.metrics.record_event(&event);
    }

    fn raw_touch_arrived(&self, event: TouchEvent) {
        self.metrics.record_event(&event);
    }

    fn raw_touch_moved(&self, event: TouchEvent) {
        self.metrics.record_event(&event);
    }

    fn raw_touch_held(&self, event: TouchEvent) {
        self.metrics.record_event(&event);
    }

    fn raw_touch_departed(&self, event: TouchEvent) {
        self.metrics.record_event(&event);
    }
}

// ============================================================================
// TESTS
// ============================================================================
