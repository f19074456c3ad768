//! Best-effort analytics events.
//!
//! Every send goes through [`track`], which logs and swallows sink failures
//! so an analytics outage never reaches the estimator or the page.

use std::sync::Mutex;

use serde_json::{Map, Value, json};

use crate::error::{Error, Result};
use crate::estimator::Tier;

/// Events the page reports, each with a fixed name and parameter set.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyticsEvent {
    /// A snapshot was recomputed (automatically or on demand).
    SnapshotGenerate { tier: Tier, est_min: f64, est_max: f64 },
    /// The "generate" button was pressed.
    SnapshotManualGenerate,
    /// The snapshot summary was copied to the clipboard.
    SnapshotCopy,
    /// The snapshot was downloaded as JSON.
    SnapshotDownload,
    /// A call-to-action button was clicked.
    CtaClick { label: String },
    /// A share button was clicked.
    Share { network: String },
    /// The newsletter form was accepted.
    Subscribe { method: String },
}

impl AnalyticsEvent {
    /// Event name as sent to the analytics backend.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SnapshotGenerate { .. } => "snapshot_generate",
            Self::SnapshotManualGenerate => "snapshot_manual_generate",
            Self::SnapshotCopy => "snapshot_copy",
            Self::SnapshotDownload => "snapshot_download",
            Self::CtaClick { .. } => "click",
            Self::Share { .. } => "share",
            Self::Subscribe { .. } => "subscribe",
        }
    }

    /// Named parameters attached to the event.
    #[must_use]
    pub fn params(&self) -> Map<String, Value> {
        let value = match self {
            Self::SnapshotGenerate {
                tier,
                est_min,
                est_max,
            } => json!({ "tier": tier.as_str(), "estMin": est_min, "estMax": est_max }),
            Self::SnapshotManualGenerate | Self::SnapshotCopy | Self::SnapshotDownload => {
                json!({})
            }
            Self::CtaClick { label } => {
                json!({ "event_category": "CTA", "event_label": label })
            }
            Self::Share { network } => {
                json!({ "event_category": "Social", "event_label": network })
            }
            Self::Subscribe { method } => json!({ "method": method }),
        };
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

/// Destination for analytics calls.
///
/// Both methods default to no-ops, mirroring a page where the tag script
/// never loaded.
pub trait AnalyticsSink: Send + Sync {
    /// Configures the sink with a measurement ID.
    fn configure(&self, _measurement_id: &str) -> Result<()> {
        Ok(())
    }

    /// Records one event.
    fn send(&self, _name: &str, _params: &Map<String, Value>) -> Result<()> {
        Ok(())
    }
}

/// Sends `event` to `sink`, swallowing any failure.
pub fn track(sink: &dyn AnalyticsSink, event: &AnalyticsEvent) {
    if let Err(e) = sink.send(event.name(), &event.params()) {
        log::debug!("analytics event {} dropped: {e}", event.name());
    }
}

/// Configures `sink`, swallowing any failure.
pub fn configure(sink: &dyn AnalyticsSink, measurement_id: &str) {
    if let Err(e) = sink.configure(measurement_id) {
        log::debug!("analytics configuration skipped: {e}");
    }
}

/// A sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAnalytics;

impl AnalyticsSink for NoAnalytics {}

/// A sink that writes events to the `analytics` log target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAnalytics;

impl AnalyticsSink for LogAnalytics {
    fn configure(&self, measurement_id: &str) -> Result<()> {
        log::info!(target: "analytics", "config {measurement_id}");
        Ok(())
    }

    fn send(&self, name: &str, params: &Map<String, Value>) -> Result<()> {
        log::info!(target: "analytics", "event {name} {}", Value::Object(params.clone()));
        Ok(())
    }
}

/// An event captured by [`RecordingAnalytics`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub name: String,
    pub params: Map<String, Value>,
}

/// A sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingAnalytics {
    events: Mutex<Vec<RecordedEvent>>,
    measurement_id: Mutex<Option<String>>,
}

impl RecordingAnalytics {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Returns the recorded event names, oldest first.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.name).collect()
    }

    /// Returns the measurement ID passed to `configure`, if any.
    #[must_use]
    pub fn measurement_id(&self) -> Option<String> {
        self.measurement_id.lock().ok().and_then(|m| m.clone())
    }
}

impl AnalyticsSink for RecordingAnalytics {
    fn configure(&self, measurement_id: &str) -> Result<()> {
        *self
            .measurement_id
            .lock()
            .map_err(|_| Error::Analytics("recorder lock poisoned".to_string()))? =
            Some(measurement_id.to_string());
        Ok(())
    }

    fn send(&self, name: &str, params: &Map<String, Value>) -> Result<()> {
        self.events
            .lock()
            .map_err(|_| Error::Analytics("recorder lock poisoned".to_string()))?
            .push(RecordedEvent {
                name: name.to_string(),
                params: params.clone(),
            });
        Ok(())
    }
}

impl<T: AnalyticsSink + ?Sized> AnalyticsSink for std::sync::Arc<T> {
    fn configure(&self, measurement_id: &str) -> Result<()> {
        (**self).configure(measurement_id)
    }

    fn send(&self, name: &str, params: &Map<String, Value>) -> Result<()> {
        (**self).send(name, params)
    }
}
