//! The snapshot widget: estimator plus persistence, analytics and exports.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::analytics::{AnalyticsEvent, AnalyticsSink, track};
use crate::config::SnapshotConfig;
use crate::debounce::Debouncer;
use crate::error::Result;
use crate::estimator::{SnapshotInputs, SnapshotResult, WeightTable, compute, parse_number};
use crate::export::{Download, contact_link, snapshot_download};
use crate::storage::KeyValueStore;

/// Storage key holding the last inputs.
pub const INPUTS_KEY: &str = "snapshot:inputs:v1";

/// Everything the widget displays after a recompute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub result: SnapshotResult,
    pub headline: String,
    pub description: String,
    pub contact_link: String,
}

/// Rebuilds inputs from a stored record.
///
/// Unknown task types are dropped and known ones come back in display
/// order. Missing or null fields keep their defaults; numbers stored as
/// text are parsed leniently. A corrupt record yields the defaults.
#[must_use]
pub fn restore_inputs(raw: &str) -> SnapshotInputs {
    let mut inputs = SnapshotInputs::default();
    let Ok(Value::Object(record)) = serde_json::from_str::<Value>(raw) else {
        log::debug!("ignoring unreadable snapshot record");
        return inputs;
    };

    if let Some(Value::Array(types)) = record.get("types") {
        let stored: Vec<&str> = types.iter().filter_map(Value::as_str).collect();
        inputs.types = WeightTable::standard()
            .tags()
            .filter(|tag| stored.contains(tag))
            .map(ToString::to_string)
            .collect();
    }

    let number = |key: &str| match record.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => Some(parse_number(s)),
        _ => None,
    };
    if let Some(volume) = number("volume") {
        inputs.volume = volume;
    }
    if let Some(complexity) = number("complexity") {
        inputs.complexity = complexity;
    }
    if let Some(budget) = number("budget") {
        inputs.budget = budget;
    }
    if let Some(Value::String(email)) = record.get("email") {
        inputs.email = Some(email.clone());
    }

    inputs
}

/// Page controller for the snapshot widget.
#[derive(Debug)]
pub struct SnapshotBuilder<S, A> {
    store: S,
    analytics: A,
    config: SnapshotConfig,
    debouncer: Debouncer,
}

impl<S: KeyValueStore, A: AnalyticsSink> SnapshotBuilder<S, A> {
    #[must_use]
    pub const fn new(store: S, analytics: A, config: SnapshotConfig) -> Self {
        let debouncer = Debouncer::new(config.debounce());
        Self {
            store,
            analytics,
            config,
            debouncer,
        }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn analytics(&self) -> &A {
        &self.analytics
    }

    pub const fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    /// Debouncer for input changes, using the configured quiet window.
    pub const fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    /// Restores the last saved inputs, or defaults if there are none.
    #[must_use]
    pub fn load(&self) -> SnapshotInputs {
        match self.store.get(INPUTS_KEY) {
            Ok(Some(raw)) => restore_inputs(&raw),
            Ok(None) => SnapshotInputs::default(),
            Err(e) => {
                log::warn!("could not read saved snapshot inputs: {e}");
                SnapshotInputs::default()
            }
        }
    }

    /// Overwrites the saved inputs. Failures are logged and ignored.
    pub fn save(&self, inputs: &SnapshotInputs) {
        let record = match serde_json::to_string(inputs) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("could not encode snapshot inputs: {e}");
                return;
            }
        };
        if let Err(e) = self.store.set(INPUTS_KEY, &record) {
            log::warn!("could not save snapshot inputs: {e}");
        }
    }

    /// Recomputes the snapshot, saves the inputs and reports the event.
    pub fn generate(&self, inputs: &SnapshotInputs) -> Snapshot {
        let result = compute(inputs);
        let snapshot = Snapshot {
            headline: result.headline(),
            description: result.description(),
            contact_link: contact_link(
                &self.config.contact_recipient,
                &self.config.contact_subject,
                &result,
                inputs.contact_email(),
            ),
            result,
        };

        let mut saved = snapshot.result.clone().into_inputs();
        saved.email.clone_from(&inputs.email);
        self.save(&saved);

        log::debug!(
            "snapshot {} ({}-{})",
            snapshot.result.tier,
            snapshot.result.est_min,
            snapshot.result.est_max
        );
        #[allow(clippy::cast_precision_loss)]
        let event = AnalyticsEvent::SnapshotGenerate {
            tier: snapshot.result.tier,
            est_min: snapshot.result.est_min as f64,
            est_max: snapshot.result.est_max as f64,
        };
        track(&self.analytics, &event);

        snapshot
    }

    /// The "generate" button: recompute, then report the manual request.
    pub fn generate_manual(&self, inputs: &SnapshotInputs) -> Snapshot {
        let snapshot = self.generate(inputs);
        track(&self.analytics, &AnalyticsEvent::SnapshotManualGenerate);
        snapshot
    }

    /// The "copy summary" button: recompute and return the clipboard text.
    pub fn copy_summary(&self, inputs: &SnapshotInputs) -> String {
        let text = self.generate(inputs).result.clipboard_text();
        track(&self.analytics, &AnalyticsEvent::SnapshotCopy);
        text
    }

    /// The "download" button: recompute and return `snapshot.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be serialized.
    pub fn download(&self, inputs: &SnapshotInputs) -> Result<Download> {
        let download = snapshot_download(&self.generate(inputs).result)?;
        track(&self.analytics, &AnalyticsEvent::SnapshotDownload);
        Ok(download)
    }
}

impl<S, A> SnapshotBuilder<S, A>
where
    S: KeyValueStore + 'static,
    A: AnalyticsSink + 'static,
{
    /// Schedules a recompute after the configured quiet window, superseding
    /// any pending one.
    ///
    /// `on_ready` receives the snapshot if this trigger is the last in its burst.
    pub fn schedule<F>(
        self: &Arc<Self>,
        inputs: SnapshotInputs,
        on_ready: F,
    ) -> JoinHandle<bool>
    where
        F: FnOnce(Snapshot) + Send + 'static,
    {
        let builder = Arc::clone(self);
        self.debouncer
            .trigger(move || on_ready(builder.generate(&inputs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::RecordingAnalytics;
    use crate::estimator::Tier;
    use crate::storage::MemoryStore;
    use std::sync::Mutex;
    use std::time::Duration;

    type TestBuilder = SnapshotBuilder<MemoryStore, RecordingAnalytics>;

    fn builder() -> TestBuilder {
        SnapshotBuilder::new(
            MemoryStore::new(),
            RecordingAnalytics::new(),
            SnapshotConfig::default(),
        )
    }

    fn sample_inputs() -> SnapshotInputs {
        SnapshotInputs {
            types: vec!["emails".to_string(), "integration".to_string()],
            volume: 50.0,
            complexity: 3.0,
            budget: 0.0,
            email: Some("ana@example.com".to_string()),
        }
    }

    #[test]
    fn load_without_record_gives_defaults() {
        assert_eq!(builder().load(), SnapshotInputs::default());
    }

    #[test]
    fn generate_saves_normalized_inputs() {
        let b = builder();
        let mut inputs = sample_inputs();
        inputs.volume = -5.0;
        b.generate(&inputs);

        let raw = b.store().get(INPUTS_KEY).unwrap().unwrap();
        let json: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["volume"], 0);
        assert_eq!(json["complexity"], 3);
        assert_eq!(json["email"], "ana@example.com");
        assert_eq!(json["types"][0], "emails");
    }

    #[test]
    fn saved_inputs_round_trip_through_load() {
        let b = builder();
        b.generate(&sample_inputs());
        assert_eq!(b.load(), sample_inputs());
    }

    #[test]
    fn generate_reports_tier_and_range() {
        let b = builder();
        let snapshot = b.generate(&sample_inputs());

        assert_eq!(snapshot.result.tier, Tier::Pro);
        assert_eq!(snapshot.headline, "Pro · 498\u{a0}€ – 1196\u{a0}€");
        assert!(snapshot.contact_link.starts_with("mailto:info@your-domain.com?"));
        assert!(snapshot.contact_link.contains("ana%40example.com"));

        let events = b.analytics().events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "snapshot_generate");
        assert_eq!(events[0].params["tier"], "Pro");
        assert_eq!(events[0].params["estMin"], 498.0);
    }

    #[test]
    fn contact_link_without_email_uses_placeholder() {
        let b = builder();
        let mut inputs = sample_inputs();
        inputs.email = None;
        let snapshot = b.generate(&inputs);
        assert!(snapshot.contact_link.contains("%5Bno%20proporcionado%5D"));
    }

    #[test]
    fn manual_generate_fires_both_events() {
        let b = builder();
        b.generate_manual(&sample_inputs());
        assert_eq!(
            b.analytics().names(),
            vec!["snapshot_generate", "snapshot_manual_generate"]
        );
    }

    #[test]
    fn copy_summary_text_and_events() {
        let b = builder();
        let text = b.copy_summary(&sample_inputs());
        assert!(text.starts_with("Snapshot: Pro · 498\u{a0}€–1196\u{a0}€\n"));
        assert!(text.ends_with("Rango orientativo: 498\u{a0}€ – 1196\u{a0}€"));
        assert_eq!(b.analytics().names(), vec!["snapshot_generate", "snapshot_copy"]);
    }

    #[test]
    fn download_produces_snapshot_json() {
        let b = builder();
        let download = b.download(&sample_inputs()).unwrap();
        assert_eq!(download.filename, "snapshot.json");
        assert!(download.body.contains("\"estMin\": 498"));
        assert_eq!(
            b.analytics().names(),
            vec!["snapshot_generate", "snapshot_download"]
        );
    }

    // --- restore_inputs ---

    #[test]
    fn restore_drops_unknown_types_and_reorders() {
        let inputs = restore_inputs(r#"{"types": ["integration", "bogus", "emails"]}"#);
        assert_eq!(inputs.types, vec!["emails", "integration"]);
    }

    #[test]
    fn restore_keeps_defaults_for_null_and_missing() {
        let inputs = restore_inputs(r#"{"volume": null, "budget": 300}"#);
        assert!((inputs.volume - 0.0).abs() < f64::EPSILON);
        assert!((inputs.complexity - 1.0).abs() < f64::EPSILON);
        assert!((inputs.budget - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn restore_parses_numbers_stored_as_text() {
        let inputs = restore_inputs(r#"{"volume": "120", "complexity": "x"}"#);
        assert!((inputs.volume - 120.0).abs() < f64::EPSILON);
        assert!((inputs.complexity - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn restore_corrupt_record_gives_defaults() {
        assert_eq!(restore_inputs("{oops"), SnapshotInputs::default());
        assert_eq!(restore_inputs("[1, 2]"), SnapshotInputs::default());
    }

    // --- debounced recompute ---

    #[tokio::test(start_paused = true)]
    async fn schedule_runs_only_latest_inputs() {
        let b = Arc::new(builder());
        let shown = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for volume in [10.0, 20.0, 500.0] {
            let shown = Arc::clone(&shown);
            let inputs = SnapshotInputs {
                volume,
                ..SnapshotInputs::default()
            };
            handles.push(b.schedule(inputs, move |snapshot| {
                shown.lock().unwrap().push(snapshot.result.tier);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*shown.lock().unwrap(), vec![Tier::Enterprise]);
        assert_eq!(b.analytics().names(), vec!["snapshot_generate"]);
        assert!((b.load().volume - 500.0).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_uses_configured_window() {
        let b = Arc::new(SnapshotBuilder::new(
            MemoryStore::new(),
            RecordingAnalytics::new(),
            SnapshotConfig::default().with_debounce_ms(50),
        ));
        assert_eq!(b.debouncer().delay(), Duration::from_millis(50));

        let start = tokio::time::Instant::now();
        let ran = b.schedule(sample_inputs(), |_| {}).await.unwrap();

        assert!(ran);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(220));
    }

    #[test]
    fn default_window_is_220ms() {
        assert_eq!(builder().debouncer().delay(), Duration::from_millis(220));
    }
}
