//! leadsite - Client-side behavior of a small marketing website.
//!
//! The core is a deterministic lead estimator ("snapshot") that turns a few
//! form inputs into a pricing tier, lead time and cost range. Around it sit
//! the page controllers: per-section video embeds, share links, a newsletter
//! form, best-effort analytics and a cache-first offline shim.
//!
//! Browser facilities are traits so everything runs headless: local storage
//! is a [`KeyValueStore`], the analytics tag is an [`AnalyticsSink`] and the
//! service worker's network is a [`Fetcher`].
//!
//! # Example
//!
//! ```
//! use leadsite::{NoAnalytics, MemoryStore, SiteConfig, SnapshotBuilder, SnapshotInputs, Tier};
//!
//! let config = SiteConfig::default();
//! let builder = SnapshotBuilder::new(MemoryStore::new(), NoAnalytics, config.snapshot);
//!
//! let inputs = SnapshotInputs {
//!     types: vec!["emails".to_string(), "integration".to_string()],
//!     volume: 50.0,
//!     complexity: 3.0,
//!     ..SnapshotInputs::default()
//! };
//! let snapshot = builder.generate(&inputs);
//! assert_eq!(snapshot.result.tier, Tier::Pro);
//! assert_eq!(builder.load().volume, 50.0);
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod analytics;
pub mod config;
pub mod debounce;
pub mod embed;
pub mod error;
pub mod estimator;
pub mod export;
pub mod format;
pub mod offline;
pub mod sections;
pub mod share;
pub mod snapshot;
pub mod storage;
pub mod subscribe;

// Re-export main types for convenience
pub use analytics::{
    AnalyticsEvent, AnalyticsSink, LogAnalytics, NoAnalytics, RecordingAnalytics, track,
};
pub use config::{
    AnalyticsConfig, CacheConfig, ShareConfig, SiteConfig, SnapshotConfig, StorageConfig,
    SubscribeConfig,
};
pub use debounce::Debouncer;
pub use embed::{EmbedPlan, VideoKind, classify, render_plan, to_embed_url};
pub use error::{Error, Result};
pub use estimator::{SnapshotInputs, SnapshotResult, Tier, WeightTable, compute};
pub use export::{Download, contact_link, snapshot_download};
pub use format::{format_eur, format_number};
pub use offline::{CachedResponse, Fetcher, HttpFetcher, OfflineCache, service_worker_js};
pub use sections::{OpenOutcome, Section, SectionStore, add_section};
pub use share::{ShareNetwork, share_text};
pub use snapshot::{Snapshot, SnapshotBuilder};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use subscribe::{SubscribeForm, SubscribeOutcome};
