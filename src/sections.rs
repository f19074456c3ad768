//! Feature sections and the video link each one stores.

use chrono::Utc;
use serde::Serialize;

use crate::embed::{EmbedPlan, render_plan};
use crate::storage::KeyValueStore;

/// Prefix namespacing section video keys in the store.
pub const STORAGE_PREFIX: &str = "features:video:";

/// Description shown under a newly added section's heading.
pub const NEW_SECTION_DESCRIPTION: &str = "Descripción de la sección";

/// A feature section on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub key: String,
    pub title: String,
    pub description: String,
}

/// Result of the "open" control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    /// Open this link in a new window.
    Open(String),
    /// The section has no video; tell the visitor instead.
    NoVideo,
}

/// Per-section video link persistence over a key-value store.
///
/// Reads and writes are best-effort: failures are logged and treated as
/// "no video".
#[derive(Debug)]
pub struct SectionStore<S> {
    store: S,
}

impl<S: KeyValueStore> SectionStore<S> {
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Borrow the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    fn storage_key(key: &str) -> String {
        format!("{STORAGE_PREFIX}{key}")
    }

    /// Stores `url` for section `key`. An empty string means no video.
    pub fn save(&self, key: &str, url: &str) {
        if let Err(e) = self.store.set(&Self::storage_key(key), url) {
            log::warn!("could not save video for section {key}: {e}");
        }
    }

    /// The link stored for section `key`, or an empty string.
    #[must_use]
    pub fn load(&self, key: &str) -> String {
        match self.store.get(&Self::storage_key(key)) {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                log::warn!("could not load video for section {key}: {e}");
                String::new()
            }
        }
    }

    /// What the section's video container should show.
    #[must_use]
    pub fn render(&self, key: &str) -> EmbedPlan {
        render_plan(&self.load(key))
    }

    /// Applies the edit prompt's answer. `None` means the prompt was
    /// cancelled; a blank answer clears the video.
    pub fn edit(&self, key: &str, answer: Option<&str>) -> EmbedPlan {
        if let Some(answer) = answer {
            let trimmed = answer.trim();
            log::debug!("section {key}: video set to {trimmed:?}");
            self.save(key, trimmed);
        }
        self.render(key)
    }

    /// Clears the video once the visitor confirmed.
    pub fn remove(&self, key: &str, confirmed: bool) -> EmbedPlan {
        if confirmed {
            log::debug!("section {key}: video removed");
            self.save(key, "");
        }
        self.render(key)
    }

    /// Link to open in a new window, if the section has one.
    #[must_use]
    pub fn open(&self, key: &str) -> OpenOutcome {
        let url = self.load(key);
        if url.is_empty() {
            OpenOutcome::NoVideo
        } else {
            OpenOutcome::Open(url)
        }
    }
}

/// Builds a new custom section from the title prompt's answer.
///
/// Returns `None` when the prompt was cancelled or left blank. The key is
/// `custom-<unix millis>`.
#[must_use]
pub fn add_section(title: Option<&str>) -> Option<Section> {
    let title = title.filter(|t| !t.is_empty())?;
    Some(Section {
        key: format!("custom-{}", Utc::now().timestamp_millis()),
        title: title.to_string(),
        description: NEW_SECTION_DESCRIPTION.to_string(),
    })
}
