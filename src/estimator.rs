//! Snapshot estimator: tier, lead time and cost range from a few answers.
//!
//! [`compute`] is pure and total. Malformed numbers degrade to defaults
//! instead of failing so the lead form is never blocked.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::format::{format_eur, format_number, round_half_up};

/// Score at or above which the tier is [`Tier::Enterprise`].
pub const ENTERPRISE_THRESHOLD: f64 = 40.0;

/// Score at or above which the tier is [`Tier::Pro`].
pub const PRO_THRESHOLD: f64 = 15.0;

/// Upper end of the complexity slider, shown in the bullet text.
pub const MAX_COMPLEXITY: u32 = 5;

/// Weight assumed for unknown task types and for an empty selection.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Task types offered on the page, in display order, with their effort weight.
pub const TASK_WEIGHTS: [(&str, f64); 5] = [
    ("emails", 1.0),
    ("scraping", 1.2),
    ("files", 0.9),
    ("reports", 1.1),
    ("integration", 1.4),
];

/// Fixed mapping from task-type tag to effort weight.
#[derive(Debug, Clone, Copy)]
pub struct WeightTable {
    entries: &'static [(&'static str, f64)],
}

impl Default for WeightTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl WeightTable {
    /// The table used by the page.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            entries: &TASK_WEIGHTS,
        }
    }

    /// Weight of `tag`, or [`DEFAULT_WEIGHT`] when the tag is unknown.
    #[must_use]
    pub fn weight(&self, tag: &str) -> f64 {
        self.entries
            .iter()
            .find(|(t, _)| *t == tag)
            .map_or(DEFAULT_WEIGHT, |(_, w)| *w)
    }

    /// Position of `tag` in display order.
    #[must_use]
    pub fn position(&self, tag: &str) -> Option<usize> {
        self.entries.iter().position(|(t, _)| *t == tag)
    }

    /// Whether `tag` is one of the offered task types.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.position(tag).is_some()
    }

    /// Canonical form of a selection: each known tag once in display
    /// order, then each unknown tag once in the order first seen.
    #[must_use]
    pub fn canonical<S: AsRef<str>>(&self, tags: &[S]) -> Vec<String> {
        let mut out: Vec<String> = self
            .tags()
            .filter(|known| tags.iter().any(|t| t.as_ref() == *known))
            .map(ToString::to_string)
            .collect();
        for tag in tags {
            let tag = tag.as_ref();
            if !self.contains(tag) && !out.iter().any(|t| t == tag) {
                out.push(tag.to_string());
            }
        }
        out
    }

    /// Known tags in display order.
    pub fn tags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(t, _)| *t)
    }

    /// Arithmetic mean of the selected tags' weights; 1 for no selection.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn average<S: AsRef<str>>(&self, tags: &[S]) -> f64 {
        if tags.is_empty() {
            return DEFAULT_WEIGHT;
        }
        let total: f64 = tags.iter().map(|t| self.weight(t.as_ref())).sum();
        total / tags.len() as f64
    }
}

/// Pricing and service category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    Starter,
    Pro,
    Enterprise,
}

impl Tier {
    /// Picks the highest tier whose threshold `score` reaches.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= ENTERPRISE_THRESHOLD {
            Self::Enterprise
        } else if score >= PRO_THRESHOLD {
            Self::Pro
        } else {
            Self::Starter
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Starter => "Starter",
            Self::Pro => "Pro",
            Self::Enterprise => "Enterprise",
        }
    }

    /// One-line proposal description, keyed by tier only.
    #[must_use]
    pub fn description(self) -> String {
        format!("Propuesta {self}: trabajo recomendado y beneficios principales.")
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Writes integral values as JSON integers, like the page's `JSON.stringify`.
#[allow(clippy::trivially_copy_pass_by_ref, clippy::cast_possible_truncation)]
fn serialize_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

/// Replaces NaN and infinities with zero.
fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Parses control text the way a lenient number input does: blank and
/// garbage become zero.
#[must_use]
pub fn parse_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    trimmed.parse::<f64>().map_or(0.0, finite_or_zero)
}

/// Answers collected by the snapshot form.
///
/// Also the persisted record: `{types, volume, complexity, budget, email}`.
/// Missing fields fall back to [`SnapshotInputs::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotInputs {
    /// Selected task-type tags.
    pub types: Vec<String>,
    /// Requests per week.
    #[serde(serialize_with = "serialize_number")]
    pub volume: f64,
    /// Complexity slider, 1 to 5.
    #[serde(serialize_with = "serialize_number")]
    pub complexity: f64,
    /// Indicated budget in euros; zero means not given.
    #[serde(serialize_with = "serialize_number")]
    pub budget: f64,
    /// Contact address typed into the form.
    pub email: Option<String>,
}

impl Default for SnapshotInputs {
    fn default() -> Self {
        Self {
            types: Vec::new(),
            volume: 0.0,
            complexity: 1.0,
            budget: 0.0,
            email: None,
        }
    }
}

impl SnapshotInputs {
    /// Builds inputs from raw control text. Never fails.
    #[must_use]
    pub fn from_raw<S: AsRef<str>>(
        types: &[S],
        volume: &str,
        complexity: &str,
        budget: &str,
        email: &str,
    ) -> Self {
        let email = email.trim();
        Self {
            types: types.iter().map(|t| t.as_ref().to_string()).collect(),
            volume: parse_number(volume),
            complexity: parse_number(complexity),
            budget: parse_number(budget),
            email: (!email.is_empty()).then(|| email.to_string()),
        }
    }

    /// Returns a copy with the selection in canonical order and every
    /// number clamped into its valid range.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            types: WeightTable::standard().canonical(&self.types),
            volume: finite_or_zero(self.volume).max(0.0),
            complexity: finite_or_zero(self.complexity).max(1.0),
            budget: finite_or_zero(self.budget).max(0.0),
            email: self.email.clone(),
        }
    }

    /// Flips a task-type button.
    ///
    /// Known tags stay in display order; unknown tags follow in the order
    /// they were added.
    pub fn toggle_type(&mut self, tag: &str) {
        if let Some(pos) = self.types.iter().position(|t| t == tag) {
            self.types.remove(pos);
            return;
        }
        self.types.push(tag.to_string());
        self.types = WeightTable::standard().canonical(&self.types);
    }

    /// The contact address, or the placeholder used when none was given.
    #[must_use]
    pub fn contact_email(&self) -> &str {
        self.email
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or("[no proporcionado]")
    }
}

/// Derived estimate. Regenerated on every change, never stored by itself.
///
/// Serializes to the downloadable `snapshot.json` shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResult {
    pub types: Vec<String>,
    #[serde(serialize_with = "serialize_number")]
    pub volume: f64,
    #[serde(serialize_with = "serialize_number")]
    pub complexity: f64,
    #[serde(serialize_with = "serialize_number")]
    pub budget: f64,
    pub tier: Tier,
    pub lead_weeks: u32,
    pub est_min: u64,
    pub est_max: u64,
    /// Human-readable lines in fixed display order.
    pub bullets: Vec<String>,
}

impl SnapshotResult {
    /// The normalized inputs the result was computed from, without the email.
    #[must_use]
    pub fn into_inputs(self) -> SnapshotInputs {
        SnapshotInputs {
            types: self.types,
            volume: self.volume,
            complexity: self.complexity,
            budget: self.budget,
            email: None,
        }
    }

    /// Tier description shown under the headline.
    #[must_use]
    pub fn description(&self) -> String {
        self.tier.description()
    }

    /// Cost range, e.g. `498 € – 1196 €`.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn range(&self) -> String {
        format!(
            "{} – {}",
            format_eur(self.est_min as f64),
            format_eur(self.est_max as f64)
        )
    }

    /// Headline, e.g. `Pro · 498 € – 1196 €`.
    #[must_use]
    pub fn headline(&self) -> String {
        format!("{} · {}", self.tier, self.range())
    }

    /// Plain-text summary for the clipboard: tier line then bullet lines.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn clipboard_text(&self) -> String {
        let mut lines = Vec::with_capacity(self.bullets.len() + 1);
        lines.push(format!(
            "Snapshot: {} · {}–{}",
            self.tier,
            format_eur(self.est_min as f64),
            format_eur(self.est_max as f64)
        ));
        lines.extend(self.bullets.iter().cloned());
        lines.join("\n")
    }

    /// Body of the prefilled demo request.
    #[must_use]
    pub fn contact_message(&self, contact_email: &str) -> String {
        format!(
            "Hola,\n\nHe generado un snapshot:\n- Casos: {}\n- Volumen: {}\n- Complejidad: {}\n- Rango estimado: {}\n\nMe interesaría una demo basada en estos datos.\nEmail de contacto: {}",
            self.types.join(", "),
            format_number(self.volume),
            format_number(self.complexity),
            self.range(),
            contact_email,
        )
    }
}

/// Computes the snapshot with the standard weight table.
#[must_use]
pub fn compute(inputs: &SnapshotInputs) -> SnapshotResult {
    compute_with(inputs, &WeightTable::standard())
}

/// Score driving tier selection: `(volume / 10) * complexity * weightAvg`.
#[must_use]
pub fn score(inputs: &SnapshotInputs, table: &WeightTable) -> f64 {
    let inputs = inputs.normalized();
    (inputs.volume / 10.0) * inputs.complexity * table.average(&inputs.types)
}

/// Computes the snapshot against an explicit weight table.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
#[must_use]
pub fn compute_with(inputs: &SnapshotInputs, table: &WeightTable) -> SnapshotResult {
    let inputs = inputs.normalized();
    let SnapshotInputs {
        types,
        volume,
        complexity,
        budget,
        ..
    } = inputs;

    let weight_avg = table.average(&types);
    let score = (volume / 10.0) * complexity * weight_avg;
    let tier = Tier::from_score(score);

    let lead_weeks = (complexity * 1.5).ceil().max(1.0) as u32;
    let est_min = round_half_up(complexity * 150.0 + weight_avg * 40.0) as u64;
    let est_max = round_half_up(est_min as f64 * 2.2 + volume * 2.0) as u64;

    let mut bullets = Vec::with_capacity(6);
    if !types.is_empty() {
        bullets.push(format!("Casos: {}", types.join(", ")));
    }
    bullets.push(format!("Volumen estimado: {} / semana", format_number(volume)));
    bullets.push(format!(
        "Complejidad: {} / {MAX_COMPLEXITY}",
        format_number(complexity)
    ));
    bullets.push(format!("Tiempo estimado para demo: {lead_weeks} semanas"));
    bullets.push(format!(
        "Rango orientativo: {} – {}",
        format_eur(est_min as f64),
        format_eur(est_max as f64)
    ));
    if budget > 0.0 {
        bullets.push(format!("Presupuesto indicado: {}", format_eur(budget)));
    }

    SnapshotResult {
        types,
        volume,
        complexity,
        budget,
        tier,
        lead_weeks,
        est_min,
        est_max,
        bullets,
    }
}
