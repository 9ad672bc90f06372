// src/config/options.rs
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::consts::*;
use crate::surface::Slot;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("cannot parse config {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppOptions {
    pub timing: TimingOptions,
    pub vocab: Vocabulary,
    pub sweep: SweepOptions,
    pub aggregate: AggregateOptions,
    pub selectors: SelectorMap,
    pub export: ExportOptions,
    pub store_dir: StoreDir,
}

impl AppOptions {
    /// Defaults when the file is missing; a present but broken file is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            logd!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        serde_json::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreDir(pub PathBuf);

impl Default for StoreDir {
    fn default() -> Self { Self(PathBuf::from(STORE_DIR)) }
}

/* ---------------- Timing ---------------- */

/// Poll intervals and budgets, all in milliseconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingOptions {
    pub close_poll_ms: u64,
    pub close_wait_ms: u64,
    pub open_poll_ms: u64,
    pub day_open_ms: u64,
    pub crew_open_ms: u64,
    pub settle_ms: u64,
    pub nav_poll_ms: u64,
    pub nav_confirm_ms: u64,
}

impl Default for TimingOptions {
    fn default() -> Self {
        Self {
            close_poll_ms: CLOSE_POLL_MS,
            close_wait_ms: CLOSE_WAIT_MS,
            open_poll_ms: OPEN_POLL_MS,
            day_open_ms: DAY_OPEN_MS,
            crew_open_ms: CREW_OPEN_MS,
            settle_ms: SETTLE_MS,
            nav_poll_ms: NAV_POLL_MS,
            nav_confirm_ms: NAV_CONFIRM_MS,
        }
    }
}

impl TimingOptions {
    pub fn close_poll(&self) -> Duration { Duration::from_millis(self.close_poll_ms) }
    pub fn close_wait(&self) -> Duration { Duration::from_millis(self.close_wait_ms) }
    pub fn open_poll(&self) -> Duration { Duration::from_millis(self.open_poll_ms) }
    pub fn day_open(&self) -> Duration { Duration::from_millis(self.day_open_ms) }
    pub fn crew_open(&self) -> Duration { Duration::from_millis(self.crew_open_ms) }
    pub fn settle(&self) -> Duration { Duration::from_millis(self.settle_ms) }
    pub fn nav_poll(&self) -> Duration { Duration::from_millis(self.nav_poll_ms) }
    pub fn nav_confirm(&self) -> Duration { Duration::from_millis(self.nav_confirm_ms) }
}

/* ---------------- Vocabulary ---------------- */

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDef {
    pub label: String,
    pub badge: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedTime {
    pub start: String,
    pub end: String,
}

/// Words and tables the roster and panels are read with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    pub roles: Vec<RoleDef>,
    /// First turn-code digit → location name.
    pub locations: BTreeMap<String, String>,
    /// Odd third digit.
    pub country_a: String,
    /// Even third digit.
    pub country_b: String,
    pub loading_markers: Vec<String>,
    pub section_marker: String,
    pub none_sentinels: Vec<String>,
    pub reserve_prefix: String,
    pub changed_suffix: String,
    pub train_prefixes: Vec<String>,
    /// TIL turns with fixed hours, keyed by normalized turn code.
    pub fixed_times: BTreeMap<String, FixedTime>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        let role = |label: &str, badge: &str| RoleDef { label: s!(label), badge: s!(badge) };
        let locations = [
            ("1", "Malmö"), ("2", "Helsingborg"), ("3", "Lund"), ("4", "Kristianstad"),
            ("5", "Göteborg"), ("6", "Halmstad"), ("7", "Kalmar"), ("8", "Växjö"),
            ("9", "Köpenhamn"),
        ]
        .into_iter()
        .map(|(k, v)| (s!(k), s!(v)))
        .collect();

        Self {
            roles: vec![
                role("Lokförare", "LF"),
                role("Tågmästare", "TM"),
                role("Tågvärd", "TV"),
                role("Ombordansvarig", "OBA"),
                role("Instruktör", "INS"),
                role("Trafikledare", "TL"),
            ],
            locations,
            country_a: s!("SE"),
            country_b: s!("DK"),
            loading_markers: vs!["Laddar", "Loading"],
            section_marker: s!("C"),
            none_sentinels: vs!["none"],
            reserve_prefix: s!("reserv"),
            changed_suffix: s!("TP"),
            train_prefixes: vs!["Tåg", "Train"],
            fixed_times: BTreeMap::new(),
        }
    }
}

impl Vocabulary {
    /// Longest role label contained in `line` (case-insensitive).
    pub fn role_in(&self, line: &str) -> Option<&RoleDef> {
        let lc = line.to_lowercase();
        self.roles
            .iter()
            .filter(|r| !r.label.is_empty() && lc.contains(&r.label.to_lowercase()))
            .max_by_key(|r| r.label.chars().count())
    }

    pub fn location_name(&self, code: &str) -> Option<&str> {
        self.locations.get(code).map(String::as_str)
    }

    pub fn fixed_time(&self, normalized: &str) -> Option<&FixedTime> {
        self.fixed_times.get(normalized)
    }

    pub fn is_loading(&self, text: &str) -> bool {
        let lc = text.to_lowercase();
        self.loading_markers.iter().any(|m| !m.is_empty() && lc.contains(&m.to_lowercase()))
    }

    pub fn is_none_sentinel(&self, s: &str) -> bool {
        let t = s.trim();
        self.none_sentinels.iter().any(|n| n.eq_ignore_ascii_case(t))
    }
}

/* ---------------- Runs ---------------- */

/// Bootstrap sweep shape: back `back`, forward `back + forward`, back `forward`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepOptions {
    pub back: u32,
    pub forward: u32,
}

impl Default for SweepOptions {
    fn default() -> Self { Self { back: SWEEP_BACK, forward: SWEEP_FORWARD } }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateOptions {
    pub window: usize,
    /// Reuse one scraped crew for the same train number on later days.
    pub reuse_crew_across_days: bool,
}

impl Default for AggregateOptions {
    fn default() -> Self { Self { window: DEFAULT_WINDOW, reuse_crew_across_days: false } }
}

/* ---------------- Selectors (bridge only) ---------------- */

/// Slot → CSS selector. Missing slots fall back to the built-in selector.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectorMap(pub BTreeMap<Slot, String>);

impl SelectorMap {
    pub fn css(&self, slot: Slot) -> &str {
        self.0.get(&slot).map(String::as_str).unwrap_or_else(|| default_css(slot))
    }
}

fn default_css(slot: Slot) -> &'static str {
    match slot {
        Slot::RosterEntry => ".roster .roster-entry",
        Slot::EntryName => ".name",
        Slot::DateLabel => ".date-nav .current-date",
        Slot::DayPanel => ".modal.day-schedule",
        Slot::CrewPanel => ".modal.train-crew",
        Slot::LegBlock => ".leg",
        Slot::LegHeader => ".leg-header",
        Slot::TripNumber => ".trip-number",
        Slot::TripDescription => ".trip-description",
        Slot::Vehicle => ".vehicle",
        Slot::ActivityLabel => ".activity-label",
        Slot::CrewHeader => ".crew-header",
        Slot::CrewChip => ".chip",
        Slot::StaffCard => ".staff-card",
        Slot::StaffName => ".staff-name",
        Slot::StaffRole => ".staff-role",
        Slot::StaffSchedule => ".staff-schedule",
        Slot::StaffPhone => ".staff-phone",
        Slot::Backdrop => ".modal-backdrop",
        Slot::CloseControl => ".modal .close",
        Slot::NavForward => ".date-nav .next",
        Slot::NavBack => ".date-nav .prev",
    }
}

/* ---------------- Export ---------------- */

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Tsv,
}

impl ExportFormat {
    pub fn ext(&self) -> &'static str {
        match self { ExportFormat::Csv => "csv", ExportFormat::Tsv => "tsv" }
    }
    pub fn delim(&self) -> char {
        match self { ExportFormat::Csv => ',', ExportFormat::Tsv => '\t' }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub include_headers: bool,
    pub out_dir: PathBuf,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Csv,
            include_headers: true,
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
        }
    }
}

impl ExportOptions {
    /// `<out_dir>/<stem>.<ext>`; the format decides the extension.
    pub fn out_path(&self, stem: &str) -> PathBuf {
        self.out_dir.join(join!(stem, ".", self.format.ext()))
    }
}
