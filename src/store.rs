// src/store.rs
//
// LocationTimeCache: what we have learned about people across days.
//
// - location: name → last non-ambiguous location (written by roster parsing)
// - time:     (name, date) → shift start/end (written by time resolution only)
// - built:    set once the bootstrap sweep has covered its window
//
// Lives as long as the session; only `reset` clears it. A CSV snapshot under
// the store dir lets a later session pick up where this one left off.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::config::consts::CACHE_FILE;
use crate::core::scan::is_changed_reserve;
use crate::csv::{parse_rows, write_row};
use crate::data::TimeRange;
use crate::specs::turn_code::TurnInfo;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedLocation {
    pub loc: String,
    pub loc_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocationTimeCache {
    locations: BTreeMap<String, CachedLocation>,
    times: BTreeMap<(String, NaiveDate), TimeRange>,
    built: bool,
}

impl LocationTimeCache {
    pub fn new() -> Self { Self::default() }

    /// Remember `name`'s location from one decoded turn code.
    /// Ambiguous decodes are ignored; returns whether anything was written.
    pub fn observe(&mut self, name: &str, raw_code: &str, turn: &TurnInfo) -> bool {
        if name.is_empty() || !turn.has_location() {
            return false;
        }
        if is_changed_reserve(raw_code) || turn.is_changed_reserve() {
            return false;
        }
        let entry = CachedLocation { loc: turn.loc.clone(), loc_name: turn.loc_name.clone() };
        if self.locations.get(name) != Some(&entry) {
            logd!("cache: {name} → {} ({})", entry.loc, entry.loc_name);
            self.locations.insert(s!(name), entry);
        }
        true
    }

    pub fn location_of(&self, name: &str) -> Option<&CachedLocation> {
        self.locations.get(name)
    }

    pub fn time_of(&self, name: &str, date: NaiveDate) -> Option<&TimeRange> {
        self.times.get(&(s!(name), date))
    }

    pub fn record_time(&mut self, name: &str, date: NaiveDate, range: TimeRange) {
        self.times.insert((s!(name), date), range);
    }

    pub fn is_built(&self) -> bool { self.built }
    pub fn mark_built(&mut self) { self.built = true; }

    pub fn reset(&mut self) {
        self.locations.clear();
        self.times.clear();
        self.built = false;
    }

    pub fn location_count(&self) -> usize { self.locations.len() }
    pub fn time_count(&self) -> usize { self.times.len() }

    pub fn locations(&self) -> impl Iterator<Item = (&String, &CachedLocation)> {
        self.locations.iter()
    }

    pub fn times(&self) -> impl Iterator<Item = (&(String, NaiveDate), &TimeRange)> {
        self.times.iter()
    }

    /* ---------------- Snapshot ---------------- */

    pub fn path_in(dir: &Path) -> PathBuf { dir.join(CACHE_FILE) }

    /// Rows: `B` (built), `L,name,loc,loc_name`, `T,name,date,start,end`.
    pub fn save(&self, dir: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = Self::path_in(dir);
        let mut buf: Vec<u8> = Vec::new();
        if self.built {
            write_row(&mut buf, &vs!["B"], ',')?;
        }
        for (name, l) in &self.locations {
            write_row(&mut buf, &[s!("L"), name.clone(), l.loc.clone(), l.loc_name.clone()], ',')?;
        }
        for ((name, date), t) in &self.times {
            let row = [s!("T"), name.clone(), date.to_string(), t.start.clone(), t.end.clone()];
            write_row(&mut buf, &row, ',')?;
        }
        fs::write(&path, buf)?;
        Ok(path)
    }

    /// Missing file → empty cache. Rows that don't fit are skipped.
    pub fn load(dir: &Path) -> io::Result<Self> {
        let path = Self::path_in(dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)?;
        let mut c = Self::default();
        for row in parse_rows(&text, ',') {
            match row.first().map(String::as_str) {
                Some("B") => c.built = true,
                Some("L") if row.len() >= 4 && !row[1].is_empty() && !row[2].is_empty() => {
                    let entry = CachedLocation { loc: row[2].clone(), loc_name: row[3].clone() };
                    c.locations.insert(row[1].clone(), entry);
                }
                Some("T") if row.len() >= 5 => {
                    if let Ok(d) = NaiveDate::parse_from_str(&row[2], "%Y-%m-%d") {
                        c.times.insert((row[1].clone(), d), TimeRange::new(row[3].clone(), row[4].clone()));
                    }
                }
                _ => logd!("cache: skipping row {row:?}"),
            }
        }
        Ok(c)
    }
}
