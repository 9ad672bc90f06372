// src/data.rs
//
// The data model handed to presentation/export.
//
// - Roster / Person: one scrape of the visible day. Immutable once built;
//                    the next scrape replaces it wholesale.
// - Segment:         one leg of a day schedule (train ride or activity).
// - TrainCrew:       everyone on one train on one date.
// - DayRecord / AggregateResult: the multi-day itinerary.

use std::collections::BTreeMap;

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::consts::UNKNOWN_TIME;
use crate::core::scan::minutes;
use crate::specs::turn_code::TurnInfo;
use crate::surface::Handle;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

impl TimeRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self { start: start.into(), end: end.into() }
    }
}

/* ---------------- Roster ---------------- */

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub role: String,
    pub badge: String,
    pub turn_code: String,
    pub turn: TurnInfo,
    /// Final location: decoded, or from the cache when the code can't tell.
    pub loc: String,
    pub loc_name: String,
    pub loc_from_cache: bool,
    /// "HH:MM" or "unknown".
    pub shift_start: String,
    pub shift_end: String,
    /// Index into `Roster::handles`.
    pub el_idx: usize,
    pub phone: Option<String>,
    pub trains: Vec<String>,
}

impl Person {
    pub fn has_known_time(&self) -> bool {
        self.shift_start != UNKNOWN_TIME
    }

    pub fn start_minutes(&self) -> Option<u32> {
        minutes(&self.shift_start)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Roster {
    /// Date label as the app prints it.
    pub date_label: String,
    pub date: Option<NaiveDate>,
    pub people: Vec<Person>,
    /// Source roster entries in document order.
    #[serde(skip)]
    pub handles: Vec<Handle>,
}

impl Roster {
    /// Exact name match; the first (earliest) entry wins.
    pub fn find(&self, name: &str) -> Option<&Person> {
        self.people.iter().find(|p| p.name == name)
    }

    pub fn handle_of(&self, p: &Person) -> Option<Handle> {
        self.handles.get(p.el_idx).copied()
    }

    pub fn stats(&self) -> RosterStats {
        RosterStats::from_people(&self.people)
    }
}

/// Summary block shown next to the roster.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RosterStats {
    pub total: usize,
    pub by_badge: BTreeMap<String, usize>,
    pub by_location: BTreeMap<String, usize>,
    pub reserves: usize,
    pub changed: usize,
    pub overnight: usize,
    pub unknown_time: usize,
    pub location_from_cache: usize,
}

impl RosterStats {
    pub fn from_people(people: &[Person]) -> Self {
        let mut st = Self { total: people.len(), ..Default::default() };
        for p in people {
            let badge = if p.badge.is_empty() { "?" } else { p.badge.as_str() };
            *st.by_badge.entry(badge.to_string()).or_default() += 1;
            if !p.loc_name.is_empty() {
                *st.by_location.entry(p.loc_name.clone()).or_default() += 1;
            }
            if p.turn.is_reserve { st.reserves += 1; }
            if p.turn.is_changed { st.changed += 1; }
            if p.turn.overnight.is_some() { st.overnight += 1; }
            if !p.has_known_time() { st.unknown_time += 1; }
            if p.loc_from_cache { st.location_from_cache += 1; }
        }
        st
    }
}

/* ---------------- Day schedule ---------------- */

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentKind {
    Train {
        train_nr: String,
        train_type: String,
        vehicles: Vec<String>,
    },
    Activity {
        label: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub start: String,
    pub end: String,
    pub from: String,
    /// `None` for single-station legs.
    pub to: Option<String>,
    #[serde(flatten)]
    pub kind: SegmentKind,
}

impl Segment {
    pub fn train_nr(&self) -> Option<&str> {
        match &self.kind {
            SegmentKind::Train { train_nr, .. } if !train_nr.is_empty() => Some(train_nr),
            _ => None,
        }
    }
}

/* ---------------- Crew ---------------- */

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewMember {
    pub name: String,
    pub role: String,
    pub location: String,
    pub from: String,
    pub to: String,
    pub start: String,
    pub end: String,
    pub phone: Option<String>,
}

impl CrewMember {
    /// (start, end, from, to): who rides which stretch of the train.
    pub fn segment_key(&self) -> (&str, &str, &str, &str) {
        (&self.start, &self.end, &self.from, &self.to)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainCrew {
    pub train_nr: String,
    pub date: Option<NaiveDate>,
    pub vehicles: Vec<String>,
    pub crew: Vec<CrewMember>,
}

/// Crew sharing one stretch of a train.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CrewSegment {
    pub start: String,
    pub end: String,
    pub from: String,
    pub to: String,
    pub members: Vec<CrewMember>,
}

impl TrainCrew {
    /// Members grouped by segment key, first-seen order; one entry per name per segment.
    pub fn segments(&self) -> Vec<CrewSegment> {
        let mut out: Vec<CrewSegment> = Vec::new();
        for m in &self.crew {
            let (start, end, from, to) = m.segment_key();
            let idx = match out
                .iter()
                .position(|g| (g.start.as_str(), g.end.as_str(), g.from.as_str(), g.to.as_str()) == (start, end, from, to))
            {
                Some(i) => i,
                None => {
                    out.push(CrewSegment {
                        start: s!(start),
                        end: s!(end),
                        from: s!(from),
                        to: s!(to),
                        members: Vec::new(),
                    });
                    out.len() - 1
                }
            };
            let group = &mut out[idx];
            if !group.members.iter().any(|x| x.name == m.name) {
                group.members.push(m.clone());
            }
        }
        out
    }
}

/* ---------------- Itinerary ---------------- */

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRecord {
    pub date: NaiveDate,
    pub turn_code: String,
    pub shift_start: String,
    pub shift_end: String,
    /// Person absent that day, or the day panel never came up.
    /// Segments and crews are empty whenever this is set.
    pub not_found: bool,
    pub segments: Vec<Segment>,
    pub crews: BTreeMap<String, TrainCrew>,
}

impl DayRecord {
    pub fn not_found(date: NaiveDate) -> Self {
        Self {
            date,
            turn_code: s!(),
            shift_start: s!(UNKNOWN_TIME),
            shift_end: s!(UNKNOWN_TIME),
            not_found: true,
            segments: Vec::new(),
            crews: BTreeMap::new(),
        }
    }

    pub fn for_person(date: NaiveDate, p: &Person) -> Self {
        Self {
            date,
            turn_code: p.turn_code.clone(),
            shift_start: p.shift_start.clone(),
            shift_end: p.shift_end.clone(),
            not_found: false,
            segments: Vec::new(),
            crews: BTreeMap::new(),
        }
    }

    /// Mark as not found, dropping anything partially gathered.
    pub fn degrade(&mut self) {
        self.not_found = true;
        self.segments.clear();
        self.crews.clear();
    }

    /// Distinct train numbers in leg order.
    pub fn train_numbers(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for nr in self.segments.iter().filter_map(Segment::train_nr) {
            if !out.iter().any(|x| x == nr) {
                out.push(s!(nr));
            }
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub person_name: String,
    pub captured_at: DateTime<Local>,
    /// Ascending by date, one per requested day.
    pub days: Vec<DayRecord>,
}
