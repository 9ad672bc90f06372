// src/specs/roster.rs
//
// Visible roster → Vec<Person>.
//
// Entry text looks roughly like this (line order varies between views):
//
//   Anna Svensson
//   Lokförare
//   C
//   51284A
//   06:12 - 15:30
//   +46 70 123 45 67
//   Tåg 1045
//
// Two passes: decode every entry and feed clear locations to the cache,
// then resolve cache fallbacks. An entry early in the list can then borrow
// what a later entry (same name, other turn) revealed.

use chrono::NaiveDate;

use crate::config::consts::UNKNOWN_TIME;
use crate::config::options::Vocabulary;
use crate::core::scan::{digit_run, find_iso_date, find_time_range};
use crate::data::{Person, Roster};
use crate::specs::turn_code;
use crate::store::LocationTimeCache;
use crate::surface::{Handle, Slot, Surface, SurfaceError};

/// One roster entry as read off the page.
#[derive(Clone, Debug)]
pub struct RawEntry {
    pub handle: Handle,
    pub name: Option<String>,
    pub lines: Vec<String>,
}

pub fn parse<S: Surface + ?Sized>(
    surface: &S,
    vocab: &Vocabulary,
    cache: &mut LocationTimeCache,
) -> Result<Roster, SurfaceError> {
    let label = surface.date_label()?;
    let entries = read_entries(surface)?;
    Ok(build(&label, entries, vocab, cache))
}

pub fn read_entries<S: Surface + ?Sized>(surface: &S) -> Result<Vec<RawEntry>, SurfaceError> {
    let handles = surface.query(None, Slot::RosterEntry)?;
    let mut out = Vec::with_capacity(handles.len());
    for h in handles {
        out.push(RawEntry {
            handle: h,
            name: surface.slot_text(h, Slot::EntryName)?,
            lines: surface.lines(h)?,
        });
    }
    Ok(out)
}

struct Draft {
    person: Person,
    direct_time: bool,
}

/// Pure half of `parse`: same entries + same cache → same roster.
pub fn build(
    date_label: &str,
    entries: Vec<RawEntry>,
    vocab: &Vocabulary,
    cache: &mut LocationTimeCache,
) -> Roster {
    let date = find_iso_date(date_label);
    let mut handles = Vec::with_capacity(entries.len());
    let mut drafts = Vec::with_capacity(entries.len());

    // Pass 1: decode, remember clear locations.
    for (idx, e) in entries.into_iter().enumerate() {
        handles.push(e.handle);
        match read_person(idx, &e, vocab) {
            Some(d) => {
                cache.observe(&d.person.name, &d.person.turn_code, &d.person.turn);
                drafts.push(d);
            }
            None => logd!("roster: entry {idx} has no name, skipped"),
        }
    }

    // Pass 2: fallbacks.
    let mut people: Vec<Person> = Vec::with_capacity(drafts.len());
    for d in drafts {
        let mut p = d.person;
        resolve_location(&mut p, cache);
        if !d.direct_time {
            resolve_time(&mut p, date, vocab, cache);
        }
        if people.iter().any(|q| q.name == p.name && q.shift_start == p.shift_start) {
            logd!("roster: duplicate {} @ {}", p.name, p.shift_start);
            continue;
        }
        people.push(p);
    }

    // Known starts ascending, unknown last; stable among ties.
    people.sort_by_key(|p| p.start_minutes().unwrap_or(u32::MAX));

    Roster { date_label: s!(date_label), date, people, handles }
}

fn read_person(idx: usize, e: &RawEntry, vocab: &Vocabulary) -> Option<Draft> {
    let name = e
        .name
        .clone()
        .or_else(|| e.lines.first().cloned())
        .filter(|n| !n.is_empty())?;

    // Everything but the first occurrence of the name line.
    let mut body: Vec<&str> = Vec::with_capacity(e.lines.len());
    let mut skipped = false;
    for l in &e.lines {
        if !skipped && *l == name {
            skipped = true;
            continue;
        }
        body.push(l);
    }

    let (role, badge) = body
        .iter()
        .find_map(|l| vocab.role_in(l))
        .map(|r| (r.label.clone(), r.badge.clone()))
        .unwrap_or_default();

    let turn_code = find_turn_code(&body, vocab).unwrap_or_default();
    let turn = turn_code::decode(&turn_code, vocab);

    let (shift_start, shift_end, direct_time) = match find_time_range(&body.join("\n")) {
        Some((s, e)) => (s, e, true),
        None => (s!(UNKNOWN_TIME), s!(UNKNOWN_TIME), false),
    };

    let phone = body.iter().find(|l| is_phone(l)).map(|l| l.to_string());
    let trains = body
        .iter()
        .filter(|l| vocab.train_prefixes.iter().any(|p| !p.is_empty() && l.starts_with(p.as_str())))
        .filter_map(|l| digit_run(l, 1, 6))
        .collect();

    let person = Person {
        name,
        role,
        badge,
        loc: turn.loc.clone(),
        loc_name: turn.loc_name.clone(),
        loc_from_cache: false,
        turn_code,
        turn,
        shift_start,
        shift_end,
        el_idx: idx,
        phone,
        trains,
    };
    Some(Draft { person, direct_time })
}

/// (a) the line after a lone section marker, else (b) the first code-shaped line.
fn find_turn_code(body: &[&str], vocab: &Vocabulary) -> Option<String> {
    let marker = vocab.section_marker.as_str();
    if !marker.is_empty() {
        if let Some(i) = body.iter().position(|l| *l == marker) {
            if let Some(next) = body.get(i + 1) {
                return Some(next.to_string());
            }
        }
    }
    body.iter()
        .find(|l| turn_code::looks_like_turn_code(l, vocab))
        .map(|l| l.to_string())
}

fn resolve_location(p: &mut Person, cache: &LocationTimeCache) {
    if p.turn.is_changed_reserve() || !p.turn.has_location() {
        p.loc.clear();
        p.loc_name.clear();
        if let Some(c) = cache.location_of(&p.name) {
            p.loc = c.loc.clone();
            p.loc_name = c.loc_name.clone();
            p.loc_from_cache = true;
        }
    }
}

fn resolve_time(p: &mut Person, date: Option<NaiveDate>, vocab: &Vocabulary, cache: &LocationTimeCache) {
    let key = turn_code::normalize(&p.turn_code, vocab);
    if let Some(f) = vocab.fixed_time(&key) {
        p.shift_start = f.start.clone();
        p.shift_end = f.end.clone();
        return;
    }
    if let Some(t) = date.and_then(|d| cache.time_of(&p.name, d)) {
        p.shift_start = t.start.clone();
        p.shift_end = t.end.clone();
    }
}

fn is_phone(line: &str) -> bool {
    let t = line.trim();
    t.starts_with('+') && t.chars().filter(char::is_ascii_digit).count() >= 7
}
