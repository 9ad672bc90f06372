// src/file.rs

use std::{
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::config::options::ExportOptions;
use crate::core::sanitize::sanitize_filename;
use crate::csv::to_export_string;
use crate::data::{AggregateResult, Roster, SegmentKind};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("path exists but is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("cannot write {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
}

/// `<out_dir>/roster_<date>.<ext>`. Returns the path written.
pub fn export_roster(roster: &Roster, export: &ExportOptions) -> Result<PathBuf, ExportError> {
    let day = roster.date.map(|d| d.to_string()).unwrap_or_else(|| roster.date_label.clone());
    let stem = join!("roster_", &sanitize_filename(&day, "today"));
    let (headers, rows) = roster_table(roster);
    write_table(export, &stem, &headers, &rows)
}

/// `<out_dir>/itinerary_<name>_<first date>.<ext>`: one row per leg, plus one
/// per crew member on train legs; absent days get a single marker row.
pub fn export_itinerary(result: &AggregateResult, export: &ExportOptions) -> Result<PathBuf, ExportError> {
    let first = result.days.first().map(|d| d.date.to_string()).unwrap_or_default();
    let stem = join!("itinerary_", &sanitize_filename(&result.person_name, "person"), "_", &first);
    let (headers, rows) = itinerary_table(result);
    write_table(export, &stem, &headers, &rows)
}

fn write_table(
    export: &ExportOptions,
    stem: &str,
    headers: &[String],
    rows: &[Vec<String>],
) -> Result<PathBuf, ExportError> {
    let path = export.out_path(stem);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_directory(parent)?;
        }
    }
    let headers = export.include_headers.then_some(headers);
    let contents = to_export_string(headers, rows, export.format.delim());
    fs::write(&path, contents).map_err(|source| ExportError::Write { path: path.clone(), source })?;
    logf!("Exported {} row(s) to {}", rows.len(), path.display());
    Ok(path)
}

pub fn ensure_directory(dir: &Path) -> Result<(), ExportError> {
    if dir.exists() && !dir.is_dir() {
        return Err(ExportError::NotADirectory(dir.to_path_buf()));
    }
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|source| ExportError::Write { path: dir.to_path_buf(), source })?;
    }
    Ok(())
}

/* ---------------- Tables ---------------- */

pub fn roster_table(roster: &Roster) -> (Vec<String>, Vec<Vec<String>>) {
    let headers = vs![
        "Name", "Role", "Badge", "Turn", "Location", "Country", "Reserve", "Changed", "Overnight", "Start",
        "End", "Phone", "Trains"
    ];
    let flag = |b: bool| if b { s!("yes") } else { s!() };
    let rows = roster
        .people
        .iter()
        .map(|p| {
            let mut loc = p.loc_name.clone();
            if p.loc_from_cache && !loc.is_empty() {
                loc.push('*');
            }
            vec![
                p.name.clone(),
                p.role.clone(),
                p.badge.clone(),
                p.turn_code.clone(),
                loc,
                p.turn.country.clone(),
                flag(p.turn.is_reserve),
                flag(p.turn.is_changed),
                p.turn.overnight.map(|o| format!("{o:?}")).unwrap_or_default(),
                p.shift_start.clone(),
                p.shift_end.clone(),
                p.phone.clone().unwrap_or_default(),
                p.trains.join(" "),
            ]
        })
        .collect();
    (headers, rows)
}

pub fn itinerary_table(result: &AggregateResult) -> (Vec<String>, Vec<Vec<String>>) {
    let headers = vs![
        "Date", "Turn", "Shift", "Leg", "From", "To", "Train", "Activity", "Vehicles", "Crew", "Crew role",
        "Crew stretch", "Crew phone"
    ];
    let mut rows = Vec::new();
    for d in &result.days {
        let shift = format!("{}-{}", d.shift_start, d.shift_end);
        let day = d.date.to_string();
        if d.not_found {
            rows.push(vec![day, d.turn_code.clone(), shift, s!("not found")]);
            continue;
        }
        for seg in &d.segments {
            let leg = format!("{}-{}", seg.start, seg.end);
            let to = seg.to.clone().unwrap_or_default();
            let base = |train: &str, activity: &str, vehicles: &str| {
                vec![
                    day.clone(),
                    d.turn_code.clone(),
                    shift.clone(),
                    leg.clone(),
                    seg.from.clone(),
                    to.clone(),
                    s!(train),
                    s!(activity),
                    s!(vehicles),
                ]
            };
            match &seg.kind {
                SegmentKind::Activity { label } => rows.push(base("", label, "")),
                SegmentKind::Train { train_nr, vehicles, .. } => {
                    let v = vehicles.join(" ");
                    let members = d.crews.get(train_nr).map(|c| c.crew.as_slice()).unwrap_or_default();
                    if members.is_empty() {
                        rows.push(base(train_nr, "", &v));
                    }
                    for m in members {
                        let mut row = base(train_nr, "", &v);
                        row.push(m.name.clone());
                        row.push(m.role.clone());
                        row.push(format!("{} {}-{} {}", m.from, m.start, m.end, m.to));
                        row.push(m.phone.clone().unwrap_or_default());
                        rows.push(row);
                    }
                }
            }
        }
    }
    (headers, rows)
}
