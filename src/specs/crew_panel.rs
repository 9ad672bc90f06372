// src/specs/crew_panel.rs
//
// Open crew panel → TrainCrew.
//
//   header   "Tåg 1045 Malmö C – Göteborg C"  → train number (first 3–5 digit run)
//   chips    "X31 4321" …                      → vehicles, order kept
//   date     "2025-03-10"
//   cards    name / "Tågvärd Malmö" / "Malmö C 06:12-08:40 Göteborg C" / "+46 …"

use std::sync::LazyLock;

use regex::Regex;

use crate::core::sanitize::{normalize_ws, split_first_ws};
use crate::core::scan::{digit_run, find_iso_date, hhmm};
use crate::data::{CrewMember, TrainCrew};
use crate::surface::{Handle, Slot, Surface, SurfaceError};

static SCHEDULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<from>\S.*?)\s+(?P<s>\d{1,2}:\d{2})\s*[-–—]\s*(?P<e>\d{1,2}:\d{2})\s+(?P<to>\S.*?)\s*$")
        .expect("crew schedule pattern")
});

static PHONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\+[\d ]{7,}").expect("phone pattern"));

pub fn extract<S: Surface + ?Sized>(surface: &S, panel: Handle) -> Result<TrainCrew, SurfaceError> {
    let lines = surface.lines(panel)?;

    let header = match surface.slot_text(panel, Slot::CrewHeader)? {
        Some(h) => h,
        None => lines.first().cloned().unwrap_or_default(),
    };
    let train_nr = digit_run(&header, 3, 5).unwrap_or_default();

    let mut vehicles = Vec::new();
    for chip in surface.query(Some(panel), Slot::CrewChip)? {
        let t = normalize_ws(&surface.text(chip)?);
        if !t.is_empty() { vehicles.push(t); }
    }

    let date = find_iso_date(&lines.join("\n"));

    let mut crew: Vec<CrewMember> = Vec::new();
    for (i, card) in surface.query(Some(panel), Slot::StaffCard)?.into_iter().enumerate() {
        let Some(m) = read_card(surface, card)? else {
            logd!("crew {train_nr}: card {i} has no name, dropped");
            continue;
        };
        if crew.iter().any(|c| c.name == m.name && c.segment_key() == m.segment_key()) {
            continue;
        }
        crew.push(m);
    }

    Ok(TrainCrew { train_nr, date, vehicles, crew })
}

fn read_card<S: Surface + ?Sized>(surface: &S, card: Handle) -> Result<Option<CrewMember>, SurfaceError> {
    let Some(name) = surface.slot_text(card, Slot::StaffName)? else { return Ok(None) };
    let lines = surface.lines(card)?;

    let (role, location) = surface
        .slot_text(card, Slot::StaffRole)?
        .map(|r| split_first_ws(&r))
        .unwrap_or_default();

    let schedule = match surface.slot_text(card, Slot::StaffSchedule)? {
        Some(s) => parse_schedule(&s),
        None => lines.iter().find_map(|l| parse_schedule(l)),
    };
    let (from, start, end, to) = schedule.unwrap_or_default();

    let phone = match surface.slot_text(card, Slot::StaffPhone)? {
        Some(p) => Some(p),
        None => PHONE.find(&lines.join("\n")).map(|m| m.as_str().trim().to_string()),
    };

    Ok(Some(CrewMember { name, role, location, from, to, start, end, phone }))
}

/// "(Station) HH:MM-HH:MM (Station)" → (from, start, end, to).
pub fn parse_schedule(line: &str) -> Option<(String, String, String, String)> {
    let c = SCHEDULE.captures(line)?;
    Some((
        normalize_ws(&c["from"]),
        hhmm(&c["s"])?,
        hhmm(&c["e"])?,
        normalize_ws(&c["to"]),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::memory::{
        CardScene, CrewScene, DayScene, EntryScene, LegScene, MemorySurface, PanelScene, Scene,
    };

    fn card(name: Option<&str>, sched: &str) -> CardScene {
        CardScene {
            name: name.map(|n| s!(n)),
            role: Some(s!("Tågvärd  Malmö")),
            schedule: Some(s!(sched)),
            phone: None,
            lines: vs!["Tel +46 70 123 45 67"],
        }
    }

    fn open_crew(crew: CrewScene) -> (MemorySurface, Handle) {
        let s = MemorySurface::new(Scene {
            days: vec![DayScene {
                label: s!("2025-03-10"),
                entries: vec![EntryScene {
                    name: s!("Anna Svensson"),
                    lines: vec![],
                    panel: Some(PanelScene {
                        legs: vec![LegScene {
                            header: s!("Malmö C 06:12 - 08:40 Göteborg C"),
                            trip_number: Some(s!("1045")),
                            crew: Some(crew),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                }],
            }],
            ..Default::default()
        });
        let e = s.first(None, Slot::RosterEntry).unwrap().unwrap();
        s.trigger(e).unwrap();
        let day = s.first(None, Slot::DayPanel).unwrap().unwrap();
        let trip = s.first(Some(day), Slot::TripNumber).unwrap().unwrap();
        s.trigger(trip).unwrap();
        let panel = s.first(None, Slot::CrewPanel).unwrap().unwrap();
        (s, panel)
    }

    #[test]
    fn schedule_line() {
        let (from, start, end, to) = parse_schedule("Malmö C 6:12–08:40 Göteborg C").unwrap();
        assert_eq!((from.as_str(), start.as_str(), end.as_str(), to.as_str()), ("Malmö C", "06:12", "08:40", "Göteborg C"));
        assert!(parse_schedule("Malmö C 06:12").is_none());
    }

    #[test]
    fn reads_header_chips_and_cards() {
        let (s, panel) = open_crew(CrewScene {
            header: s!("Tåg 1045 Malmö C – Göteborg C"),
            chips: vs!["X31 4321", "X31 4322", "X31 4321"],
            date: Some(s!("2025-03-10")),
            cards: vec![
                card(Some("Anna Svensson"), "Malmö C 06:12-08:40 Göteborg C"),
                card(None, "Malmö C 06:12-08:40 Göteborg C"),
                card(Some("Anna Svensson"), "Malmö C 06:12-08:40 Göteborg C"),
                card(Some("Anna Svensson"), "Halmstad C 07:05-08:40 Göteborg C"),
            ],
            ..Default::default()
        });
        let c = extract(&s, panel).unwrap();
        assert_eq!(c.train_nr, "1045");
        assert_eq!(c.vehicles, vs!["X31 4321", "X31 4322", "X31 4321"]);
        assert_eq!(c.date.map(|d| d.to_string()).as_deref(), Some("2025-03-10"));

        // nameless card dropped, exact duplicate collapsed, other stretch kept
        assert_eq!(c.crew.len(), 2);
        let anna = &c.crew[0];
        assert_eq!((anna.role.as_str(), anna.location.as_str()), ("Tågvärd", "Malmö"));
        assert_eq!(anna.phone.as_deref(), Some("+46 70 123 45 67"));
        assert_eq!(c.crew[1].from, "Halmstad C");
        assert_eq!(c.segments().len(), 2);
    }

    #[test]
    fn empty_card_is_dropped() {
        let (s, panel) = open_crew(CrewScene {
            header: s!("Tåg 1045"),
            cards: vec![CardScene::default(), card(Some("Erik Berg"), "Lund C 07:00-08:00 Malmö C")],
            ..Default::default()
        });
        let c = extract(&s, panel).unwrap();
        assert_eq!(c.crew.len(), 1);
        assert_eq!(c.crew[0].name, "Erik Berg");
        assert_eq!(c.date, None);
    }
}
