// src/specs/day_panel.rs
//
// Open day-schedule panel → Vec<Segment>, in the panel's own (chronological) order.
//
// Each leg block starts with a header in one of two shapes:
//   "Malmö C 06:12 - 08:40 Göteborg C"   from, range, to
//   "Göteborg C 09:10 - 09:40"           single station
// and carries either train details (trip number, description, vehicles) or
// an activity label ("Rast", "Växling", …).

use std::sync::LazyLock;

use regex::Regex;

use crate::core::sanitize::normalize_ws;
use crate::core::scan::{digit_run, find_time_range, hhmm};
use crate::data::{Segment, SegmentKind};
use crate::surface::{Handle, Slot, Surface, SurfaceError};

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<from>.+?)\s+(?P<s>\d{1,2}:\d{2})\s*[-–—]\s*(?P<e>\d{1,2}:\d{2})(?:\s+(?P<to>.+))?$")
        .expect("leg header pattern")
});

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegHeader {
    pub from: String,
    pub start: String,
    pub end: String,
    pub to: Option<String>,
}

pub fn parse_header(line: &str) -> Option<LegHeader> {
    let line = normalize_ws(line);
    let c = HEADER.captures(&line)?;
    Some(LegHeader {
        from: c["from"].trim().to_string(),
        start: hhmm(&c["s"])?,
        end: hhmm(&c["e"])?,
        to: c.name("to").map(|m| m.as_str().trim().to_string()).filter(|t| !t.is_empty()),
    })
}

pub fn extract<S: Surface + ?Sized>(surface: &S, panel: Handle) -> Result<Vec<Segment>, SurfaceError> {
    let mut out = Vec::new();
    for (i, block) in surface.query(Some(panel), Slot::LegBlock)?.into_iter().enumerate() {
        match read_leg(surface, block)? {
            Some(seg) => out.push(seg),
            None => logd!("day panel: leg {i} did not parse, skipped"),
        }
    }
    Ok(out)
}

fn read_leg<S: Surface + ?Sized>(surface: &S, block: Handle) -> Result<Option<Segment>, SurfaceError> {
    let lines = surface.lines(block)?;
    let header_text = match surface.slot_text(block, Slot::LegHeader)? {
        Some(h) => h,
        None => match lines.first() {
            Some(l) => l.clone(),
            None => return Ok(None),
        },
    };
    let Some(h) = parse_header(&header_text) else { return Ok(None) };

    let kind = match surface.slot_text(block, Slot::TripNumber)? {
        Some(trip) => {
            let train_nr = digit_run(&trip, 1, 6).unwrap_or(trip);
            let train_type = surface.slot_text(block, Slot::TripDescription)?.unwrap_or_default();
            let mut vehicles = Vec::new();
            for v in surface.query(Some(block), Slot::Vehicle)? {
                let t = normalize_ws(&surface.text(v)?);
                if !t.is_empty() { vehicles.push(t); }
            }
            SegmentKind::Train { train_nr, train_type, vehicles }
        }
        None => {
            let label = match surface.slot_text(block, Slot::ActivityLabel)? {
                Some(l) => Some(l),
                None => infer_activity(&lines, &header_text, &h),
            };
            match label {
                Some(label) => SegmentKind::Activity { label },
                None => return Ok(None),
            }
        }
    };

    Ok(Some(Segment { start: h.start, end: h.end, from: h.from, to: h.to, kind }))
}

/// Last line that is neither a time nor one of the leg's stations.
fn infer_activity(lines: &[String], header_text: &str, h: &LegHeader) -> Option<String> {
    let is_station = |l: &str| {
        l.eq_ignore_ascii_case(&h.from) || h.to.as_deref().is_some_and(|t| l.eq_ignore_ascii_case(t))
    };
    lines
        .iter()
        .rev()
        .find(|l| {
            *l != header_text
                && find_time_range(l).is_none()
                && hhmm(l).is_none()
                && !is_station(l)
        })
        .cloned()
}

/// Trip-number element for `train_nr` in an open day panel.
pub fn find_trip<S: Surface + ?Sized>(
    surface: &S,
    panel: Handle,
    train_nr: &str,
) -> Result<Option<Handle>, SurfaceError> {
    for h in surface.query(Some(panel), Slot::TripNumber)? {
        let t = surface.text(h)?;
        if digit_run(&t, 1, 6).as_deref() == Some(train_nr) || normalize_ws(&t) == train_nr {
            return Ok(Some(h));
        }
    }
    Ok(None)
}
