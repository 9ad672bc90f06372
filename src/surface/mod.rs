// src/surface/mod.rs
//! # Capability surface of the external planning app
//!
//! The planning app is not ours. Everything the scraper knows about it goes
//! through this narrow trait: query structural slots, read their text, fire
//! their primary action, step the date, and ask which panels are open.
//!
//! ## Contract
//! - `query` returns handles in **document order**. Panel extraction relies
//!   on that to keep legs and staff cards in the app's native order.
//! - `trigger` and `navigate` are **fire-and-forget**: they return as soon as
//!   the action was dispatched, not when the app has reacted. Waiting for the
//!   reaction is the orchestrator's job (`scrape::orchestrator`).
//! - Queries are cheap and synchronous. All suspension happens above this
//!   layer, in polling loops with explicit budgets.
//!
//! ## Adapters
//! - [`bridge::BridgeSurface`]: talks to a bridge script running inside the
//!   browser session, one JSON request per call.
//! - [`memory::MemorySurface`]: a scripted in-memory app with latency, used
//!   by tests, benches and `--replay`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::sanitize::{normalize_ws, text_lines};

pub mod bridge;
pub mod memory;

pub use bridge::BridgeSurface;
pub use memory::MemorySurface;

/// Opaque reference to one element in the app's content tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(pub u64);

/// Every structural element the scraper reads or clicks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    // Roster view
    RosterEntry,
    EntryName,
    DateLabel,
    NavForward,
    NavBack,
    // Panels
    DayPanel,
    CrewPanel,
    Backdrop,
    CloseControl,
    // Day schedule
    LegBlock,
    LegHeader,
    TripNumber,
    TripDescription,
    Vehicle,
    ActivityLabel,
    // Crew panel
    CrewHeader,
    CrewChip,
    StaffCard,
    StaffName,
    StaffRole,
    StaffSchedule,
    StaffPhone,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Back,
}

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("date navigation control ({0:?}) is not present")]
    NavigationUnavailable(Direction),

    #[error("bridge transport: {0}")]
    Transport(String),

    #[error("bridge protocol: {0}")]
    Protocol(String),

    #[error("unknown element handle {0}")]
    UnknownHandle(u64),
}

pub trait Surface {
    /// Descendants of `scope` (or of the whole document) filling `slot`.
    fn query(&self, scope: Option<Handle>, slot: Slot) -> Result<Vec<Handle>, SurfaceError>;

    /// Visible text, one line per block child.
    fn text(&self, handle: Handle) -> Result<String, SurfaceError>;

    /// Invoke the element's primary action.
    fn trigger(&self, handle: Handle) -> Result<(), SurfaceError>;

    /// Panels (day schedule or crew) currently present, oldest first.
    fn open_panels(&self) -> Result<Vec<Handle>, SurfaceError>;

    /// Undo the scraper's visual footprint (blocking overlay, hidden roster).
    fn restore(&self) -> Result<(), SurfaceError>;

    /// Step the shown date by one day.
    fn navigate(&self, dir: Direction) -> Result<(), SurfaceError> {
        let slot = match dir { Direction::Forward => Slot::NavForward, Direction::Back => Slot::NavBack };
        match self.first(None, slot)? {
            Some(h) => self.trigger(h),
            None => Err(SurfaceError::NavigationUnavailable(dir)),
        }
    }

    fn first(&self, scope: Option<Handle>, slot: Slot) -> Result<Option<Handle>, SurfaceError> {
        Ok(self.query(scope, slot)?.into_iter().next())
    }

    fn lines(&self, handle: Handle) -> Result<Vec<String>, SurfaceError> {
        Ok(text_lines(&self.text(handle)?))
    }

    /// Normalized text of the first `slot` under `scope`, if any and non-empty.
    fn slot_text(&self, scope: Handle, slot: Slot) -> Result<Option<String>, SurfaceError> {
        match self.first(Some(scope), slot)? {
            Some(h) => {
                let t = normalize_ws(&self.text(h)?);
                Ok(if t.is_empty() { None } else { Some(t) })
            }
            None => Ok(None),
        }
    }

    fn date_label(&self) -> Result<String, SurfaceError> {
        match self.first(None, Slot::DateLabel)? {
            Some(h) => Ok(normalize_ws(&self.text(h)?)),
            None => Ok(s!()),
        }
    }
}
