// src/specs/mod.rs
//! # Scraping “specs” module
//!
//! This module hosts the **view-specific reading rules** for the planning app.
//! Each spec focuses on one view and encodes *where the ground truth lives in
//! the content tree* and *how to extract it robustly*.
//!
//! ## What lives here
//! - **Turn-code decoding** (`turn_code`): pure, total, no cache access.
//! - **Roster reading** (`roster`): entries → `Person`s, with cache fallbacks
//!   for location and shift time.
//! - **Panel reading** (`day_panel`, `crew_panel`): an *already open* panel →
//!   `Segment`s / `TrainCrew`, preserving the panel's document order.
//! - **Tolerant extraction** using `core::scan` / `core::sanitize` helpers and a
//!   couple of anchored regexes where the line shapes are fixed.
//!
//! ## What does **not** live here
//! - **Opening, waiting, closing** – the orchestrator (`scrape::orchestrator`)
//!   gets a panel open and hands its handle to a spec.
//! - **Day stepping and aggregation** – `scrape::aggregate`.
//! - **Export formatting** – `file` / `csv`.
//!
//! ## Typical call chain
//! ```text
//! cli → scrape::collect_roster → specs::roster::parse
//!     → scrape::aggregate      → orchestrator.run(.., specs::day_panel::extract)
//!                              → orchestrator.run(.., specs::crew_panel::extract)
//! ```
//!
//! ## Conventions & invariants
//! - A block that fits no known shape is **skipped**, never guessed; its
//!   neighbours are unaffected.
//! - Ambiguous decodes produce **empty fields**, not defaults.
//! - Specs only read through `Surface`; they never trigger anything.
//!
//! In short: **`specs` knows how to read the views.** Other layers decide when
//! to open them, how long to wait, and what to remember.
pub mod crew_panel;
pub mod day_panel;
pub mod roster;
pub mod turn_code;
