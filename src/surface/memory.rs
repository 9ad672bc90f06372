// src/surface/memory.rs
//
// Scripted stand-in for the planning app. A `Scene` describes the roster of
// each day and what the day/crew panels contain; `MemorySurface` turns it
// into a live content tree that reacts to triggers with configurable
// latency, the way the real app does:
//
// - opening a panel shows it immediately with a loading marker, the content
//   arrives after `open_latency_ms` (or never, for `never_ready` panels);
// - closing keeps the panel present for `close_latency_ms`;
// - navigation swaps the roster after `nav_latency_ms`.
//
// Time is `tokio::time::Instant`, so paused-clock tests stay deterministic.
// Scenes are serde types: the same JSON drives tests, benches and --replay.

use std::cell::RefCell;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::{Direction, Handle, Slot, Surface, SurfaceError};

const LOADING_TEXT: &str = "Laddar…";
const CLOSE_TEXT: &str = "Stäng";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scene {
    pub days: Vec<DayScene>,
    /// Index into `days` shown at start.
    pub origin: usize,
    pub open_latency_ms: u64,
    pub close_latency_ms: u64,
    pub nav_latency_ms: u64,
    /// Drop the date navigation controls from the page.
    pub hide_nav: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DayScene {
    pub label: String,
    pub entries: Vec<EntryScene>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryScene {
    pub name: String,
    /// Lines below the name (role, section marker, turn code, times…).
    pub lines: Vec<String>,
    /// `None`: clicking the entry does nothing.
    pub panel: Option<PanelScene>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelScene {
    pub legs: Vec<LegScene>,
    pub latency_ms: Option<u64>,
    pub never_ready: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegScene {
    pub header: String,
    pub trip_number: Option<String>,
    pub trip_description: Option<String>,
    pub vehicles: Vec<String>,
    pub activity: Option<String>,
    pub lines: Vec<String>,
    pub crew: Option<CrewScene>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrewScene {
    pub header: String,
    pub chips: Vec<String>,
    pub date: Option<String>,
    pub cards: Vec<CardScene>,
    pub latency_ms: Option<u64>,
    pub never_ready: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardScene {
    pub name: Option<String>,
    pub role: Option<String>,
    pub schedule: Option<String>,
    pub phone: Option<String>,
    pub lines: Vec<String>,
}

#[derive(Clone, Copy, Debug)]
enum Act {
    Nothing,
    OpenDay { day: i64, entry: usize },
    OpenCrew { day: i64, entry: usize, leg: usize },
    Close { panel: usize },
    Backdrop,
    Nav(Direction),
}

struct Node {
    slot: Option<Slot>,
    text: String,
    children: Vec<usize>,
    act: Act,
}

#[derive(Clone, Copy)]
enum Content {
    Day { day: i64, entry: usize },
    Crew { day: i64, entry: usize, leg: usize },
}

struct Panel {
    node: usize,
    content: Content,
    ready_at: Option<Instant>,
    filled: bool,
    closing_at: Option<Instant>,
}

struct World {
    scene: Scene,
    nodes: Vec<Node>,
    offset: i64,
    label: usize,
    nav_back: usize,
    nav_fwd: usize,
    backdrop: usize,
    roster: Vec<usize>,
    panels: Vec<Panel>,
    pending_nav: Option<(i64, Instant)>,
    log: Vec<String>,
    restores: u32,
}

pub struct MemorySurface {
    world: RefCell<World>,
}

impl MemorySurface {
    pub fn new(scene: Scene) -> Self {
        let mut w = World {
            scene,
            nodes: Vec::new(),
            offset: 0,
            label: 0,
            nav_back: 0,
            nav_fwd: 0,
            backdrop: 0,
            roster: Vec::new(),
            panels: Vec::new(),
            pending_nav: None,
            log: Vec::new(),
            restores: 0,
        };
        w.label = w.push(Some(Slot::DateLabel), s!(), Act::Nothing);
        w.nav_back = w.push(Some(Slot::NavBack), s!("‹"), Act::Nav(Direction::Back));
        w.nav_fwd = w.push(Some(Slot::NavForward), s!("›"), Act::Nav(Direction::Forward));
        w.backdrop = w.push(Some(Slot::Backdrop), s!(), Act::Backdrop);
        w.build_day();
        Self { world: RefCell::new(w) }
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(text)?))
    }

    /// Every action the app received, in order ("open-day:Anna Svensson", "nav:forward", …).
    pub fn actions(&self) -> Vec<String> {
        self.world.borrow().log.clone()
    }

    pub fn restore_count(&self) -> u32 {
        self.world.borrow().restores
    }

    /// Day offset currently shown, relative to the scene origin.
    pub fn offset(&self) -> i64 {
        let mut w = self.world.borrow_mut();
        w.settle();
        w.offset
    }
}

impl World {
    fn push(&mut self, slot: Option<Slot>, text: String, act: Act) -> usize {
        self.nodes.push(Node { slot, text, children: Vec::new(), act });
        self.nodes.len() - 1
    }

    fn child(&mut self, parent: usize, slot: Option<Slot>, text: impl Into<String>, act: Act) -> usize {
        let id = self.push(slot, text.into(), act);
        self.nodes[parent].children.push(id);
        id
    }

    fn day(&self, offset: i64) -> Option<&DayScene> {
        let idx = self.scene.origin as i64 + offset;
        if idx < 0 { return None; }
        self.scene.days.get(idx as usize)
    }

    fn entry(&self, day: i64, entry: usize) -> Option<&EntryScene> {
        self.day(day).and_then(|d| d.entries.get(entry))
    }

    fn build_day(&mut self) {
        let offset = self.offset;
        let (label, entries) = match self.day(offset) {
            Some(d) => (d.label.clone(), d.entries.clone()),
            None => (format!("dag {offset:+}"), Vec::new()),
        };
        self.nodes[self.label].text = label;
        self.roster.clear();
        for (i, e) in entries.iter().enumerate() {
            let node = self.push(Some(Slot::RosterEntry), s!(), Act::OpenDay { day: offset, entry: i });
            self.child(node, Some(Slot::EntryName), e.name.clone(), Act::Nothing);
            for line in &e.lines {
                self.child(node, None, line.clone(), Act::Nothing);
            }
            self.roster.push(node);
        }
    }

    fn settle(&mut self) {
        let now = Instant::now();

        if let Some((target, at)) = self.pending_nav {
            if at <= now {
                self.pending_nav = None;
                self.offset = target;
                self.build_day();
            }
        }

        self.panels.retain(|p| p.closing_at.is_none_or(|at| at > now));

        let due: Vec<usize> = self
            .panels
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.filled && p.ready_at.is_some_and(|at| at <= now))
            .map(|(i, _)| i)
            .collect();
        for i in due {
            self.panels[i].filled = true;
            let (node, content) = (self.panels[i].node, self.panels[i].content);
            self.fill(node, content);
        }
    }

    fn open_panel(&mut self, slot: Slot, content: Content, latency_ms: Option<u64>, never_ready: bool) {
        let now = Instant::now();
        let node = self.push(Some(slot), s!(), Act::Nothing);
        self.child(node, Some(Slot::CloseControl), CLOSE_TEXT, Act::Close { panel: node });
        if let Content::Day { day, entry } = content {
            let name = self.entry(day, entry).map(|e| e.name.clone()).unwrap_or_default();
            self.child(node, None, name, Act::Nothing);
        }
        self.child(node, None, LOADING_TEXT, Act::Nothing);

        let latency = Duration::from_millis(latency_ms.unwrap_or(self.scene.open_latency_ms));
        let ready_at = if never_ready { None } else { Some(now + latency) };
        self.panels.push(Panel { node, content, ready_at, filled: false, closing_at: None });
    }

    fn fill(&mut self, node: usize, content: Content) {
        let close = self.nodes[node].children[0];
        self.nodes[node].children = vec![close];

        match content {
            Content::Day { day, entry } => {
                let Some(e) = self.entry(day, entry).cloned() else { return };
                let Some(panel) = e.panel else { return };
                self.child(node, None, e.name.clone(), Act::Nothing);
                for (li, leg) in panel.legs.iter().enumerate() {
                    let block = self.child(node, Some(Slot::LegBlock), s!(), Act::Nothing);
                    self.child(block, Some(Slot::LegHeader), leg.header.clone(), Act::Nothing);
                    if let Some(nr) = &leg.trip_number {
                        let act = Act::OpenCrew { day, entry, leg: li };
                        self.child(block, Some(Slot::TripNumber), nr.clone(), act);
                    }
                    if let Some(d) = &leg.trip_description {
                        self.child(block, Some(Slot::TripDescription), d.clone(), Act::Nothing);
                    }
                    for v in &leg.vehicles {
                        self.child(block, Some(Slot::Vehicle), v.clone(), Act::Nothing);
                    }
                    if let Some(a) = &leg.activity {
                        self.child(block, Some(Slot::ActivityLabel), a.clone(), Act::Nothing);
                    }
                    for l in &leg.lines {
                        self.child(block, None, l.clone(), Act::Nothing);
                    }
                }
            }
            Content::Crew { day, entry, leg } => {
                let crew = self
                    .entry(day, entry)
                    .and_then(|e| e.panel.as_ref())
                    .and_then(|p| p.legs.get(leg))
                    .and_then(|l| l.crew.clone());
                let Some(crew) = crew else { return };
                self.child(node, Some(Slot::CrewHeader), crew.header.clone(), Act::Nothing);
                for c in &crew.chips {
                    self.child(node, Some(Slot::CrewChip), c.clone(), Act::Nothing);
                }
                if let Some(d) = &crew.date {
                    self.child(node, None, d.clone(), Act::Nothing);
                }
                for card in &crew.cards {
                    let cn = self.child(node, Some(Slot::StaffCard), s!(), Act::Nothing);
                    let parts = [
                        (Slot::StaffName, &card.name),
                        (Slot::StaffRole, &card.role),
                        (Slot::StaffSchedule, &card.schedule),
                        (Slot::StaffPhone, &card.phone),
                    ];
                    for (slot, value) in parts {
                        if let Some(v) = value {
                            self.child(cn, Some(slot), v.clone(), Act::Nothing);
                        }
                    }
                    for l in &card.lines {
                        self.child(cn, None, l.clone(), Act::Nothing);
                    }
                }
            }
        }
    }

    fn roots(&self) -> Vec<usize> {
        let mut out = vec![self.label];
        if !self.scene.hide_nav {
            out.push(self.nav_back);
            out.push(self.nav_fwd);
        }
        out.extend(self.roster.iter().copied());
        if !self.panels.is_empty() {
            out.push(self.backdrop);
            out.extend(self.panels.iter().map(|p| p.node));
        }
        out
    }

    fn collect(&self, id: usize, slot: Slot, out: &mut Vec<Handle>) {
        if self.nodes[id].slot == Some(slot) {
            out.push(Handle(id as u64));
        }
        for &c in &self.nodes[id].children {
            self.collect(c, slot, out);
        }
    }

    fn text_of(&self, id: usize, out: &mut Vec<String>) {
        let n = &self.nodes[id];
        if !n.text.is_empty() {
            out.push(n.text.clone());
        }
        for &c in &n.children {
            self.text_of(c, out);
        }
    }

    fn node(&self, h: Handle) -> Result<usize, SurfaceError> {
        let id = h.0 as usize;
        if id < self.nodes.len() { Ok(id) } else { Err(SurfaceError::UnknownHandle(h.0)) }
    }

    fn close(&mut self, panel: usize, at: Instant) {
        for p in self.panels.iter_mut().filter(|p| p.node == panel && p.closing_at.is_none()) {
            p.closing_at = Some(at);
        }
    }
}

impl Surface for MemorySurface {
    fn query(&self, scope: Option<Handle>, slot: Slot) -> Result<Vec<Handle>, SurfaceError> {
        let mut w = self.world.borrow_mut();
        w.settle();
        let mut out = Vec::new();
        match scope {
            Some(h) => {
                let id = w.node(h)?;
                for &c in &w.nodes[id].children {
                    w.collect(c, slot, &mut out);
                }
            }
            None => {
                for r in w.roots() {
                    w.collect(r, slot, &mut out);
                }
            }
        }
        Ok(out)
    }

    fn text(&self, handle: Handle) -> Result<String, SurfaceError> {
        let mut w = self.world.borrow_mut();
        w.settle();
        let id = w.node(handle)?;
        let mut parts = Vec::new();
        w.text_of(id, &mut parts);
        Ok(parts.join("\n"))
    }

    fn trigger(&self, handle: Handle) -> Result<(), SurfaceError> {
        let mut w = self.world.borrow_mut();
        w.settle();
        let id = w.node(handle)?;
        let now = Instant::now();
        let close_at = now + Duration::from_millis(w.scene.close_latency_ms);

        match w.nodes[id].act {
            Act::Nothing => w.log.push(s!("noop")),
            Act::OpenDay { day, entry } => {
                let Some(e) = w.entry(day, entry).cloned() else { return Ok(()) };
                w.log.push(join!("open-day:", &e.name));
                if let Some(p) = e.panel {
                    w.open_panel(Slot::DayPanel, Content::Day { day, entry }, p.latency_ms, p.never_ready);
                }
            }
            Act::OpenCrew { day, entry, leg } => {
                let l = w
                    .entry(day, entry)
                    .and_then(|e| e.panel.as_ref())
                    .and_then(|p| p.legs.get(leg))
                    .cloned();
                let Some(l) = l else { return Ok(()) };
                w.log.push(join!("open-crew:", l.trip_number.as_deref().unwrap_or("")));
                if let Some(c) = l.crew {
                    w.open_panel(Slot::CrewPanel, Content::Crew { day, entry, leg }, c.latency_ms, c.never_ready);
                }
            }
            Act::Close { panel } => {
                w.log.push(s!("close"));
                w.close(panel, close_at);
            }
            Act::Backdrop => {
                w.log.push(s!("backdrop"));
                let nodes: Vec<usize> = w.panels.iter().map(|p| p.node).collect();
                for n in nodes {
                    w.close(n, close_at);
                }
            }
            Act::Nav(dir) => {
                w.log.push(match dir { Direction::Forward => s!("nav:forward"), Direction::Back => s!("nav:back") });
                let base = w.pending_nav.map(|(t, _)| t).unwrap_or(w.offset);
                let target = match dir { Direction::Forward => base + 1, Direction::Back => base - 1 };
                let at = now + Duration::from_millis(w.scene.nav_latency_ms);
                w.pending_nav = Some((target, at));
            }
        }
        w.settle();
        Ok(())
    }

    fn open_panels(&self) -> Result<Vec<Handle>, SurfaceError> {
        let mut w = self.world.borrow_mut();
        w.settle();
        Ok(w.panels.iter().map(|p| Handle(p.node as u64)).collect())
    }

    fn restore(&self) -> Result<(), SurfaceError> {
        let mut w = self.world.borrow_mut();
        w.restores += 1;
        w.log.push(s!("restore"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> Scene {
        Scene {
            days: vec![
                DayScene { label: s!("2025-03-09"), entries: vec![] },
                DayScene {
                    label: s!("2025-03-10"),
                    entries: vec![EntryScene {
                        name: s!("Anna Svensson"),
                        lines: vs!["Lokförare", "51284A"],
                        panel: Some(PanelScene {
                            legs: vec![LegScene {
                                header: s!("Malmö C 06:12 - 08:40 Göteborg C"),
                                trip_number: Some(s!("1045")),
                                ..Default::default()
                            }],
                            ..Default::default()
                        }),
                    }],
                },
            ],
            origin: 1,
            open_latency_ms: 300,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn panel_loads_after_latency() {
        let s = MemorySurface::new(scene());
        let entry = s.first(None, Slot::RosterEntry).unwrap().unwrap();
        s.trigger(entry).unwrap();

        let panel = s.first(None, Slot::DayPanel).unwrap().unwrap();
        assert!(s.text(panel).unwrap().contains(LOADING_TEXT));
        assert!(s.query(Some(panel), Slot::LegBlock).unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(300)).await;
        let text = s.text(panel).unwrap();
        assert!(!text.contains(LOADING_TEXT));
        assert!(text.contains("Anna Svensson"));
        assert_eq!(s.query(Some(panel), Slot::LegBlock).unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn backdrop_closes_everything() {
        let s = MemorySurface::new(scene());
        let entry = s.first(None, Slot::RosterEntry).unwrap().unwrap();
        s.trigger(entry).unwrap();
        assert_eq!(s.open_panels().unwrap().len(), 1);
        let backdrop = s.first(None, Slot::Backdrop).unwrap().unwrap();
        s.trigger(backdrop).unwrap();
        assert!(s.open_panels().unwrap().is_empty());
        assert_eq!(s.actions(), vec!["open-day:Anna Svensson", "backdrop"]);
    }

    #[test]
    fn navigation_swaps_roster() {
        let s = MemorySurface::new(scene());
        assert_eq!(s.date_label().unwrap(), "2025-03-10");
        s.navigate(Direction::Back).unwrap();
        assert_eq!(s.date_label().unwrap(), "2025-03-09");
        assert!(s.query(None, Slot::RosterEntry).unwrap().is_empty());
        s.navigate(Direction::Back).unwrap();
        assert_eq!(s.date_label().unwrap(), "dag -2");
        assert_eq!(s.offset(), -2);
    }

    #[test]
    fn hidden_nav_is_unavailable() {
        let mut sc = scene();
        sc.hide_nav = true;
        let s = MemorySurface::new(sc);
        assert!(matches!(
            s.navigate(Direction::Forward),
            Err(SurfaceError::NavigationUnavailable(Direction::Forward))
        ));
    }
}
