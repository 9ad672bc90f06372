// src/scrape/orchestrator.rs
//
// One interaction with the planning app, as an explicit state machine:
//
//   Idle → WaitingForClose → Triggered → WaitingForOpen → Extracting → Closing
//        → Done | TimedOut | Cancelled
//
// The prior-close wait runs before the trigger so a panel still fading out
// from the last interaction can't be mistaken for the new one.
//
// Waiting is polling on tokio timers, raced against the cancellation token.
// Every transition checks the token first; once it fires, the orchestrator
// restores the app's visual state exactly once and refuses further work.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::options::{TimingOptions, Vocabulary};
use crate::surface::{Handle, Slot, Surface, SurfaceError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    WaitingForClose,
    Triggered,
    WaitingForOpen,
    Extracting,
    Closing,
    Done,
    TimedOut,
    Cancelled,
}

/// Result of one interaction. Timeouts and cancellation are values, not errors.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome<T> {
    Done(T),
    TimedOut,
    Cancelled,
}

/// What the panel we are waiting for must look like.
#[derive(Clone, Debug)]
pub struct Expect {
    pub panel: Slot,
    /// Must appear in the panel text: a first name, a train number.
    pub token: String,
}

#[derive(Clone, Debug)]
pub struct Interaction {
    /// For logs only.
    pub label: String,
    pub target: Handle,
    pub expect: Expect,
    pub budget: Duration,
    pub await_prior_close: bool,
    pub close_after: bool,
}

/// Outcome of a bounded poll.
pub enum Waited<T> {
    Ready(T),
    Expired,
    Cancelled,
}

pub struct Orchestrator<'a, S: Surface + ?Sized> {
    surface: &'a S,
    timing: &'a TimingOptions,
    vocab: &'a Vocabulary,
    cancel: CancellationToken,
    phase: Phase,
    trail: Vec<Phase>,
    label: String,
    cleaned_up: bool,
}

impl<'a, S: Surface + ?Sized> Orchestrator<'a, S> {
    pub fn new(
        surface: &'a S,
        timing: &'a TimingOptions,
        vocab: &'a Vocabulary,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            surface,
            timing,
            vocab,
            cancel,
            phase: Phase::Idle,
            trail: Vec::new(),
            label: s!(),
            cleaned_up: false,
        }
    }

    pub fn surface(&self) -> &'a S { self.surface }
    pub fn timing(&self) -> &'a TimingOptions { self.timing }
    pub fn phase(&self) -> Phase { self.phase }

    /// Phases visited by the latest `run`.
    pub fn trail(&self) -> &[Phase] { &self.trail }

    pub fn is_cancelled(&self) -> bool { self.cancel.is_cancelled() }

    /// Drive one interaction. `extract` reads the matched panel.
    ///
    /// Surface errors propagate; a panel that never shows up is `TimedOut`.
    pub async fn run<T, F>(&mut self, it: &Interaction, extract: F) -> Result<Outcome<T>, SurfaceError>
    where
        F: FnOnce(&S, Handle) -> Result<T, SurfaceError>,
    {
        self.label = it.label.clone();
        self.trail.clear();
        if !self.enter(Phase::Idle) {
            return Ok(Outcome::Cancelled);
        }

        if it.await_prior_close {
            if !self.enter(Phase::WaitingForClose) {
                return Ok(Outcome::Cancelled);
            }
            let (every, budget) = (self.timing.close_poll(), self.timing.close_wait());
            match self.poll(every, budget, |s| Ok(s.open_panels()?.is_empty().then_some(()))).await? {
                Waited::Ready(()) => {}
                Waited::Expired => logd!("[{}] prior panel still open after {budget:?}, going ahead", self.label),
                Waited::Cancelled => return Ok(self.cancelled()),
            }
        }

        if !self.settle().await || !self.enter(Phase::Triggered) {
            return Ok(self.cancelled());
        }
        self.surface.trigger(it.target)?;

        if !self.enter(Phase::WaitingForOpen) {
            return Ok(Outcome::Cancelled);
        }
        let panel = match self.await_panel(&it.expect, it.budget).await? {
            Waited::Ready(h) => h,
            Waited::Expired => {
                self.enter(Phase::TimedOut);
                logw!("[{}] no {:?} showing '{}' within {:?}", self.label, it.expect.panel, it.expect.token, it.budget);
                self.close_all();
                return Ok(Outcome::TimedOut);
            }
            Waited::Cancelled => return Ok(self.cancelled()),
        };

        if !self.enter(Phase::Extracting) {
            return Ok(Outcome::Cancelled);
        }
        let extracted = extract(self.surface, panel);

        if it.close_after || extracted.is_err() {
            if !self.enter(Phase::Closing) {
                return Ok(Outcome::Cancelled);
            }
            self.close_all();
        }
        let value = extracted?;

        if !self.enter(Phase::Done) {
            return Ok(Outcome::Cancelled);
        }
        Ok(Outcome::Done(value))
    }

    /// Newest open panel of the expected kind that is loaded and shows the token.
    async fn await_panel(&self, expect: &Expect, budget: Duration) -> Result<Waited<Handle>, SurfaceError> {
        let vocab = self.vocab;
        let every = self.timing.open_poll();
        self.poll(every, budget, |s| {
            for h in s.query(None, expect.panel)?.into_iter().rev() {
                let text = s.text(h)?;
                if !vocab.is_loading(&text) && text.contains(expect.token.as_str()) {
                    return Ok(Some(h));
                }
            }
            Ok(None)
        })
        .await
    }

    /// Probe every `every` until it yields, the budget runs out, or we are cancelled.
    pub async fn poll<T, P>(&self, every: Duration, budget: Duration, mut probe: P) -> Result<Waited<T>, SurfaceError>
    where
        P: FnMut(&S) -> Result<Option<T>, SurfaceError>,
    {
        let deadline = Instant::now() + budget;
        loop {
            if self.cancel.is_cancelled() {
                return Ok(Waited::Cancelled);
            }
            if let Some(v) = probe(self.surface)? {
                return Ok(Waited::Ready(v));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(Waited::Expired);
            }
            if !self.pause(every.min(deadline - now)).await {
                return Ok(Waited::Cancelled);
            }
        }
    }

    /// Sleep unless cancelled first. `false` means cancelled.
    pub async fn pause(&self, d: Duration) -> bool {
        if d.is_zero() {
            return !self.cancel.is_cancelled();
        }
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(d) => true,
        }
    }

    /// Let the app finish its own transition before the next action.
    pub async fn settle(&self) -> bool {
        self.pause(self.timing.settle()).await
    }

    /// Backdrop + every close control. Fire-and-forget: the next prior-close
    /// wait checks that they actually went away.
    pub fn close_all(&self) {
        for slot in [Slot::Backdrop, Slot::CloseControl] {
            match self.surface.query(None, slot) {
                Ok(hs) => {
                    for h in hs {
                        if let Err(e) = self.surface.trigger(h) {
                            logd!("[{}] close {slot:?}: {e}", self.label);
                        }
                    }
                }
                Err(e) => logd!("[{}] close {slot:?}: {e}", self.label),
            }
        }
    }

    /// Step to `phase`, unless cancellation arrived first.
    fn enter(&mut self, phase: Phase) -> bool {
        if self.cancel.is_cancelled() {
            self.cancelled::<()>();
            return false;
        }
        logd!("[{}] {:?} → {:?}", self.label, self.phase, phase);
        self.phase = phase;
        self.trail.push(phase);
        true
    }

    fn cancelled<T>(&mut self) -> Outcome<T> {
        if self.phase != Phase::Cancelled {
            logd!("[{}] {:?} → Cancelled", self.label, self.phase);
            self.phase = Phase::Cancelled;
            self.trail.push(Phase::Cancelled);
        }
        self.cleanup();
        Outcome::Cancelled
    }

    /// Undo our visual footprint. Runs at most once per orchestrator.
    pub fn cleanup(&mut self) {
        if self.cleaned_up {
            return;
        }
        self.cleaned_up = true;
        if let Err(e) = self.surface.restore() {
            loge!("restore after cancel failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::surface::memory::{DayScene, EntryScene, LegScene, MemorySurface, PanelScene, Scene};

    fn scene(latency_ms: Option<u64>, never_ready: bool) -> Scene {
        Scene {
            days: vec![DayScene {
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
                        latency_ms,
                        never_ready,
                    }),
                }],
            }],
            ..Default::default()
        }
    }

    fn interaction(s: &MemorySurface) -> Interaction {
        Interaction {
            label: s!("day Anna"),
            target: s.first(None, Slot::RosterEntry).unwrap().unwrap(),
            expect: Expect { panel: Slot::DayPanel, token: s!("Anna") },
            budget: Duration::from_millis(4_000),
            await_prior_close: true,
            close_after: true,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn opens_extracts_and_closes() {
        let s = MemorySurface::new(scene(Some(700), false));
        let (t, v) = (TimingOptions::default(), Vocabulary::default());
        let mut o = Orchestrator::new(&s, &t, &v, CancellationToken::new());
        let it = interaction(&s);

        let out = o.run(&it, |s, p| Ok(s.query(Some(p), Slot::LegBlock)?.len())).await.unwrap();
        assert_eq!(out, Outcome::Done(1));
        assert_eq!(
            o.trail(),
            [
                Phase::Idle,
                Phase::WaitingForClose,
                Phase::Triggered,
                Phase::WaitingForOpen,
                Phase::Extracting,
                Phase::Closing,
                Phase::Done
            ]
        );
        assert!(s.open_panels().unwrap().is_empty());
        assert_eq!(s.restore_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn never_loading_panel_times_out_softly() {
        let s = MemorySurface::new(scene(None, true));
        let (t, v) = (TimingOptions::default(), Vocabulary::default());
        let mut o = Orchestrator::new(&s, &t, &v, CancellationToken::new());
        let mut it = interaction(&s);
        it.budget = Duration::from_millis(1_000);

        let started = Instant::now();
        let out: Outcome<()> = o.run(&it, |_, _| panic!("nothing to extract")).await.unwrap();
        assert_eq!(out, Outcome::TimedOut);
        assert_eq!(o.phase(), Phase::TimedOut);
        assert!(started.elapsed() >= Duration::from_millis(1_000));
        assert!(started.elapsed() < Duration::from_millis(2_000));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_mid_wait_stops_everything() {
        let s = MemorySurface::new(scene(None, true));
        let (t, v) = (TimingOptions::default(), Vocabulary::default());
        let cancel = CancellationToken::new();
        let mut o = Orchestrator::new(&s, &t, &v, cancel.clone());
        let it = interaction(&s);
        let extracted = Cell::new(false);

        let run = o.run(&it, |_, _| {
            extracted.set(true);
            Ok(())
        });
        let stop = async {
            tokio::time::sleep(Duration::from_millis(900)).await;
            cancel.cancel();
        };
        let (out, ()) = tokio::join!(run, stop);

        assert_eq!(out.unwrap(), Outcome::Cancelled);
        assert!(!extracted.get());
        assert_eq!(s.actions(), vec!["open-day:Anna Svensson", "restore"]);
        assert_eq!(s.restore_count(), 1);
        assert_eq!(o.trail().last(), Some(&Phase::Cancelled));

        // later interactions short-circuit without touching the app again
        let again: Outcome<()> = o.run(&it, |_, _| Ok(())).await.unwrap();
        assert_eq!(again, Outcome::Cancelled);
        assert_eq!(s.restore_count(), 1);
        assert_eq!(s.actions().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_panel_is_not_taken_for_new_one() {
        // a crew-panel wait must not match the day panel behind it
        let s = MemorySurface::new(scene(Some(0), false));
        let (t, v) = (TimingOptions::default(), Vocabulary::default());
        let mut o = Orchestrator::new(&s, &t, &v, CancellationToken::new());
        let mut it = interaction(&s);
        it.close_after = false;
        let out = o.run(&it, |_, p| Ok(p)).await.unwrap();
        assert!(matches!(out, Outcome::Done(_)));

        let mut crew = interaction(&s);
        crew.target = s.first(None, Slot::TripNumber).unwrap().unwrap();
        crew.expect = Expect { panel: Slot::CrewPanel, token: s!("1045") };
        crew.await_prior_close = false;
        crew.budget = Duration::from_millis(600);
        let out: Outcome<()> = o.run(&crew, |_, _| Ok(())).await.unwrap();
        assert_eq!(out, Outcome::TimedOut);
        assert!(s.open_panels().unwrap().is_empty());
    }
}
