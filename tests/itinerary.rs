// tests/itinerary.rs
use std::time::Duration;

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

use shift_scrape::config::options::AppOptions;
use shift_scrape::progress::{NullProgress, RecordingProgress};
use shift_scrape::scrape::{MultiDayAggregator, Orchestrator, RunError};
use shift_scrape::store::LocationTimeCache;
use shift_scrape::surface::memory::Scene;
use shift_scrape::surface::{Handle, MemorySurface, Slot, Surface, SurfaceError};

fn scene() -> Scene {
    serde_json::from_str(include_str!("../demos/scene.json")).unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

fn count(s: &MemorySurface, action: &str) -> usize {
    s.actions().iter().filter(|a| *a == action).count()
}

#[tokio::test(start_paused = true)]
async fn three_days_with_a_gap() {
    shift_scrape::log::init_test();
    let s = MemorySurface::new(scene());
    let opts = AppOptions::default();
    let mut cache = LocationTimeCache::new();
    let mut progress = RecordingProgress::default();
    let mut orch = Orchestrator::new(&s, &opts.timing, &opts.vocab, CancellationToken::new());

    let result = MultiDayAggregator::new(&mut orch, &opts, &mut cache, &mut progress)
        .run("Anna Svensson", None)
        .await
        .unwrap();

    assert_eq!(result.person_name, "Anna Svensson");
    let dates: Vec<NaiveDate> = result.days.iter().map(|d| d.date).collect();
    assert_eq!(dates, [day(10), day(11), day(12)]);

    let d0 = &result.days[0];
    assert!(!d0.not_found);
    assert_eq!(d0.turn_code, "51284A");
    assert_eq!(d0.segments.len(), 3);
    assert_eq!(d0.train_numbers(), ["1045", "1052"]);
    let c1045 = &d0.crews["1045"];
    assert_eq!(c1045.vehicles, ["X31 4321", "X31 4377"]);
    let names: Vec<&str> = c1045.crew.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["Anna Svensson", "Jonas Ek", "Sara Holm"]);
    assert_eq!(c1045.crew[2].phone.as_deref(), Some("+46 73 555 01 02"));
    assert_eq!(d0.crews["1052"].crew.len(), 2);

    assert!(result.days[1].not_found);
    assert!(result.days[1].segments.is_empty());

    let d2 = &result.days[2];
    assert!(!d2.not_found);
    assert_eq!(d2.crews["1045"].crew[1].name, "Olle Nord");

    // crews are scraped per day unless reuse is switched on
    assert_eq!(count(&s, "open-crew:1045"), 2);
    assert_eq!(count(&s, "open-crew:1052"), 1);

    // back where we started
    assert_eq!(s.offset(), 0);
    assert_eq!(count(&s, "nav:forward"), count(&s, "nav:back"));

    assert_eq!(progress.done, [0, 2]);
    assert_eq!(progress.failed, [1]);
    assert!(progress.finished);
}

#[tokio::test(start_paused = true)]
async fn crews_reused_across_days() {
    let s = MemorySurface::new(scene());
    let mut opts = AppOptions::default();
    opts.aggregate.reuse_crew_across_days = true;
    let mut cache = LocationTimeCache::new();
    let mut orch = Orchestrator::new(&s, &opts.timing, &opts.vocab, CancellationToken::new());

    let result = MultiDayAggregator::new(&mut orch, &opts, &mut cache, &mut NullProgress)
        .run("Anna Svensson", None)
        .await
        .unwrap();

    assert_eq!(count(&s, "open-crew:1045"), 1);
    let reused = &result.days[2].crews["1045"];
    assert_eq!(reused.date, Some(day(12)));
    // the first scrape is what day 2 gets
    assert_eq!(reused.crew[1].name, "Jonas Ek");
}

#[tokio::test(start_paused = true)]
async fn explicit_start_date_wins_over_label() {
    let s = MemorySurface::new(scene());
    let mut opts = AppOptions::default();
    opts.aggregate.window = 1;
    let mut cache = LocationTimeCache::new();
    let mut orch = Orchestrator::new(&s, &opts.timing, &opts.vocab, CancellationToken::new());

    let result = MultiDayAggregator::new(&mut orch, &opts, &mut cache, &mut NullProgress)
        .run("Anna Svensson", Some(day(1)))
        .await
        .unwrap();
    assert_eq!(result.days.len(), 1);
    assert_eq!(result.days[0].date, day(1));
    assert_eq!(count(&s, "nav:forward"), 0);
}

#[tokio::test(start_paused = true)]
async fn unconfirmed_step_leaves_the_day_not_found() {
    let mut sc = scene();
    // slower than the navigation confirm budget
    sc.nav_latency_ms = 5_000;
    let s = MemorySurface::new(sc);
    let mut opts = AppOptions::default();
    opts.aggregate.window = 2;
    let mut cache = LocationTimeCache::new();
    let mut progress = RecordingProgress::default();
    let mut orch = Orchestrator::new(&s, &opts.timing, &opts.vocab, CancellationToken::new());

    let result = MultiDayAggregator::new(&mut orch, &opts, &mut cache, &mut progress)
        .run("Anna Svensson", None)
        .await
        .unwrap();

    assert!(!result.days[0].not_found);
    let d1 = &result.days[1];
    assert_eq!(d1.date, day(11));
    assert!(d1.not_found);
    assert!(d1.segments.is_empty());
    assert!(d1.crews.is_empty());
    assert_eq!(progress.failed, [1]);
    // nothing confirmed, nothing to walk back
    assert_eq!(count(&s, "nav:forward"), 1);
    assert_eq!(count(&s, "nav:back"), 0);
}

#[tokio::test(start_paused = true)]
async fn roster_for_another_date_is_not_filed_under_this_one() {
    let mut sc = scene();
    // the app skips a day: 2025-03-14 follows 2025-03-10, with Anna rostered
    let mut skipped = sc.days[2].clone();
    skipped.label = "fr 2025-03-14".into();
    sc.days[3] = skipped;
    let s = MemorySurface::new(sc);
    let mut opts = AppOptions::default();
    opts.aggregate.window = 2;
    let mut cache = LocationTimeCache::new();
    let mut orch = Orchestrator::new(&s, &opts.timing, &opts.vocab, CancellationToken::new());

    let result = MultiDayAggregator::new(&mut orch, &opts, &mut cache, &mut NullProgress)
        .run("Anna Svensson", None)
        .await
        .unwrap();

    assert_eq!(result.days[1].date, day(11));
    assert!(result.days[1].not_found);
    assert_eq!(count(&s, "open-day:Anna Svensson"), 3);
    assert_eq!(count(&s, "nav:back"), 1);
    assert_eq!(s.offset(), 0);
}

/// Fails every lookup of open day panels, as a dropped bridge would mid-poll.
struct LostDayPanels(MemorySurface);

impl Surface for LostDayPanels {
    fn query(&self, scope: Option<Handle>, slot: Slot) -> Result<Vec<Handle>, SurfaceError> {
        if scope.is_none() && slot == Slot::DayPanel {
            return Err(SurfaceError::Transport("connection reset".into()));
        }
        self.0.query(scope, slot)
    }
    fn text(&self, handle: Handle) -> Result<String, SurfaceError> { self.0.text(handle) }
    fn trigger(&self, handle: Handle) -> Result<(), SurfaceError> { self.0.trigger(handle) }
    fn open_panels(&self) -> Result<Vec<Handle>, SurfaceError> { self.0.open_panels() }
    fn restore(&self) -> Result<(), SurfaceError> { self.0.restore() }
}

#[tokio::test(start_paused = true)]
async fn day_panel_error_closes_the_panel() {
    let s = LostDayPanels(MemorySurface::new(scene()));
    let mut opts = AppOptions::default();
    opts.aggregate.window = 1;
    let mut cache = LocationTimeCache::new();
    let mut orch = Orchestrator::new(&s, &opts.timing, &opts.vocab, CancellationToken::new());

    let result = MultiDayAggregator::new(&mut orch, &opts, &mut cache, &mut NullProgress)
        .run("Anna Svensson", None)
        .await
        .unwrap();

    let d0 = &result.days[0];
    assert!(d0.not_found);
    assert_eq!(d0.turn_code, "51284A");
    assert_eq!(s.0.actions(), ["open-day:Anna Svensson", "backdrop", "close"]);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(s.0.open_panels().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn day_panel_that_never_loads_degrades_the_day() {
    let mut sc = scene();
    if let Some(p) = sc.days[2].entries[0].panel.as_mut() {
        p.never_ready = true;
    }
    let s = MemorySurface::new(sc);
    let mut opts = AppOptions::default();
    opts.aggregate.window = 1;
    let mut cache = LocationTimeCache::new();
    let mut orch = Orchestrator::new(&s, &opts.timing, &opts.vocab, CancellationToken::new());

    let result = MultiDayAggregator::new(&mut orch, &opts, &mut cache, &mut NullProgress)
        .run("Anna Svensson", None)
        .await
        .unwrap();
    let d0 = &result.days[0];
    assert!(d0.not_found);
    assert_eq!(d0.turn_code, "51284A");
    assert!(d0.crews.is_empty());
    assert_eq!(count(&s, "open-crew:1045"), 0);
}

#[tokio::test(start_paused = true)]
async fn crew_panel_that_never_loads_omits_only_that_crew() {
    let mut sc = scene();
    let legs = &mut sc.days[2].entries[0].panel.as_mut().unwrap().legs;
    legs[0].crew.as_mut().unwrap().never_ready = true;
    let s = MemorySurface::new(sc);
    let mut opts = AppOptions::default();
    opts.aggregate.window = 1;
    let mut cache = LocationTimeCache::new();
    let mut orch = Orchestrator::new(&s, &opts.timing, &opts.vocab, CancellationToken::new());

    let result = MultiDayAggregator::new(&mut orch, &opts, &mut cache, &mut NullProgress)
        .run("Anna Svensson", None)
        .await
        .unwrap();
    let d0 = &result.days[0];
    assert!(!d0.not_found);
    assert_eq!(d0.segments.len(), 3);
    assert!(!d0.crews.contains_key("1045"));
    assert!(d0.crews.contains_key("1052"));
}

#[tokio::test(start_paused = true)]
async fn cancel_stops_the_run_and_restores_once() {
    let s = MemorySurface::new(scene());
    let opts = AppOptions::default();
    let mut cache = LocationTimeCache::new();
    let cancel = CancellationToken::new();
    let mut orch = Orchestrator::new(&s, &opts.timing, &opts.vocab, cancel.clone());

    let mut progress = NullProgress;
    let mut agg = MultiDayAggregator::new(&mut orch, &opts, &mut cache, &mut progress);
    let run = agg.run("Anna Svensson", None);
    let stop = async {
        // the day panel is requested after the settle pause and takes 400 ms to load
        tokio::time::sleep(Duration::from_millis(300)).await;
        cancel.cancel();
    };
    let (out, ()) = tokio::join!(run, stop);

    assert!(matches!(out, Err(RunError::Cancelled)));
    assert_eq!(s.actions(), ["open-day:Anna Svensson", "restore"]);
    assert_eq!(s.restore_count(), 1);
    assert_eq!(s.offset(), 0);
}

#[tokio::test(start_paused = true)]
async fn missing_navigation_ends_the_run() {
    let mut sc = scene();
    sc.hide_nav = true;
    let s = MemorySurface::new(sc);
    let opts = AppOptions::default();
    let mut cache = LocationTimeCache::new();
    let mut orch = Orchestrator::new(&s, &opts.timing, &opts.vocab, CancellationToken::new());

    let out = MultiDayAggregator::new(&mut orch, &opts, &mut cache, &mut NullProgress)
        .run("Anna Svensson", None)
        .await;
    assert!(matches!(out, Err(RunError::NavigationUnavailable)));
}

#[tokio::test(start_paused = true)]
async fn single_day_needs_the_target_on_the_roster() {
    let s = MemorySurface::new(scene());
    let opts = AppOptions::default();
    let mut cache = LocationTimeCache::new();
    let mut orch = Orchestrator::new(&s, &opts.timing, &opts.vocab, CancellationToken::new());
    let mut progress = NullProgress;
    let mut agg = MultiDayAggregator::new(&mut orch, &opts, &mut cache, &mut progress);

    match agg.single_day("Per Lind").await {
        Err(RunError::TargetNotOnRoster(name)) => assert_eq!(name, "Per Lind"),
        other => panic!("expected TargetNotOnRoster, got {other:?}"),
    }

    let one = agg.single_day("Anna Svensson").await.unwrap();
    assert_eq!(one.days.len(), 1);
    assert_eq!(one.days[0].date, day(10));
    assert_eq!(one.days[0].crews.len(), 2);
    assert_eq!(s.offset(), 0);
}
