// src/scrape/aggregate.rs
//
// Multi-day itinerary for one person, strictly sequential:
//
//   day 0     visible roster, no navigation
//   day k>0   step forward, re-read roster, find the person by exact name;
//             an unconfirmed step or a roster for another date is `not_found`
//   each day  day panel → segments; per train: day panel again → trip → crew panel
//   end       step back once per confirmed forward step
//
// A missing person, a panel that never loads or a train that can't be found
// degrades that unit only. Missing navigation controls and cancellation end
// the run (a cancelled run leaves the app wherever it was).

use std::collections::HashMap;

use chrono::{Days, Local, NaiveDate};

use crate::config::options::AppOptions;
use crate::core::sanitize::first_name;
use crate::data::{AggregateResult, DayRecord, Person, Roster, TrainCrew};
use crate::progress::Progress;
use crate::specs::{crew_panel, day_panel, roster};
use crate::store::LocationTimeCache;
use crate::surface::{Direction, Handle, Slot, Surface};

use super::RunError;
use super::navigate;
use super::orchestrator::{Expect, Interaction, Orchestrator, Outcome};

/// Crew memo key: train number, plus the date unless crews are reused across days.
type CrewKey = (String, Option<NaiveDate>);

pub struct MultiDayAggregator<'o, 'a, S: Surface + ?Sized> {
    orch: &'o mut Orchestrator<'a, S>,
    opts: &'o AppOptions,
    cache: &'o mut LocationTimeCache,
    progress: &'o mut dyn Progress,
    crews: HashMap<CrewKey, TrainCrew>,
}

impl<'o, 'a, S: Surface + ?Sized> MultiDayAggregator<'o, 'a, S> {
    pub fn new(
        orch: &'o mut Orchestrator<'a, S>,
        opts: &'o AppOptions,
        cache: &'o mut LocationTimeCache,
        progress: &'o mut dyn Progress,
    ) -> Self {
        Self { orch, opts, cache, progress, crews: HashMap::new() }
    }

    /// `window` days starting at `start` (default: the roster's date, else today).
    pub async fn run(&mut self, target: &str, start: Option<NaiveDate>) -> Result<AggregateResult, RunError> {
        let window = self.opts.aggregate.window.max(1);
        logf!("Itinerary for {target}: {window} day(s)");
        self.progress.begin(window);

        let result = self.run_window(target, start, window).await;
        self.progress.finish();
        result
    }

    async fn run_window(
        &mut self,
        target: &str,
        start: Option<NaiveDate>,
        window: usize,
    ) -> Result<AggregateResult, RunError> {
        let first = roster::parse(self.orch.surface(), &self.opts.vocab, self.cache)?;
        let base = start.or(first.date).unwrap_or_else(|| Local::now().date_naive());

        let mut days = Vec::with_capacity(window);
        let mut confirmed = 0u32;

        for k in 0..window {
            if self.orch.is_cancelled() {
                return Err(RunError::Cancelled);
            }
            let date = base + Days::new(k as u64);

            let visible = if k == 0 {
                Some(first.clone())
            } else {
                self.progress.log(&format!("Day {}/{window}: moving to {date}…", k + 1));
                if navigate::step(self.orch, Direction::Forward).await? {
                    confirmed += 1;
                    let shown = first.date.map(|d| d + Days::new(k as u64));
                    self.visible_roster(date, shown)
                } else {
                    logw!("day {date}: date change not confirmed");
                    None
                }
            };

            let rec = match visible {
                Some(r) => self.scrape_day(&r, target, date).await?,
                None => DayRecord::not_found(date),
            };
            if rec.not_found {
                self.progress.item_failed(k, "not found");
            } else {
                logf!("day {date}: {} segment(s), {} crew(s)", rec.segments.len(), rec.crews.len());
                self.progress.item_done(k);
            }
            days.push(rec);
        }

        if confirmed > 0 {
            self.progress.log("Returning to the start date…");
            let back = navigate::steps(self.orch, Direction::Back, confirmed).await?;
            if back < confirmed {
                logw!("returned {back}/{confirmed} day(s) with confirmation");
            }
        }
        let unconfirmed = window - 1 - confirmed as usize;
        if unconfirmed > 0 {
            logw!("{unconfirmed} forward step(s) unconfirmed; the app may not be on the start date");
        }

        Ok(AggregateResult { person_name: s!(target), captured_at: Local::now(), days })
    }

    /// Roster after a forward step, unless its label names another day than `shown`.
    fn visible_roster(&mut self, date: NaiveDate, shown: Option<NaiveDate>) -> Option<Roster> {
        match roster::parse(self.orch.surface(), &self.opts.vocab, self.cache) {
            Ok(r) if r.date.zip(shown).is_some_and(|(got, want)| got != want) => {
                logw!("day {date}: app shows '{}' instead", r.date_label);
                None
            }
            Ok(r) => Some(r),
            Err(e) => {
                loge!("day {date}: roster unreadable: {e}");
                None
            }
        }
    }

    /// The visible day only: day panel plus crews, no navigation.
    pub async fn single_day(&mut self, target: &str) -> Result<AggregateResult, RunError> {
        let r = roster::parse(self.orch.surface(), &self.opts.vocab, self.cache)?;
        if r.find(target).is_none() {
            return Err(RunError::TargetNotOnRoster(s!(target)));
        }
        let date = r.date.unwrap_or_else(|| Local::now().date_naive());
        self.progress.begin(1);
        let rec = self.scrape_day(&r, target, date).await;
        self.progress.finish();
        Ok(AggregateResult { person_name: s!(target), captured_at: Local::now(), days: vec![rec?] })
    }

    async fn scrape_day(&mut self, r: &Roster, target: &str, date: NaiveDate) -> Result<DayRecord, RunError> {
        let Some(person) = r.find(target) else {
            logw!("day {date}: {target} not on roster");
            return Ok(DayRecord::not_found(date));
        };
        let mut rec = DayRecord::for_person(date, person);
        let Some(entry) = r.handle_of(person) else {
            rec.degrade();
            return Ok(rec);
        };

        let it = Interaction {
            label: format!("day {date} {target}"),
            target: entry,
            expect: day_expect(person),
            budget: self.opts.timing.day_open(),
            await_prior_close: true,
            close_after: true,
        };
        match self.orch.run(&it, |s, h| day_panel::extract(s, h)).await {
            Ok(Outcome::Done(segs)) => rec.segments = segs,
            Ok(Outcome::TimedOut) => {
                rec.degrade();
                return Ok(rec);
            }
            Ok(Outcome::Cancelled) => return Err(RunError::Cancelled),
            Err(e) => {
                loge!("day {date}: day panel: {e}");
                self.orch.close_all();
                rec.degrade();
                return Ok(rec);
            }
        }

        for nr in rec.train_numbers() {
            if rec.crews.contains_key(&nr) {
                continue;
            }
            let key = self.crew_key(&nr, date);
            if let Some(known) = self.crews.get(&key) {
                logd!("crew {nr}: reusing earlier scrape");
                let mut c = known.clone();
                c.date = Some(date);
                rec.crews.insert(nr, c);
                continue;
            }
            self.progress.log(&format!("{date}: crew for train {nr}…"));
            match self.scrape_crew(person, entry, &nr, date).await? {
                Some(crew) => {
                    self.crews.insert(key, crew.clone());
                    rec.crews.insert(nr, crew);
                }
                None => logw!("crew {nr} on {date}: omitted"),
            }
        }
        Ok(rec)
    }

    /// Day panel again (it forgets train details on close), click the train, read the crew.
    async fn scrape_crew(
        &mut self,
        person: &Person,
        entry: Handle,
        train_nr: &str,
        date: NaiveDate,
    ) -> Result<Option<TrainCrew>, RunError> {
        let open = Interaction {
            label: format!("crew {train_nr}: day panel"),
            target: entry,
            expect: day_expect(person),
            budget: self.opts.timing.day_open(),
            await_prior_close: true,
            close_after: false,
        };
        let trip = match self.orch.run(&open, |s, h| day_panel::find_trip(s, h, train_nr)).await {
            Ok(Outcome::Done(Some(h))) => h,
            Ok(Outcome::Done(None)) => {
                logw!("crew {train_nr}: no trip element in day panel");
                self.orch.close_all();
                return Ok(None);
            }
            Ok(Outcome::TimedOut) => return Ok(None),
            Ok(Outcome::Cancelled) => return Err(RunError::Cancelled),
            Err(e) => {
                loge!("crew {train_nr}: {e}");
                self.orch.close_all();
                return Ok(None);
            }
        };

        let crew_it = Interaction {
            label: format!("crew {train_nr}"),
            target: trip,
            expect: Expect { panel: Slot::CrewPanel, token: s!(train_nr) },
            budget: self.opts.timing.crew_open(),
            await_prior_close: false,
            close_after: true,
        };
        match self.orch.run(&crew_it, |s, h| crew_panel::extract(s, h)).await {
            Ok(Outcome::Done(mut crew)) => {
                if crew.train_nr.is_empty() {
                    crew.train_nr = s!(train_nr);
                }
                if crew.date.is_none() {
                    crew.date = Some(date);
                }
                Ok(Some(crew))
            }
            Ok(Outcome::TimedOut) => Ok(None),
            Ok(Outcome::Cancelled) => Err(RunError::Cancelled),
            Err(e) => {
                loge!("crew {train_nr}: {e}");
                Ok(None)
            }
        }
    }

    fn crew_key(&self, train_nr: &str, date: NaiveDate) -> CrewKey {
        let day = (!self.opts.aggregate.reuse_crew_across_days).then_some(date);
        (s!(train_nr), day)
    }
}

fn day_expect(p: &Person) -> Expect {
    Expect { panel: Slot::DayPanel, token: s!(first_name(&p.name)) }
}
