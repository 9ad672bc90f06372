// src/scrape/times.rs
//
// Shift times for entries that print none: open the person's day panel,
// take first leg start / last leg end, remember it. The only place the
// time half of the cache gets written.

use crate::config::options::AppOptions;
use crate::core::sanitize::first_name;
use crate::data::{Roster, TimeRange};
use crate::progress::Progress;
use crate::specs::{day_panel, roster};
use crate::store::LocationTimeCache;
use crate::surface::{Slot, Surface};

use super::RunError;
use super::orchestrator::{Expect, Interaction, Orchestrator, Outcome};

/// Resolve unknown times on `roster`'s day; returns the re-parsed roster.
pub async fn resolve_times<S: Surface + ?Sized>(
    orch: &mut Orchestrator<'_, S>,
    opts: &AppOptions,
    cache: &mut LocationTimeCache,
    roster_in: &Roster,
    progress: &mut dyn Progress,
) -> Result<Roster, RunError> {
    let Some(date) = roster_in.date else {
        logw!("times: no date in label '{}', nothing to key on", roster_in.date_label);
        return Ok(roster_in.clone());
    };

    let todo: Vec<_> = roster_in.people.iter().filter(|p| !p.has_known_time()).collect();
    progress.begin(todo.len());

    for (i, p) in todo.iter().enumerate() {
        if orch.is_cancelled() {
            progress.finish();
            return Err(RunError::Cancelled);
        }
        let Some(target) = roster_in.handle_of(p) else { continue };
        progress.log(&format!("Times: {} ({}/{})", p.name, i + 1, todo.len()));

        let it = Interaction {
            label: format!("times {}", p.name),
            target,
            expect: Expect { panel: Slot::DayPanel, token: s!(first_name(&p.name)) },
            budget: opts.timing.day_open(),
            await_prior_close: true,
            close_after: true,
        };
        match orch.run(&it, |s, h| day_panel::extract(s, h)).await {
            Ok(Outcome::Done(segs)) => match (segs.first(), segs.last()) {
                (Some(a), Some(b)) => {
                    cache.record_time(&p.name, date, TimeRange::new(a.start.clone(), b.end.clone()));
                    progress.item_done(i);
                }
                _ => progress.item_failed(i, "empty day panel"),
            },
            Ok(Outcome::TimedOut) => progress.item_failed(i, "day panel timed out"),
            Ok(Outcome::Cancelled) => {
                progress.finish();
                return Err(RunError::Cancelled);
            }
            Err(e) => {
                loge!("times: {}: {e}", p.name);
                progress.item_failed(i, &e.to_string());
            }
        }
    }

    progress.finish();
    Ok(roster::parse(orch.surface(), &opts.vocab, cache)?)
}
