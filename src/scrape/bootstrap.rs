// src/scrape/bootstrap.rs
//
// One-time sweep around the origin day so reserve entries (no location in
// their code) can borrow a location seen on a neighbouring day.
//
//   back `back`, forward `back + forward`, back `forward`  → origin again
//
// Every visited day is parsed; parsing feeds the cache as a side effect.

use crate::config::options::AppOptions;
use crate::progress::Progress;
use crate::specs::roster;
use crate::store::LocationTimeCache;
use crate::surface::{Direction, Surface};

use super::RunError;
use super::navigate;
use super::orchestrator::Orchestrator;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub days_visited: usize,
    pub unconfirmed_steps: usize,
    pub locations: usize,
}

pub async fn sweep<S: Surface + ?Sized>(
    orch: &mut Orchestrator<'_, S>,
    opts: &AppOptions,
    cache: &mut LocationTimeCache,
    progress: &mut dyn Progress,
) -> Result<SweepReport, RunError> {
    let (back, fwd) = (opts.sweep.back, opts.sweep.forward);
    let legs = [
        (Direction::Back, back),
        (Direction::Forward, back + fwd),
        (Direction::Back, fwd),
    ];
    let total = 1 + legs.iter().map(|(_, n)| *n as usize).sum::<usize>();

    progress.begin(total);
    progress.log("Building location cache…");

    let mut report = SweepReport::default();
    observe(orch, opts, cache, progress, &mut report)?;

    for (dir, n) in legs {
        for _ in 0..n {
            if orch.is_cancelled() {
                progress.finish();
                return Err(RunError::Cancelled);
            }
            let result = navigate::step(orch, dir).await;
            let confirmed = match result {
                Ok(c) => c,
                Err(e) => {
                    progress.finish();
                    return Err(e);
                }
            };
            if !confirmed {
                report.unconfirmed_steps += 1;
            }
            observe(orch, opts, cache, progress, &mut report)?;
        }
    }

    cache.mark_built();
    report.locations = cache.location_count();
    logf!(
        "Location cache built: {} days, {} people located",
        report.days_visited, report.locations
    );
    progress.finish();
    Ok(report)
}

fn observe<S: Surface + ?Sized>(
    orch: &Orchestrator<'_, S>,
    opts: &AppOptions,
    cache: &mut LocationTimeCache,
    progress: &mut dyn Progress,
    report: &mut SweepReport,
) -> Result<(), RunError> {
    let idx = report.days_visited;
    let r = roster::parse(orch.surface(), &opts.vocab, cache)?;
    logd!("sweep: {} ({} entries)", r.date_label, r.people.len());
    progress.log(&format!("Scanning {}…", r.date_label));
    progress.item_done(idx);
    report.days_visited += 1;
    Ok(())
}
