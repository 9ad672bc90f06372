// src/scrape/mod.rs
//
// Everything that *drives* the planning app: opening panels, stepping days,
// sweeping for locations. Reading what shows up is `specs`' job.

use thiserror::Error;

use crate::config::options::AppOptions;
use crate::data::Roster;
use crate::progress::Progress;
use crate::specs::roster;
use crate::store::LocationTimeCache;
use crate::surface::{Surface, SurfaceError};

pub mod aggregate;
pub mod bootstrap;
pub mod navigate;
pub mod orchestrator;
pub mod times;

pub use aggregate::MultiDayAggregator;
pub use orchestrator::{Expect, Interaction, Orchestrator, Outcome, Phase};

/// Failures that end a run early. Everything else degrades to "not found".
#[derive(Debug, Error)]
pub enum RunError {
    #[error("cancelled")]
    Cancelled,

    #[error("the app shows no date navigation controls")]
    NavigationUnavailable,

    #[error("'{0}' is not on the visible roster")]
    TargetNotOnRoster(String),

    #[error(transparent)]
    Surface(SurfaceError),
}

impl From<SurfaceError> for RunError {
    fn from(e: SurfaceError) -> Self {
        match e {
            SurfaceError::NavigationUnavailable(_) => RunError::NavigationUnavailable,
            other => RunError::Surface(other),
        }
    }
}

/// Roster of the visible day. Runs the bootstrap sweep first if the cache
/// has not been built this session.
pub async fn collect_roster<S: Surface + ?Sized>(
    orch: &mut Orchestrator<'_, S>,
    opts: &AppOptions,
    cache: &mut LocationTimeCache,
    progress: &mut dyn Progress,
) -> Result<Roster, RunError> {
    if !cache.is_built() {
        logf!("Location cache not built yet, sweeping first");
        bootstrap::sweep(orch, opts, cache, progress).await?;
    }
    let r = roster::parse(orch.surface(), &opts.vocab, cache)?;
    logf!("Roster {}: {} people", r.date_label, r.people.len());
    Ok(r)
}
