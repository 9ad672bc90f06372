// src/scrape/navigate.rs
use crate::surface::{Direction, Surface};

use super::RunError;
use super::orchestrator::{Orchestrator, Waited};

/// Step one day and wait for the date label to change.
///
/// `Ok(false)`: the label never changed within budget (soft, logged).
/// Missing controls and cancellation end the run.
pub async fn step<S: Surface + ?Sized>(orch: &mut Orchestrator<'_, S>, dir: Direction) -> Result<bool, RunError> {
    if !orch.settle().await {
        return Err(cancelled(orch));
    }
    let surface = orch.surface();
    let before = surface.date_label()?;
    surface.navigate(dir)?;

    let timing = orch.timing();
    let waited = orch
        .poll(timing.nav_poll(), timing.nav_confirm(), |s| {
            let now = s.date_label()?;
            Ok((now != before).then_some(now))
        })
        .await?;

    match waited {
        Waited::Ready(label) => {
            logd!("navigate {dir:?}: '{before}' → '{label}'");
            Ok(true)
        }
        Waited::Expired => {
            logw!("navigate {dir:?}: date still '{before}' after {:?}", timing.nav_confirm());
            Ok(false)
        }
        Waited::Cancelled => Err(cancelled(orch)),
    }
}

/// `n` steps in one direction; counts the confirmed ones.
pub async fn steps<S: Surface + ?Sized>(
    orch: &mut Orchestrator<'_, S>,
    dir: Direction,
    n: u32,
) -> Result<u32, RunError> {
    let mut confirmed = 0;
    for _ in 0..n {
        if step(orch, dir).await? {
            confirmed += 1;
        }
    }
    Ok(confirmed)
}

fn cancelled<S: Surface + ?Sized>(orch: &mut Orchestrator<'_, S>) -> RunError {
    orch.cleanup();
    RunError::Cancelled
}
