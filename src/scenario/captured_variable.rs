//! Units reading loop-owned state instead of their own copy of it.
//!
//! A loop walks the indices `17..=21` and spawns one labeler per index. All labelers are held
//! at a start gate until the loop has finished, which is when the race would bite. The buggy
//! labelers look the index up through a cursor the loop keeps overwriting, so they all see
//! whatever the loop wrote last. The fixed labelers were handed their index as an argument at
//! spawn time and label it through the pure [`label_for`].
//!
//! Safe Rust will not compile an actual data race on a captured loop variable; the shared
//! cursor is the closest faithful rendition of that bug.

use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::error::HarnessResult;
use crate::outcome::Observation;
use crate::scenario::{ScenarioContext, Variant};
use crate::sync::{CancelToken, Rendezvous};

/// The indices the loop walks.
pub const INDICES: RangeInclusive<usize> = 17..=21;

/// Label for one index.
pub fn label_for(index: usize) -> String {
    format!("job-{}", index)
}

/// What the fixed variant produces, sorted.
pub fn expected_labels() -> Vec<String> {
    let mut labels: Vec<String> = INDICES.map(label_for).collect();
    labels.sort();
    labels
}

pub(crate) fn buggy(ctx: ScenarioContext) -> BoxFuture<'static, HarnessResult<Observation>> {
    run(ctx, Variant::Buggy).boxed()
}

pub(crate) fn fixed(ctx: ScenarioContext) -> BoxFuture<'static, HarnessResult<Observation>> {
    run(ctx, Variant::Fixed).boxed()
}

async fn run(ctx: ScenarioContext, variant: Variant) -> HarnessResult<Observation> {
    let (gate, open_gate) = CancelToken::new();
    let labels = Rendezvous::buffered(INDICES.count());
    let cursor = Arc::new(AtomicUsize::new(0));

    let mut labelers = Vec::new();
    for index in INDICES {
        cursor.store(index, Ordering::Relaxed);

        let gate = gate.clone();
        let labels = labels.clone();
        let cursor = Arc::clone(&cursor);
        labelers.push(ctx.spawn(format!("labeler-{}", index), async move {
            gate.wait().await;
            let label = match variant {
                Variant::Buggy => label_for(cursor.load(Ordering::Relaxed)),
                Variant::Fixed => label_for(index),
            };
            let _ = labels.send(label).await;
        }));
    }
    open_gate.cancel();

    for labeler in labelers {
        labeler.join().await?;
    }

    let mut collected = Vec::new();
    while let Some(label) = labels.try_recv() {
        collected.push(label);
    }

    #[cfg(feature = "tracing")]
    debug!(?collected, "labels collected");

    Ok(Observation::Labels(collected))
}
