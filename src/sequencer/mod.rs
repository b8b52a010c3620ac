//! Multi-step asynchronous command sequencing.
//!
//! Every stateful plugin operation (set modes/bands, set initial EPS bearer
//! settings, enable/disable unsolicited events, ...) is a chain of modem
//! commands in which individual links may need to be skipped, bracketed by
//! radio power changes, or rolled back after a partial failure. The engine
//! here keeps that shape explicit: a closed step enumeration, one handler
//! invocation per state, one transport round trip per suspension point.
//!
//! Failure policy: the first error wins. When a handler fails outside the
//! cleanup path, the engine records the error and jumps to the sequence's
//! designated cleanup step so that acquired locks and radio brackets are
//! always unwound; later errors on the way out are logged and discarded.
//! The terminal step is the only place the saved error is consumed, so a
//! sequence completes exactly once, with either success or the first error.

use std::fmt::Debug;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::core::{ModemError, Result};

/// Per-modem exclusive token for radio-state mutations.
mod lock;


pub use lock::{OperationLock, OperationToken};

/// A closed set of sequence states, walked in declaration order.
///
/// Concrete operations define their own enumeration and give each state a
/// successor; the engine never invents transitions beyond what `next` and
/// the handlers' explicit jumps describe.
pub trait Step: Copy + Eq + Debug + Send + 'static {
    /// Entry state of the sequence.
    const FIRST: Self;

    /// Terminal state. The only place the sequence outcome is reported.
    const LAST: Self;

    /// The state following `self` in declaration order.
    fn next(self) -> Self;
}

/// Transition returned by a step handler that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow<S> {
    /// Move to the next state in declaration order.
    Advance,
    /// Move directly to the given state, skipping intermediate ones.
    Jump(S),
}

/// Engine-owned state of one in-flight sequence.
///
/// Holds the current step and the first-error slot. The slot is drained
/// exactly once, at the terminal step; dropping a context that still holds
/// an error means some path bypassed the terminal step.
#[derive(Debug)]
pub struct SequenceContext<S: Step> {
    step: S,
    saved_error: Option<ModemError>,
}

impl<S: Step> SequenceContext<S> {
    fn new() -> Self {
        Self {
            step: S::FIRST,
            saved_error: None,
        }
    }

    /// Current state of the sequence.
    pub fn step(&self) -> S {
        self.step
    }

    fn move_to(&mut self, step: S) {
        self.step = step;
    }

    /// Retain `error` only if no earlier error is already saved.
    ///
    /// Later errors show up while rolling forward through cleanup; they are
    /// logged and dropped so the first failure stays the reported one.
    fn record_first(&mut self, error: ModemError) {
        if let Some(ref saved) = self.saved_error {
            debug!("discarding later error '{error}' (keeping '{saved}')");
            return;
        }
        self.saved_error = Some(error);
    }

    fn take_error(&mut self) -> Option<ModemError> {
        self.saved_error.take()
    }
}

impl<S: Step> Drop for SequenceContext<S> {
    fn drop(&mut self) {
        if self.saved_error.is_some() {
            warn!("sequence context dropped at {:?} with an unreported error", self.step);
            debug_assert!(false, "sequence context dropped with an unreported error");
        }
    }
}

/// One concrete multi-step operation.
///
/// The handler owns all per-operation data (built command, captured initial
/// power state, acquired lock token, ...) and decides per state whether a
/// transport command is needed at all; states whose predicate does not hold
/// fall through with [`Flow::Advance`] without a round trip.
#[async_trait]
pub trait Sequence: Send {
    /// State enumeration of this operation.
    type Step: Step;

    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Execute the logic for `step` and return the transition to take.
    ///
    /// # Errors
    ///
    /// A returned error is recorded into the first-error slot and redirects
    /// the sequence to [`Sequence::cleanup_step`].
    async fn run_step(&mut self, step: Self::Step) -> Result<Flow<Self::Step>>;

    /// Where to resume after `failed` reported an error.
    ///
    /// Pre-cleanup states map to the first cleanup state that undoes what
    /// has been done so far (restore radio, release the lock); states
    /// already on the cleanup path map to their own successor so the
    /// sequence keeps rolling forward to the terminal state.
    fn cleanup_step(&self, failed: Self::Step) -> Self::Step;
}

/// Drive `sequence` from its first state to its terminal state.
///
/// Returns once the terminal state is reached, yielding success or the
/// first error recorded along the way. This is the single completion point
/// of the operation.
///
/// # Errors
///
/// The first error recorded by any step handler.
pub async fn run<Q: Sequence>(sequence: &mut Q) -> Result<()> {
    let mut ctx = SequenceContext::<Q::Step>::new();

    loop {
        let step = ctx.step();
        if step == Q::Step::LAST {
            return match ctx.take_error() {
                Some(error) => Err(error),
                None => Ok(()),
            };
        }

        match sequence.run_step(step).await {
            Ok(Flow::Advance) => ctx.move_to(step.next()),
            Ok(Flow::Jump(target)) => ctx.move_to(target),
            Err(error) => {
                let cleanup = sequence.cleanup_step(step);
                debug!(
                    "{}: step {step:?} failed ({error}), jumping to {cleanup:?}",
                    sequence.name()
                );
                ctx.record_first(error);
                ctx.move_to(cleanup);
            }
        }
    }
}
