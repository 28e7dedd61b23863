use crate::suspension::Suspension;
use crate::{
    Breakpoint, BreakpointKind, BreakpointRegistry, Cancelled, DebugEvent, DebugEventBus,
    HitContext, ResumeAction, RoundSummary, SuspensionKind, TokenUsage, TokenUsageTracker,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

const STEP_BREAKPOINT_ID: &str = "step";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckpointState {
    Running,
    Suspended,
}

/// Per-loop-invocation evaluator that may suspend the loop between rounds.
///
/// The loop must not call [`IterationCheckpoint::evaluate`] concurrently with
/// itself. Doing so is a caller error: it is logged and the earlier waiter is
/// released with `Continue`.
pub struct IterationCheckpoint {
    session_id: String,
    registry: Arc<BreakpointRegistry>,
    usage: Arc<TokenUsageTracker>,
    events: DebugEventBus,
    started_at: Instant,
    step_armed: AtomicBool,
    closed: AtomicBool,
    suspension: Suspension,
}

impl IterationCheckpoint {
    pub fn new(
        session_id: impl Into<String>,
        registry: Arc<BreakpointRegistry>,
        usage: Arc<TokenUsageTracker>,
        events: DebugEventBus,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            registry,
            usage,
            events,
            started_at: Instant::now(),
            step_armed: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            suspension: Suspension::default(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> CheckpointState {
        if self.suspension.is_pending() {
            CheckpointState::Suspended
        } else {
            CheckpointState::Running
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.state() == CheckpointState::Suspended
    }

    pub fn is_step_armed(&self) -> bool {
        self.step_armed.load(Ordering::SeqCst)
    }

    /// Decides whether the loop may proceed into the next round.
    ///
    /// Returns the action that released a suspension (or `Continue` when nothing
    /// matched). An `Abort` is surfaced as [`Cancelled`] instead.
    pub async fn evaluate(
        &self,
        iteration: usize,
        last_round: Option<&RoundSummary>,
        had_error: bool,
    ) -> Result<ResumeAction, Cancelled> {
        if self.is_closed() {
            return Ok(ResumeAction::Continue);
        }
        let step_mode = self.registry.step_mode();
        if !step_mode && !self.is_step_armed() && !self.registry.has_enabled() {
            return Ok(ResumeAction::Continue);
        }

        let usage = self.usage.snapshot();
        let Some(breakpoint) =
            self.matching_breakpoint(step_mode, iteration, last_round, had_error, usage)
        else {
            return Ok(ResumeAction::Continue);
        };

        let context = HitContext {
            breakpoint,
            iteration,
            usage,
            last_round_id: last_round.map(|round| round.id.clone()),
            last_response: last_round.map(|round| round.response.clone()),
            last_tool_calls: last_round
                .map(|round| round.tool_calls.clone())
                .unwrap_or_default(),
            had_error,
            session_id: self.session_id.clone(),
            elapsed_ms: self.started_at.elapsed().as_millis() as u64,
        };
        info!(
            session_id = %self.session_id,
            breakpoint_id = %context.breakpoint.id,
            label = %context.breakpoint.label,
            iteration,
            "iteration breakpoint hit"
        );

        let pending = self.suspension.arm("iteration checkpoint");
        if self.is_closed() {
            self.suspension.resolve(ResumeAction::Continue);
            return Ok(ResumeAction::Continue);
        }
        self.events.publish(DebugEvent::BreakpointHit(context));
        let action = pending.wait().await;

        match action {
            ResumeAction::Step => self.step_armed.store(true, Ordering::SeqCst),
            ResumeAction::Skip => {
                warn!(
                    session_id = %self.session_id,
                    "skip has no effect on an iteration breakpoint; continuing"
                );
            }
            ResumeAction::Continue | ResumeAction::Abort => {}
        }
        debug!(session_id = %self.session_id, action = %action, "iteration checkpoint resumed");
        self.events.publish(DebugEvent::Resumed {
            action,
            target: SuspensionKind::Iteration,
        });

        if action == ResumeAction::Abort {
            return Err(Cancelled {
                target: SuspensionKind::Iteration,
            });
        }
        Ok(action)
    }

    /// Resolves the pending suspension. Returns `false` (and logs) when nothing is pending.
    pub fn resume(&self, action: ResumeAction) -> bool {
        if self.suspension.resolve(action) {
            return true;
        }
        warn!(
            session_id = %self.session_id,
            action = %action,
            "resume requested but the iteration checkpoint is not suspended"
        );
        false
    }

    /// Releases a pending suspension with `Continue`. Never raises cancellation.
    pub fn cancel_pending(&self) -> bool {
        let released = self.suspension.resolve(ResumeAction::Continue);
        if released {
            debug!(session_id = %self.session_id, "pending iteration suspension released");
        }
        released
    }

    /// Disposes the checkpoint: any pending suspension is released with `Continue`
    /// and later evaluations never suspend.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel_pending();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn matching_breakpoint(
        &self,
        step_mode: bool,
        iteration: usize,
        last_round: Option<&RoundSummary>,
        had_error: bool,
        usage: TokenUsage,
    ) -> Option<Breakpoint> {
        let armed = self.step_armed.swap(false, Ordering::SeqCst);
        if armed || step_mode {
            return Some(Breakpoint::synthetic(
                BreakpointKind::Step,
                STEP_BREAKPOINT_ID,
                "Step",
            ));
        }

        self.registry
            .first_enabled_match(|breakpoint| match &breakpoint.kind {
                BreakpointKind::ByTool { tool_name } => {
                    last_round.is_some_and(|round| round.calls_tool(tool_name))
                }
                BreakpointKind::OnError => had_error,
                BreakpointKind::AtIteration { iteration: target } => iteration >= *target,
                BreakpointKind::OnTokenThreshold { threshold } => usage.total() >= *threshold,
                BreakpointKind::Step => true,
                BreakpointKind::BeforeToolCall | BreakpointKind::AfterToolCall => false,
            })
    }
}
