use crate::suspension::Suspension;
use crate::{
    Breakpoint, BreakpointKind, BreakpointRegistry, Cancelled, DebugEvent, DebugEventBus,
    ResumeAction, SettingsSource, SuspensionKind, ToolCallCheck, ToolCallTiming,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

pub const SPAWN_AGENT_TOOL: &str = "spawn_agent";
pub const SEND_INPUT_TOOL: &str = "send_input";
pub const WAIT_TOOL: &str = "wait";
pub const CLOSE_AGENT_TOOL: &str = "close_agent";

pub const SUBAGENT_TOOLS: [&str; 4] = [
    SPAWN_AGENT_TOOL,
    SEND_INPUT_TOOL,
    WAIT_TOOL,
    CLOSE_AGENT_TOOL,
];

pub fn is_subagent_tool(tool_name: &str) -> bool {
    SUBAGENT_TOOLS.contains(&tool_name)
}

/// Evaluator that may suspend execution immediately before or after a tool call.
///
/// Concurrent tool calls queue on the gate, so at most one tool-call
/// suspension is pending at any time.
pub struct ToolCallGate {
    registry: Arc<BreakpointRegistry>,
    settings: Arc<dyn SettingsSource>,
    events: DebugEventBus,
    suspension: Suspension,
    turn: tokio::sync::Mutex<()>,
    closed: AtomicBool,
}

impl ToolCallGate {
    pub fn new(
        registry: Arc<BreakpointRegistry>,
        settings: Arc<dyn SettingsSource>,
        events: DebugEventBus,
    ) -> Self {
        Self {
            registry,
            settings,
            events,
            suspension: Suspension::default(),
            turn: tokio::sync::Mutex::new(()),
            closed: AtomicBool::new(false),
        }
    }

    /// Cheap pre-check: could any tool call stop at this timing?
    pub fn has_pending(&self, timing: ToolCallTiming) -> bool {
        let settings = self.settings.tool_call_breaks();
        let toggled = match timing {
            ToolCallTiming::Before => settings.before(false) || settings.before(true),
            ToolCallTiming::After => settings.after(false) || settings.after(true),
        };
        toggled || self.explicit_breakpoint(timing).is_some()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspension.is_pending()
    }

    /// The breakpoint that would stop this particular tool call, if any.
    /// Settings toggles win over explicit breakpoints.
    pub fn matching_breakpoint(
        &self,
        timing: ToolCallTiming,
        tool_name: &str,
    ) -> Option<Breakpoint> {
        self.settings_breakpoint(timing, tool_name)
            .or_else(|| self.explicit_breakpoint(timing))
    }

    pub async fn evaluate(&self, check: ToolCallCheck) -> Result<ResumeAction, Cancelled> {
        if self.is_closed()
            || self
                .matching_breakpoint(check.timing, &check.tool_name)
                .is_none()
        {
            return Ok(ResumeAction::Continue);
        }

        let _turn = self.turn.lock().await;
        // Breakpoints and toggles may have changed while queued behind another call.
        if self.is_closed() {
            return Ok(ResumeAction::Continue);
        }
        let Some(breakpoint) = self.matching_breakpoint(check.timing, &check.tool_name) else {
            return Ok(ResumeAction::Continue);
        };

        let timing = check.timing;
        let tool_name = check.tool_name.clone();
        info!(
            session_id = %check.session_id,
            breakpoint_id = %breakpoint.id,
            tool_name = %tool_name,
            tool_call_id = %check.tool_call_id,
            timing = %timing,
            "tool-call breakpoint hit"
        );

        let pending = self.suspension.arm("tool-call gate");
        if self.is_closed() {
            self.suspension.resolve(ResumeAction::Continue);
            return Ok(ResumeAction::Continue);
        }
        self.events
            .publish(DebugEvent::ToolCallBreakpointHit(check.into_hit(breakpoint)));
        let action = pending.wait().await;

        debug!(
            tool_name = %tool_name,
            timing = %timing,
            action = %action,
            "tool-call gate resumed"
        );
        self.events.publish(DebugEvent::Resumed {
            action,
            target: SuspensionKind::ToolCall,
        });

        if action == ResumeAction::Abort {
            return Err(Cancelled {
                target: SuspensionKind::ToolCall,
            });
        }
        Ok(action)
    }

    /// Resolves the pending suspension. Returns `false` (and logs) when nothing is pending.
    pub fn resume(&self, action: ResumeAction) -> bool {
        if self.suspension.resolve(action) {
            return true;
        }
        warn!(action = %action, "resume requested but no tool call is suspended");
        false
    }

    /// Releases a pending suspension with `Continue`. Never raises cancellation.
    pub fn cancel_pending(&self) -> bool {
        self.suspension.resolve(ResumeAction::Continue)
    }

    /// Releases the pending suspension and every queued caller with `Continue`.
    /// A closed gate never suspends again.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let released = self.cancel_pending();
        debug!(released, "tool-call gate closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn settings_breakpoint(&self, timing: ToolCallTiming, tool_name: &str) -> Option<Breakpoint> {
        let settings = self.settings.tool_call_breaks();
        let subagent = is_subagent_tool(tool_name);
        let (enabled, kind) = match timing {
            ToolCallTiming::Before => (settings.before(subagent), BreakpointKind::BeforeToolCall),
            ToolCallTiming::After => (settings.after(subagent), BreakpointKind::AfterToolCall),
        };
        if !enabled {
            return None;
        }

        let (id, label) = match (timing, subagent) {
            (ToolCallTiming::Before, false) => ("settings:before_tool_call", "Before tool call"),
            (ToolCallTiming::After, false) => ("settings:after_tool_call", "After tool call"),
            (ToolCallTiming::Before, true) => {
                ("settings:before_subagent_call", "Before subagent call")
            }
            (ToolCallTiming::After, true) => ("settings:after_subagent_call", "After subagent call"),
        };
        Some(Breakpoint::synthetic(kind, id, label))
    }

    fn explicit_breakpoint(&self, timing: ToolCallTiming) -> Option<Breakpoint> {
        self.registry
            .first_enabled_match(|breakpoint| breakpoint.kind.tool_call_timing() == Some(timing))
    }
}
