use crate::session::{CheckpointStack, active_checkpoint};
use crate::{ResumeAction, SuspensionKind, ToolCallGate};
use std::sync::Arc;
use tracing::{debug, warn};

/// Operator-facing commands. Each resolves whichever suspension is pending:
/// the active iteration checkpoint first, then the tool-call gate.
#[derive(Clone)]
pub struct ResumeController {
    checkpoints: CheckpointStack,
    gate: Arc<ToolCallGate>,
}

impl ResumeController {
    pub(crate) fn new(checkpoints: CheckpointStack, gate: Arc<ToolCallGate>) -> Self {
        Self { checkpoints, gate }
    }

    pub fn continue_execution(&self) -> Option<SuspensionKind> {
        self.resume(ResumeAction::Continue)
    }

    pub fn step(&self) -> Option<SuspensionKind> {
        self.resume(ResumeAction::Step)
    }

    pub fn abort(&self) -> Option<SuspensionKind> {
        self.resume(ResumeAction::Abort)
    }

    pub fn skip(&self) -> Option<SuspensionKind> {
        self.resume(ResumeAction::Skip)
    }

    /// Returns which suspension was resolved, or `None` when nothing was pending.
    pub fn resume(&self, action: ResumeAction) -> Option<SuspensionKind> {
        if let Some(checkpoint) = active_checkpoint(&self.checkpoints) {
            if checkpoint.is_suspended() && checkpoint.resume(action) {
                debug!(action = %action, "resumed iteration checkpoint");
                return Some(SuspensionKind::Iteration);
            }
        }

        if self.gate.is_suspended() && self.gate.resume(action) {
            debug!(action = %action, "resumed tool-call gate");
            return Some(SuspensionKind::ToolCall);
        }

        warn!(action = %action, "no active checkpoint to resume");
        None
    }

    pub fn has_pending(&self) -> bool {
        active_checkpoint(&self.checkpoints).is_some_and(|checkpoint| checkpoint.is_suspended())
            || self.gate.is_suspended()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        BreakpointKind, DebugSession, ResumeAction, SuspensionKind, ToolCallCheck,
        ToolCallRecord,
    };
    use serde_json::json;
    use std::time::Duration;

    async fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
        for _ in 0..50 {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        false
    }

    #[test]
    fn nothing_pending_reports_none() {
        let session = DebugSession::new();
        let controller = session.controller();
        assert!(!controller.has_pending());
        assert_eq!(controller.continue_execution(), None);
        assert_eq!(controller.skip(), None);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn routes_to_suspended_iteration_checkpoint() {
        let session = DebugSession::new();
        session.registry().set_step_mode(true);
        let guard = session.begin_loop();
        let controller = session.controller();

        let checkpoint = guard.checkpoint().clone();
        let task = tokio::spawn(async move { checkpoint.evaluate(0, None, false).await });
        assert!(wait_for(|| controller.has_pending()).await);

        assert_eq!(controller.step(), Some(SuspensionKind::Iteration));
        let result = task.await.expect("evaluate task should join");
        assert_eq!(result, Ok(ResumeAction::Step));
        assert!(guard.is_step_armed());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn falls_back_to_gate_when_checkpoint_is_running() {
        let session = DebugSession::new();
        session.registry().add(BreakpointKind::BeforeToolCall);
        let _guard = session.begin_loop();
        let controller = session.controller();

        let gate = session.gate().clone();
        let call = ToolCallRecord::new("call-1", "shell", json!({"command": "ls"}));
        let session_id = session.id().to_string();
        let task = tokio::spawn(async move {
            gate.evaluate(ToolCallCheck::before(&call, session_id))
                .await
        });
        assert!(wait_for(|| controller.has_pending()).await);

        assert_eq!(controller.skip(), Some(SuspensionKind::ToolCall));
        let result = task.await.expect("gate task should join");
        assert_eq!(result, Ok(ResumeAction::Skip));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn abort_through_controller_cancels_the_gate_caller() {
        let session = DebugSession::new();
        session.registry().add(BreakpointKind::AfterToolCall);
        let controller = session.controller();

        let gate = session.gate().clone();
        let call = ToolCallRecord::new("call-9", "read_file", json!({}));
        let task = tokio::spawn(async move {
            gate.evaluate(ToolCallCheck::after(&call, "s1", json!("text"), false, 1))
                .await
        });
        assert!(wait_for(|| controller.has_pending()).await);

        assert_eq!(controller.abort(), Some(SuspensionKind::ToolCall));
        let result = task.await.expect("gate task should join");
        assert!(result.is_err());
    }
}
