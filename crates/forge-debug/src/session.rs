use crate::{
    BreakpointRegistry, DebugConfig, DebugEventBus, IterationCheckpoint, ResumeController,
    SettingsSource, SharedSettings, TokenUsageTracker, ToolCallGate,
};
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

pub(crate) type CheckpointStack = Arc<Mutex<Vec<Arc<IterationCheckpoint>>>>;

/// Session-scoped debug context.
///
/// Outlives individual loop invocations: the registry, token tracker, event bus,
/// and gate are shared by every loop started through [`DebugSession::begin_loop`].
pub struct DebugSession {
    id: String,
    events: DebugEventBus,
    registry: Arc<BreakpointRegistry>,
    usage: Arc<TokenUsageTracker>,
    gate: Arc<ToolCallGate>,
    checkpoints: CheckpointStack,
}

impl DebugSession {
    pub fn new() -> Self {
        Self::with_settings(Arc::new(SharedSettings::default()))
    }

    pub fn from_config(config: &DebugConfig) -> Self {
        Self::with_settings(Arc::new(SharedSettings::new(config.tool_calls)))
    }

    pub fn with_settings(settings: Arc<dyn SettingsSource>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), settings)
    }

    pub fn with_id(id: impl Into<String>, settings: Arc<dyn SettingsSource>) -> Self {
        let events = DebugEventBus::new();
        let registry = Arc::new(BreakpointRegistry::new(events.clone()));
        let gate = Arc::new(ToolCallGate::new(
            registry.clone(),
            settings,
            events.clone(),
        ));
        Self {
            id: id.into(),
            events,
            registry,
            usage: Arc::new(TokenUsageTracker::new()),
            gate,
            checkpoints: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn events(&self) -> &DebugEventBus {
        &self.events
    }

    pub fn registry(&self) -> &Arc<BreakpointRegistry> {
        &self.registry
    }

    pub fn usage(&self) -> &Arc<TokenUsageTracker> {
        &self.usage
    }

    pub fn gate(&self) -> &Arc<ToolCallGate> {
        &self.gate
    }

    pub fn controller(&self) -> ResumeController {
        ResumeController::new(self.checkpoints.clone(), self.gate.clone())
    }

    /// Start of a new conversation: token counts go back to zero and step mode is cleared.
    /// Breakpoints are kept.
    pub fn reset(&self) {
        self.usage.reset();
        self.registry.set_step_mode(false);
        debug!(session_id = %self.id, "debug session reset");
    }

    /// Creates the checkpoint for one loop invocation and makes it the active one.
    pub fn begin_loop(&self) -> CheckpointGuard {
        let checkpoint = Arc::new(IterationCheckpoint::new(
            self.id.clone(),
            self.registry.clone(),
            self.usage.clone(),
            self.events.clone(),
        ));
        self.checkpoints
            .lock()
            .expect("checkpoint stack mutex poisoned")
            .push(checkpoint.clone());
        CheckpointGuard {
            checkpoint,
            stack: self.checkpoints.clone(),
            gate: self.gate.clone(),
        }
    }

    /// The innermost live checkpoint, if any loop is running.
    pub fn active_checkpoint(&self) -> Option<Arc<IterationCheckpoint>> {
        active_checkpoint(&self.checkpoints)
    }

    /// Ends the session. Every pending or queued suspension is released with
    /// `Continue`, and neither the gate nor any live checkpoint suspends again.
    pub fn close(&self) {
        self.gate.close();
        let live: Vec<Arc<IterationCheckpoint>> = self
            .checkpoints
            .lock()
            .expect("checkpoint stack mutex poisoned")
            .clone();
        for checkpoint in live {
            checkpoint.close();
        }
        debug!(session_id = %self.id, "debug session closed");
    }
}

impl Default for DebugSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DebugSession {
    fn drop(&mut self) {
        self.close();
    }
}

pub(crate) fn active_checkpoint(stack: &CheckpointStack) -> Option<Arc<IterationCheckpoint>> {
    stack
        .lock()
        .expect("checkpoint stack mutex poisoned")
        .last()
        .cloned()
}

/// Owns one loop invocation's checkpoint. Dropping it closes the checkpoint and
/// deactivates it on every exit path. When the last live loop goes away, a
/// pending tool-call suspension is released too.
pub struct CheckpointGuard {
    checkpoint: Arc<IterationCheckpoint>,
    stack: CheckpointStack,
    gate: Arc<ToolCallGate>,
}

impl CheckpointGuard {
    pub fn checkpoint(&self) -> &Arc<IterationCheckpoint> {
        &self.checkpoint
    }
}

impl std::ops::Deref for CheckpointGuard {
    type Target = IterationCheckpoint;

    fn deref(&self) -> &Self::Target {
        &self.checkpoint
    }
}

impl Drop for CheckpointGuard {
    fn drop(&mut self) {
        self.checkpoint.close();
        let last_loop = match self.stack.lock() {
            Ok(mut stack) => {
                if let Some(index) = stack
                    .iter()
                    .rposition(|entry| Arc::ptr_eq(entry, &self.checkpoint))
                {
                    stack.remove(index);
                }
                stack.is_empty()
            }
            Err(_) => true,
        };
        if last_loop {
            self.gate.cancel_pending();
        }
        debug!(session_id = %self.checkpoint.session_id(), "loop checkpoint released");
    }
}
