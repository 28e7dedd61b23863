use async_trait::async_trait;
use forge_debug::{DebugEvent, ResumeAction};
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::sync::Mutex;
use tracing::warn;

/// Decides how to resume a breakpoint hit.
#[async_trait]
pub trait Operator: Send + Sync {
    async fn decide(&self, hit: &DebugEvent) -> ResumeAction;
}

pub struct AutoContinueOperator;

#[async_trait]
impl Operator for AutoContinueOperator {
    async fn decide(&self, _hit: &DebugEvent) -> ResumeAction {
        ResumeAction::Continue
    }
}

/// Replays queued actions, then continues.
#[derive(Default)]
pub struct QueueOperator {
    actions: Mutex<VecDeque<ResumeAction>>,
}

impl QueueOperator {
    pub fn with_actions(actions: impl IntoIterator<Item = ResumeAction>) -> Self {
        Self {
            actions: Mutex::new(actions.into_iter().collect()),
        }
    }
}

#[async_trait]
impl Operator for QueueOperator {
    async fn decide(&self, _hit: &DebugEvent) -> ResumeAction {
        self.actions
            .lock()
            .expect("queue operator mutex poisoned")
            .pop_front()
            .unwrap_or(ResumeAction::Continue)
    }
}

pub struct ConsoleOperator;

#[async_trait]
impl Operator for ConsoleOperator {
    async fn decide(&self, _hit: &DebugEvent) -> ResumeAction {
        match tokio::task::spawn_blocking(ask_console).await {
            Ok(action) => action,
            Err(_) => ResumeAction::Continue,
        }
    }
}

fn ask_console() -> ResumeAction {
    let stdin = std::io::stdin();
    loop {
        eprint!("[c]ontinue [s]tep [a]bort s[k]ip > ");
        let _ = std::io::stderr().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => return ResumeAction::Continue,
            Ok(_) => {}
        }
        match ResumeAction::parse(line.trim()) {
            Some(action) => return action,
            None => warn!(input = %line.trim(), "unrecognized resume action"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "current_thread")]
    async fn queue_operator_drains_then_continues() {
        let operator = QueueOperator::with_actions([ResumeAction::Step, ResumeAction::Abort]);
        let hit = DebugEvent::BreakpointsChanged;
        assert_eq!(operator.decide(&hit).await, ResumeAction::Step);
        assert_eq!(operator.decide(&hit).await, ResumeAction::Abort);
        assert_eq!(operator.decide(&hit).await, ResumeAction::Continue);
    }
}
