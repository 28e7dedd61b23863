use crate::ResumeAction;
use std::sync::Mutex;
use tokio::sync::oneshot;
use tracing::warn;

/// Single pending resume slot. Armed before a hit is published, resolved from
/// outside by exactly one `resolve` call.
#[derive(Default)]
pub(crate) struct Suspension {
    pending: Mutex<Option<oneshot::Sender<ResumeAction>>>,
}

pub(crate) struct PendingResume {
    receiver: oneshot::Receiver<ResumeAction>,
}

impl PendingResume {
    /// A dropped sender means the owner went away; treat it as `Continue` so the
    /// waiting caller can finish its own teardown.
    pub(crate) async fn wait(self) -> ResumeAction {
        self.receiver.await.unwrap_or(ResumeAction::Continue)
    }
}

impl Suspension {
    pub(crate) fn arm(&self, owner: &str) -> PendingResume {
        let (tx, rx) = oneshot::channel();
        let replaced = self.lock().replace(tx);
        if replaced.is_some() {
            warn!(
                owner,
                "suspension requested while another is pending; releasing the earlier waiter"
            );
        }
        PendingResume { receiver: rx }
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.lock().as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Returns `false` when nothing was pending.
    pub(crate) fn resolve(&self, action: ResumeAction) -> bool {
        let Some(sender) = self.lock().take() else {
            return false;
        };
        sender.send(action).is_ok()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<oneshot::Sender<ResumeAction>>> {
        self.pending.lock().expect("suspension mutex poisoned")
    }
}
