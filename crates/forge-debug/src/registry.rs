use crate::{Breakpoint, BreakpointId, BreakpointKind, DebugEvent, DebugEventBus};
use std::sync::Mutex;
use tracing::debug;

#[derive(Default)]
struct RegistryState {
    breakpoints: Vec<Breakpoint>,
    step_mode: bool,
}

/// Session-scoped set of breakpoint definitions plus the step-mode flag.
///
/// Every mutation that changes observable state publishes
/// [`DebugEvent::BreakpointsChanged`]; no-op mutations publish nothing.
pub struct BreakpointRegistry {
    state: Mutex<RegistryState>,
    events: DebugEventBus,
}

impl BreakpointRegistry {
    pub fn new(events: DebugEventBus) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            events,
        }
    }

    pub fn add(&self, kind: BreakpointKind) -> Breakpoint {
        self.insert(Breakpoint::new(kind))
    }

    pub fn add_with_label(&self, kind: BreakpointKind, label: impl Into<String>) -> Breakpoint {
        self.insert(Breakpoint::with_label(kind, label))
    }

    pub fn remove(&self, id: &BreakpointId) -> bool {
        let removed = {
            let mut state = self.lock();
            let before = state.breakpoints.len();
            state.breakpoints.retain(|breakpoint| &breakpoint.id != id);
            state.breakpoints.len() != before
        };
        if removed {
            debug!(breakpoint_id = %id, "breakpoint removed");
            self.notify_changed();
        }
        removed
    }

    /// Clears every breakpoint and step mode.
    pub fn remove_all(&self) {
        let changed = {
            let mut state = self.lock();
            let changed = !state.breakpoints.is_empty() || state.step_mode;
            state.breakpoints.clear();
            state.step_mode = false;
            changed
        };
        if changed {
            debug!("all breakpoints removed");
            self.notify_changed();
        }
    }

    /// Returns `false` when no breakpoint has the given id.
    pub fn set_enabled(&self, id: &BreakpointId, enabled: bool) -> bool {
        let (found, changed) = {
            let mut state = self.lock();
            match state
                .breakpoints
                .iter_mut()
                .find(|breakpoint| &breakpoint.id == id)
            {
                Some(breakpoint) => {
                    let changed = breakpoint.enabled != enabled;
                    breakpoint.enabled = enabled;
                    (true, changed)
                }
                None => (false, false),
            }
        };
        if changed {
            debug!(breakpoint_id = %id, enabled, "breakpoint toggled");
            self.notify_changed();
        }
        found
    }

    pub fn set_step_mode(&self, enabled: bool) {
        let changed = {
            let mut state = self.lock();
            let changed = state.step_mode != enabled;
            state.step_mode = enabled;
            changed
        };
        if changed {
            debug!(step_mode = enabled, "step mode changed");
            self.notify_changed();
        }
    }

    pub fn toggle_step_mode(&self) -> bool {
        let enabled = !self.step_mode();
        self.set_step_mode(enabled);
        enabled
    }

    pub fn step_mode(&self) -> bool {
        self.lock().step_mode
    }

    pub fn breakpoints(&self) -> Vec<Breakpoint> {
        self.lock().breakpoints.clone()
    }

    pub fn get(&self, id: &BreakpointId) -> Option<Breakpoint> {
        self.lock()
            .breakpoints
            .iter()
            .find(|breakpoint| &breakpoint.id == id)
            .cloned()
    }

    pub fn is_empty(&self) -> bool {
        let state = self.lock();
        state.breakpoints.is_empty() && !state.step_mode
    }

    pub fn has_enabled(&self) -> bool {
        self.lock()
            .breakpoints
            .iter()
            .any(|breakpoint| breakpoint.enabled)
    }

    /// First enabled breakpoint, in registration order, accepted by `predicate`.
    pub fn first_enabled_match<F>(&self, mut predicate: F) -> Option<Breakpoint>
    where
        F: FnMut(&Breakpoint) -> bool,
    {
        self.lock()
            .breakpoints
            .iter()
            .filter(|breakpoint| breakpoint.enabled)
            .find(|breakpoint| predicate(breakpoint))
            .cloned()
    }

    fn insert(&self, breakpoint: Breakpoint) -> Breakpoint {
        self.lock().breakpoints.push(breakpoint.clone());
        debug!(
            breakpoint_id = %breakpoint.id,
            label = %breakpoint.label,
            "breakpoint added"
        );
        self.notify_changed();
        breakpoint
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        self.state
            .lock()
            .expect("breakpoint registry mutex poisoned")
    }

    fn notify_changed(&self) {
        self.events.publish(DebugEvent::BreakpointsChanged);
    }
}
