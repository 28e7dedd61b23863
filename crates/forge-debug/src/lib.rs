//! Debug control for the Forge agent loop.
//!
//! Breakpoints, step mode, and tool-call gating for a tool-calling loop. The loop
//! awaits an [`IterationCheckpoint`] before every round and a [`ToolCallGate`]
//! around every tool call; an operator inspects hit notifications on the
//! [`DebugEventBus`] and resolves suspensions through the [`ResumeController`].

pub mod agent_loop;
pub mod breakpoint;
pub mod checkpoint;
pub mod config;
pub mod controller;
pub mod errors;
pub mod events;
pub mod gate;
pub mod registry;
pub mod round;
pub mod session;
mod suspension;
pub mod tools;
pub mod turn;
pub mod usage;

pub use agent_loop::*;
pub use breakpoint::*;
pub use checkpoint::*;
pub use config::*;
pub use controller::*;
pub use errors::*;
pub use events::*;
pub use gate::*;
pub use registry::*;
pub use round::*;
pub use session::*;
pub use tools::*;
pub use turn::*;
pub use usage::*;
