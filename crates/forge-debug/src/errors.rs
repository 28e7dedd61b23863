use crate::SuspensionKind;
use thiserror::Error;

/// Raised at the awaiting call site when the operator resumes with `Abort`.
///
/// Kept apart from ordinary failures so the enclosing loop can terminate the
/// invocation instead of retrying.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("execution aborted by operator at {target} breakpoint")]
pub struct Cancelled {
    pub target: SuspensionKind,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed reading config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("tool execution failed: {0}")]
    Execution(String),
    #[error("tool validation failed: {0}")]
    Validation(String),
}

/// Top-level error type for the debuggable loop.
#[derive(Debug, Error)]
pub enum AgentLoopError {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error("model request failed: {0}")]
    Model(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl AgentLoopError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_converts_into_loop_error_and_stays_distinguishable() {
        fn propagate() -> Result<(), AgentLoopError> {
            Err(Cancelled {
                target: SuspensionKind::ToolCall,
            })?;
            Ok(())
        }

        let err = propagate().expect_err("cancellation should propagate");
        assert!(err.is_cancelled());
        assert_eq!(
            err.to_string(),
            "execution aborted by operator at tool_call breakpoint"
        );
        assert!(!AgentLoopError::Model("boom".to_string()).is_cancelled());
    }
}
