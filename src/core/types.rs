use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorStatus {
    #[default]
    Submitted,
    Ready,
    Error,
}

/// Execution lifecycle. `Complete` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    #[default]
    Submitted,
    Running,
    Complete,
    Error,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// Worker lifecycle: `Requested -> Ready <-> Busy -> Error | Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerStatus {
    #[default]
    Requested,
    Ready,
    Busy,
    Error,
    Stopped,
}

impl WorkerStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Error | Self::Stopped)
    }

    pub fn can_transition_to(self, next: WorkerStatus) -> bool {
        use WorkerStatus::*;
        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (_, Error | Stopped) => true,
            (Requested, Ready) => true,
            (Ready, Busy) | (Busy, Ready) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionLevel {
    Read,
    Execute,
    Update,
}

macro_rules! impl_status_display {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    match serde_json::to_value(self) {
                        Ok(serde_json::Value::String(label)) => write!(f, "{label}"),
                        _ => write!(f, "{self:?}"),
                    }
                }
            }
        )*
    };
}

impl_status_display!(ActorStatus, ExecutionStatus, WorkerStatus, PermissionLevel);
