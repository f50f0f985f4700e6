//! Inbound commands: the entry points a front end or the CLI calls.
//!
//! Every command takes the `Caller` resolved by the authentication layer.
//! Anonymous callers are rejected before any work is done.

pub mod generate;
pub mod history;

use thiserror::Error;

use crate::agent_core::errors::EngineError;

/// Who is calling, as established by the external authentication layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Authenticated { owner_id: String },
    Anonymous,
}

impl Caller {
    pub fn authenticated(owner_id: impl Into<String>) -> Self {
        Caller::Authenticated {
            owner_id: owner_id.into(),
        }
    }

    /// The owner id, or `Unauthenticated`.
    pub fn require_owner(&self) -> Result<&str, CommandError> {
        match self {
            Caller::Authenticated { owner_id } if !owner_id.trim().is_empty() => Ok(owner_id),
            _ => Err(CommandError::Unauthenticated),
        }
    }
}

/// Errors surfaced by commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("authentication required")]
    Unauthenticated,

    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The artifact store mutex was poisoned.
    #[error("lock error: {reason}")]
    Lock { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_owner() {
        assert_eq!(Caller::authenticated("user-1").require_owner().unwrap(), "user-1");
        assert!(matches!(
            Caller::Anonymous.require_owner(),
            Err(CommandError::Unauthenticated)
        ));
        assert!(Caller::authenticated("  ").require_owner().is_err());
    }

    #[test]
    fn test_engine_error_is_transparent() {
        let err: CommandError = EngineError::Configuration {
            reason: "topic is empty".into(),
        }
        .into();
        assert_eq!(err.to_string(), "configuration error: topic is empty");
    }
}
