//! Dispatch error taxonomy. None of these escape to the HTTP caller as
//! errors; `CommandDispatcher::execute` folds them into a failure
//! `CommandResult` with a plain-text payload.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("module '{0}' is not in the allow-list")]
    UnknownModule(String),

    #[error("unsupported verb '{0}'")]
    UnsupportedVerb(String),

    #[error("lifecycle script timed out after {0} ms")]
    Timeout(u128),

    #[error("failed to run lifecycle script: {0}")]
    Launch(#[from] std::io::Error),
}

impl DispatchError {
    /// Payload shown to the caller. Unknown modules echo the rejected name,
    /// the timeout carries a stable diagnostic, everything else collapses to
    /// the fixed failure token. Internal paths and raw OS errors stay in the
    /// logs.
    pub fn failure_payload(&self) -> String {
        match self {
            Self::UnknownModule(name) => format!("failed {}", name),
            Self::UnsupportedVerb(_) | Self::Launch(_) => "failed".to_string(),
            Self::Timeout(ms) => format!("timed out after {} ms", ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_module_payload_echoes_name() {
        let err = DispatchError::UnknownModule("spectral".to_string());
        assert_eq!(err.failure_payload(), "failed spectral");
    }

    #[test]
    fn verb_and_launch_payloads_are_fixed() {
        let err = DispatchError::UnsupportedVerb("log".to_string());
        assert_eq!(err.failure_payload(), "failed");

        let err = DispatchError::Launch(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(err.failure_payload(), "failed");
    }

    #[test]
    fn timeout_payload_is_stable() {
        let err = DispatchError::Timeout(5000);
        assert_eq!(err.failure_payload(), "timed out after 5000 ms");
    }
}
