use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvError {
    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("action {action} is outside the action space Discrete({n})")]
    InvalidAction { action: usize, n: usize },

    #[error("cannot step the environment before reset")]
    NeedsReset,

    #[error("environment is closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let invalid = EnvError::InvalidAction { action: 3, n: 2 };
        assert_eq!(
            invalid.to_string(),
            "action 3 is outside the action space Discrete(2)"
        );
        assert_eq!(
            EnvError::UnknownEnvironment("Pong-v5".into()).to_string(),
            "unknown environment: Pong-v5"
        );
        assert_eq!(EnvError::Closed.to_string(), "environment is closed");
    }
}
