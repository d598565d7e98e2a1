use thiserror::Error;

/// Errors raised while constructing or driving a [`RoutinePool`](crate::RoutinePool).
///
/// Registration through the `register*` family never surfaces these; it
/// reports a plain `false` instead. The `start*` family returns them.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("worker count must be larger than zero")]
    InvalidWorkerCount,

    #[error("default wait interval must be larger than zero")]
    InvalidWaitInterval,

    #[error("minimum wait interval must be larger than zero")]
    InvalidMinWait,

    #[error("routine pool is shut down")]
    ShutDown,

    #[error("invalid worker range {min}..={max} for a pool of {workers} workers")]
    InvalidRange {
        min: usize,
        max: usize,
        workers: usize,
    },

    #[error("invalid worker selector '{0}'")]
    InvalidSelector(String),

    #[error("invalid duration '{0}'")]
    InvalidDuration(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("{workers} worker thread(s) panicked")]
    WorkerPanicked { workers: usize },

    #[error("shutdown task failed: {0}")]
    ShutdownTask(#[from] tokio::task::JoinError),
}

/// Failure reported by a single routine step.
///
/// Any failure terminates only the routine that produced it.
#[derive(Error, Debug)]
pub enum RoutineError {
    #[error("routine failed: {0}")]
    Failed(String),

    #[error("routine panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl RoutineError {
    pub fn failed(message: impl Into<String>) -> Self {
        RoutineError::Failed(message.into())
    }

    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        RoutineError::Panicked(panic_message(payload.as_ref()))
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_are_rendered() {
        let err = RoutineError::from_panic(Box::new("boom"));
        assert_eq!(err.to_string(), "routine panicked: boom");

        let err = RoutineError::from_panic(Box::new(String::from("owned")));
        assert_eq!(err.to_string(), "routine panicked: owned");

        let err = RoutineError::from_panic(Box::new(42_u32));
        assert_eq!(err.to_string(), "routine panicked: non-string panic payload");
    }

    #[test]
    fn range_error_names_bounds() {
        let err = PoolError::InvalidRange { min: 2, max: 5, workers: 4 };
        assert_eq!(err.to_string(), "invalid worker range 2..=5 for a pool of 4 workers");
    }
}
