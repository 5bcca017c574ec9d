use crate::model::ExecutorId;

pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Errors raised by the scheduler decision core.
///
/// `ResourceShortfall` is intentionally not a variant here: per the matcher
/// contract (`resource::has_resources`) a shortfall is reported as plain
/// strings and only ever logged, never propagated as an error.
#[derive(thiserror::Error, Debug)]
pub enum SchedulerError {
    #[error("host {0} is not resolvable")]
    HostUnresolvable(String),

    #[error("persisted state for {store} is corrupt")]
    StateCorrupt {
        store: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("unknown port name {0}")]
    UnknownPort(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("job status for unknown executor {0}")]
    UnknownExecutor(ExecutorId),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SchedulerError {
    pub fn state_corrupt(store: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::StateCorrupt {
            store,
            source: source.into(),
        }
    }
}
