use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrataError {
    #[error("unknown account name: {0}")]
    UnknownAccount(String),

    #[error("unknown organizational unit: {0}")]
    UnknownOrganizationalUnit(String),

    #[error("duplicate account name: {0}")]
    DuplicateAccount(String),

    #[error("duplicate account id: {0}")]
    DuplicateAccountId(String),

    #[error("stages '{first}' and '{second}' share run order {run_order}")]
    DuplicateStageOrder {
        first: String,
        second: String,
        run_order: u32,
    },

    #[error("pipeline has no stages")]
    EmptyPipeline,

    #[error("stage '{0}' has no modules")]
    EmptyStage(String),

    #[error("unknown module kind: {0}")]
    UnknownModuleKind(String),

    #[error("failed to assume role in account {account}: {reason}")]
    Credential { account: String, reason: String },

    #[error("throttled by remote service: {0}")]
    Throttled(String),

    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetryExhausted { attempts: u32, last: String },

    #[error("action failed: {0}")]
    Action(String),

    #[error("stage '{stage}' aborted by module '{module}': {reason}")]
    StageFatal {
        stage: String,
        module: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl StrataError {
    /// Whether a retry policy may re-attempt the operation that produced
    /// this error. Only remote throttling qualifies; configuration and
    /// credential failures are never transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StrataError::Throttled(_))
    }
}

pub type Result<T> = std::result::Result<T, StrataError>;
