use reqwest::StatusCode;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by topic provisioning, schema registration and connector registration.
///
/// Nothing in this crate retries: every variant reaches the immediate caller, which decides
/// whether startup should be aborted.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to create topic '{topic}': {reason}")]
    CreationFailed { topic: String, reason: String },

    #[error("connector '{name}' registration rejected [{status}]: {body}")]
    ConnectorRegistrationFailed {
        name: String,
        status: StatusCode,
        body: String,
    },

    #[error("schema registry rejected subject '{subject}' [{status}]: {body}")]
    SchemaRegistrationFailed {
        subject: String,
        status: StatusCode,
        body: String,
    },

    #[error("transport error talking to {target}: {source}")]
    Transport {
        target: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("failed to deliver record to topic '{topic}': {reason}")]
    DeliveryFailed { topic: String, reason: String },

    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ProvisionError {
    pub(crate) fn transport<E>(target: &'static str, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Transport {
            target,
            source: source.into(),
        }
    }

    pub(crate) fn invalid<E: std::fmt::Display>(err: E) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

pub type ProvisionResult<T> = Result<T, ProvisionError>;
