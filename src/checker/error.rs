use thiserror::Error;

/// Non-success transport or status from a remote resource
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Resource not found: {url}")]
    NotFound { url: String },

    #[error("Rate limited: retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },
}

impl FetchError {
    /// True when the remote side reports the resource or service as unavailable
    pub fn is_unavailable(&self) -> bool {
        match self {
            FetchError::NotFound { .. } => true,
            FetchError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Failure of a single dependency check
#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported access method: {0}")]
    UnsupportedAccessMethod(String),
}

impl From<reqwest::Error> for CheckError {
    fn from(e: reqwest::Error) -> Self {
        CheckError::Fetch(FetchError::Network(e))
    }
}

/// Contract clause violated by a candidate checker plugin
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginViolation {
    #[error("metadata field `{0}` is required")]
    MissingField(&'static str),

    #[error("metadata version `{0}` is not a valid semantic version")]
    InvalidVersion(String),

    #[error("access method `{0}` must match ^[a-z][a-z0-9_-]*$")]
    InvalidAccessMethod(String),

    #[error("access method `{declared}` in metadata does not match checker entry point `{actual}`")]
    AccessMethodMismatch { declared: String, actual: String },

    #[error("initialization hook failed: {0}")]
    Initialization(String),
}

/// Configuration-time registry and loader failures
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Checker already registered for access method: {0}")]
    DuplicateRegistration(String),

    #[error("Invalid plugin `{plugin}`: {violation}")]
    InvalidPlugin {
        plugin: String,
        violation: PluginViolation,
    },

    #[error("Registry lock poisoned")]
    LockPoisoned,
}
