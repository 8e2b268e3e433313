/// Errors that can occur in the data layer.
///
/// `Configuration` is a startup failure and must halt the process.
/// `InvalidRequest` and `NotFound` are per-call and stay distinct up to the
/// outermost boundary. `Store` carries a collaborator failure unchanged.
#[derive(Debug)]
pub enum DataError {
    Configuration(String),
    InvalidRequest(String),
    NotFound(String),
    Store(Box<dyn std::error::Error + Send + Sync>),
}

impl DataError {
    /// Construct a `Store` variant from any error type.
    ///
    /// Used by store collaborators (e.g. `keel-data-sqlx`) to wrap
    /// driver-specific errors.
    pub fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DataError::Store(Box::new(err))
    }

    pub(crate) fn configuration(msg: impl Into<String>) -> Self {
        DataError::Configuration(msg.into())
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        DataError::InvalidRequest(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DataError::NotFound(_))
    }

    pub fn is_invalid_request(&self) -> bool {
        matches!(self, DataError::InvalidRequest(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, DataError::Configuration(_))
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            DataError::InvalidRequest(msg) => write!(f, "Invalid request: {msg}"),
            DataError::NotFound(msg) => write!(f, "Not found: {msg}"),
            DataError::Store(err) => write!(f, "Store failure: {err}"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Store(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<DataError> for keel_core::ApiError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::InvalidRequest(msg) => keel_core::ApiError::BadRequest(msg),
            DataError::NotFound(msg) => keel_core::ApiError::NotFound(msg),
            DataError::Configuration(msg) => keel_core::ApiError::Internal(msg),
            DataError::Store(e) => keel_core::ApiError::Internal(e.to_string()),
        }
    }
}
