use thiserror::Error;

/// Failures raised by a [`KvStore`](crate::storage::KvStore) implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Key '{0}' not found")]
    KeyNotFound(String),

    #[error("Subkey '{subkey}' not found under key '{key}'")]
    SubkeyNotFound { key: String, subkey: String },

    #[error("Value at key '{0}' is not a structured value")]
    NotStructured(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound(_) | Self::SubkeyNotFound { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Domain errors returned by the registries.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Worker not found: {0}")]
    WorkerNotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RegistryError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::WorkerNotFound(_))
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Store(err.into())
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Translates store-level "not found" conditions at the registry boundary.
pub(crate) trait StoreResultExt<T> {
    fn or_not_found(self, kind: &'static str, id: &str) -> Result<T>;
    fn or_worker_not_found(self, ch_name: &str) -> Result<T>;
}

impl<T> StoreResultExt<T> for StoreResult<T> {
    fn or_not_found(self, kind: &'static str, id: &str) -> Result<T> {
        self.map_err(|err| {
            if err.is_not_found() {
                RegistryError::not_found(kind, id)
            } else {
                RegistryError::Store(err)
            }
        })
    }

    fn or_worker_not_found(self, ch_name: &str) -> Result<T> {
        self.map_err(|err| {
            if err.is_not_found() {
                RegistryError::WorkerNotFound(ch_name.to_string())
            } else {
                RegistryError::Store(err)
            }
        })
    }
}
