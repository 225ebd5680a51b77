use thiserror::Error;

/// Error type for graphcursor operations.
#[derive(Debug, Error)]
pub enum GraphCursorError {
    /// A cursor accessor was used outside the window between a true-returning
    /// `next()` and the following call. Indicates a caller bug; never retried.
    #[error("contract violation: {0}")]
    ContractViolation(String),
    /// An underlying storage cursor read failed. Propagated unchanged and
    /// fatal to the current operation.
    #[error("storage read failure: {0}")]
    StorageRead(String),
    /// The memory tracker rejected an allocation. Catchable by the caller so
    /// the enclosing query can abort cleanly; already-yielded results stay
    /// valid.
    #[error("resource limit exceeded: {0}")]
    ResourceLimit(String),
}

impl GraphCursorError {
    pub fn contract<T: Into<String>>(msg: T) -> Self {
        GraphCursorError::ContractViolation(msg.into())
    }

    pub fn storage<T: Into<String>>(msg: T) -> Self {
        GraphCursorError::StorageRead(msg.into())
    }

    pub fn resource_limit<T: Into<String>>(msg: T) -> Self {
        GraphCursorError::ResourceLimit(msg.into())
    }
}
