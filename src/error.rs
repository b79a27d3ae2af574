use rmcp::ErrorData as RpcError;

use thiserror::Error;
use tokio::io;

use crate::storage::StorageError;

pub type ServiceResult<T> = core::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    FromString(String),
    #[error("{0}")]
    IoError(#[from] io::Error),
    #[error("{0}")]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("{0}")]
    Storage(#[from] StorageError),
    #[error("{0}")]
    Prompt(#[from] dialoguer::Error),
}

impl From<StorageError> for RpcError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ParseFailure(_) => RpcError::invalid_params(err.to_string(), None),
            other => RpcError::internal_error(other.to_string(), None),
        }
    }
}
