use crate::domain::value_objects::ActionKind;
use crate::shared::error::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Failed to build request: {0}")]
    Request(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Remote rejected {kind} with status {status}: {body}")]
    Status {
        kind: ActionKind,
        status: u16,
        body: String,
    },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for DispatchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DispatchError::Decode(err.to_string())
        } else if err.is_builder() {
            DispatchError::Request(err.to_string())
        } else {
            DispatchError::Transport(err.to_string())
        }
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        AppError::Dispatch(err.to_string())
    }
}
