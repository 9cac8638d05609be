use crate::forward::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("failed to write message {message_id}: {source}")]
    Store {
        message_id: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to provision container {container}: {source}")]
    Provision {
        container: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to settle message {message_id}: {source}")]
    Settlement {
        message_id: String,
        #[source]
        source: SettlementError,
    },
}

/// A complete or abandon call rejected by the messaging platform
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SettlementError(pub String);

pub type Result<T> = std::result::Result<T, ForwardError>;
