use std::io;
use thiserror::Error;

use crate::state::ConnectionState;

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("link is already {0}")]
    Busy(ConnectionState),

    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum CloseError {
    #[error("link is not connected")]
    NotConnected,

    #[error("failed to close {port}: {source}")]
    Shutdown {
        port: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("link is not connected")]
    NotConnected,

    #[error("failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("write to robot failed: {0}")]
    Write(#[from] io::Error),
}
