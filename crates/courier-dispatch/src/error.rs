use courier_link::{CloseError, ConnectError, SendError};
use courier_nav::WaypointId;
use courier_proto::Coordinate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Please select a point within the designated area ({0} is outside)")]
    OutsideZone(Coordinate),

    #[error("Please connect to the robot first!")]
    NotConnected,

    #[error("Waypoint {0} is not waiting in the queue")]
    NotCancellable(WaypointId),

    #[error("Failed to connect to the robot: {0}")]
    Connect(#[from] ConnectError),

    #[error("Failed to disconnect from the robot: {0}")]
    Close(#[from] CloseError),

    #[error("Failed to send command to the robot: {0}")]
    Send(#[from] SendError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Precondition,
    Link,
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::OutsideZone(_) | DispatchError::NotCancellable(_) => ErrorKind::Validation,
            DispatchError::NotConnected => ErrorKind::Precondition,
            DispatchError::Connect(_) | DispatchError::Close(_) | DispatchError::Send(_) => ErrorKind::Link,
        }
    }
}
