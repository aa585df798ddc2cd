pub mod coordinator;
pub mod error;
pub mod frontend;
pub mod session;
pub mod status;

#[cfg(test)]
mod testing;

pub use coordinator::{Coordinator, Trip};
pub use error::{DispatchError, ErrorKind};
pub use frontend::{MapRenderer, MarkerHandle, StatusDisplay};
pub use session::{run_session, OperatorIntent, ParseIntentError};
pub use status::{RobotMode, RobotStatus};
