pub mod autodetect;
pub mod error;
pub mod link;
pub mod port;
pub mod sim;
pub mod state;

pub use error::{CloseError, ConnectError, SendError};
pub use link::{LinkEvent, RobotLink};
pub use port::{MemoryOpener, Port, PortOpener, SerialOpener};
pub use state::{ConnectionState, LinkStats};

use serde::Deserialize;

pub const DEFAULT_BAUD: u32 = 9600;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkConfig {
    /// If true, probe candidate serial ports/bauds and pick the first one
    /// that yields a telemetry frame.
    #[serde(default)]
    pub autodetect: bool,

    /// When autodetect=false: fixed port config
    pub serial_dev: Option<String>,
    pub baud: Option<u32>,

    /// Autodetect candidates (paths). Example:
    /// ["/dev/ttyACM0","/dev/ttyUSB0"]
    pub candidate_devs: Option<Vec<String>>,

    /// Autodetect candidate baud rates.
    pub candidate_bauds: Option<Vec<u32>>,

    /// Telemetry wait per probe attempt
    pub probe_timeout_ms: Option<u64>,
}
