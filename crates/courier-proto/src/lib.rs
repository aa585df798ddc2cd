pub mod codec;
pub mod coordinate;
pub mod telemetry;

pub use codec::{encode_frame, DecodeError, FrameDecoder, MAX_FRAME_LEN};
pub use coordinate::Coordinate;
pub use telemetry::{MoveCommand, TelemetryFrame};
