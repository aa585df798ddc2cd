//! Serial link to the robot: connection lifecycle, command writes and the
//! background telemetry reader.

use courier_proto::{encode_frame, Coordinate, DecodeError, FrameDecoder, MoveCommand, TelemetryFrame};
use std::io;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{CloseError, ConnectError, SendError};
use crate::port::{Port, PortOpener};
use crate::state::{ConnectionState, LinkStats};

#[derive(Debug)]
pub enum LinkEvent {
    Connected,
    Disconnected,
    Telemetry(TelemetryFrame),
    /// A frame failed to decode. The reader keeps going.
    DecodeError(DecodeError),
    /// The reader hit an I/O error and stopped. The link stays up until the
    /// owner closes it.
    LinkError(io::Error),
}

#[derive(Debug)]
enum Signal {
    Opened,
    Closed,
    Frame(TelemetryFrame),
    Malformed(DecodeError),
    ReadFailed(io::Error),
    EndOfStream,
}

#[derive(Debug)]
struct Envelope {
    session: u64,
    signal: Signal,
}

pub struct RobotLink {
    opener: Box<dyn PortOpener>,
    state: ConnectionState,
    // Bumped on every open and every disconnect; signals from older
    // sessions are dropped.
    session: u64,
    writer: Option<WriteHalf<Box<dyn Port>>>,
    reader: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<Envelope>,
    rx: mpsc::UnboundedReceiver<Envelope>,
    stats: LinkStats,
}

impl RobotLink {
    pub fn new(opener: impl PortOpener + 'static) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            opener: Box::new(opener),
            state: ConnectionState::Disconnected,
            session: 0,
            writer: None,
            reader: None,
            tx,
            rx,
            stats: LinkStats::default(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn port_name(&self) -> String {
        self.opener.describe()
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    /// Opens the port and starts the telemetry reader.
    pub fn open(&mut self) -> Result<(), ConnectError> {
        if self.state != ConnectionState::Disconnected {
            return Err(ConnectError::Busy(self.state));
        }
        let port_name = self.opener.describe();
        self.state = ConnectionState::Connecting;
        info!("link: connecting to {}", port_name);

        let port = match self.opener.open() {
            Ok(p) => p,
            Err(source) => {
                self.state = ConnectionState::Disconnected;
                warn!("link: open {} failed: {}", port_name, source);
                return Err(ConnectError::Open { port: port_name, source });
            }
        };

        let (rd, wr) = tokio::io::split(port);
        self.session += 1;
        self.reader = Some(tokio::spawn(read_loop(rd, self.session, self.tx.clone())));
        self.writer = Some(wr);
        self.stats = LinkStats { connected_at: Some(Instant::now()), ..LinkStats::default() };
        self.state = ConnectionState::Connected;
        info!("link: connected to {}", port_name);
        self.emit(Signal::Opened);
        Ok(())
    }

    /// Stops the reader and releases the port. The link ends up
    /// Disconnected even when the final shutdown reports an error.
    pub async fn close(&mut self) -> Result<(), CloseError> {
        if self.state != ConnectionState::Connected {
            return Err(CloseError::NotConnected);
        }
        self.state = ConnectionState::Closing;

        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        let result = match self.writer.take() {
            Some(mut w) => w.shutdown().await,
            None => Ok(()),
        };
        self.finish_disconnect();

        result.map_err(|source| {
            let port = self.opener.describe();
            warn!("link: close {} failed: {}", port, source);
            CloseError::Shutdown { port, source }
        })
    }

    /// Writes one command frame. A failed write is returned to the caller and
    /// does not change the connection state.
    pub async fn send_command(&mut self, target: Coordinate) -> Result<(), SendError> {
        if self.state != ConnectionState::Connected {
            return Err(SendError::NotConnected);
        }
        let writer = self.writer.as_mut().ok_or(SendError::NotConnected)?;
        let frame = encode_frame(&MoveCommand::from(target))?;

        writer.write_all(&frame).await?;
        writer.flush().await?;

        self.stats.commands_tx += 1;
        debug!("link: sent move to {}", target);
        Ok(())
    }

    /// Next event in arrival order. Pends while nothing is happening.
    pub async fn next_event(&mut self) -> LinkEvent {
        loop {
            let Some(env) = self.rx.recv().await else {
                return std::future::pending().await;
            };
            if env.session != self.session {
                debug!("link: dropping stale {:?} from session {}", env.signal, env.session);
                continue;
            }
            match env.signal {
                Signal::Opened => return LinkEvent::Connected,
                Signal::Closed => return LinkEvent::Disconnected,
                Signal::Frame(frame) => {
                    self.stats.frames_rx += 1;
                    self.stats.last_frame_at = Some(Instant::now());
                    return LinkEvent::Telemetry(frame);
                }
                Signal::Malformed(e) => {
                    self.stats.decode_errors += 1;
                    return LinkEvent::DecodeError(e);
                }
                Signal::ReadFailed(e) => {
                    self.reader = None;
                    return LinkEvent::LinkError(e);
                }
                Signal::EndOfStream => {
                    info!("link: robot closed the stream");
                    self.state = ConnectionState::Closing;
                    self.reader = None;
                    self.writer = None;
                    self.finish_disconnect();
                }
            }
        }
    }

    fn finish_disconnect(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.session += 1;
        self.stats.connected_at = None;
        info!("link: disconnected from {}", self.opener.describe());
        self.emit(Signal::Closed);
    }

    fn emit(&self, signal: Signal) {
        let _ = self.tx.send(Envelope { session: self.session, signal });
    }
}

impl Drop for RobotLink {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

/// Pulls chunks until end of stream or an I/O error. Owns the read half and
/// releases it on return.
async fn read_loop<R: AsyncRead + Unpin>(mut rd: R, session: u64, tx: mpsc::UnboundedSender<Envelope>) {
    let mut decoder = FrameDecoder::<TelemetryFrame>::default();
    let mut buf = vec![0u8; 1024];
    let send = |signal: Signal| tx.send(Envelope { session, signal }).is_ok();

    loop {
        let n = match rd.read(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                warn!("link: read failed: {}", e);
                send(Signal::ReadFailed(e));
                return;
            }
        };
        if n == 0 {
            if let Some(last) = decoder.finish() {
                send(classify(last));
            }
            send(Signal::EndOfStream);
            return;
        }
        for item in decoder.feed(&buf[..n]) {
            if !send(classify(item)) {
                return;
            }
        }
    }
}

fn classify(item: Result<TelemetryFrame, DecodeError>) -> Signal {
    match item {
        Ok(frame) => Signal::Frame(frame),
        Err(e) => {
            warn!("link: telemetry decode failed: {}", e);
            Signal::Malformed(e)
        }
    }
}
