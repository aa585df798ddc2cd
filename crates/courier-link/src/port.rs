use std::collections::VecDeque;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio_serial::SerialPortBuilderExt;

/// A bidirectional byte stream to the robot.
pub trait Port: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> Port for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// Opens the device behind a link. Called once per connect.
pub trait PortOpener: Send {
    fn describe(&self) -> String;
    fn open(&mut self) -> io::Result<Box<dyn Port>>;
}

#[derive(Debug, Clone)]
pub struct SerialOpener {
    pub dev: String,
    pub baud: u32,
}

impl SerialOpener {
    pub fn new(dev: impl Into<String>, baud: u32) -> Self {
        Self { dev: dev.into(), baud }
    }
}

impl PortOpener for SerialOpener {
    fn describe(&self) -> String {
        format!("{} @ {}", self.dev, self.baud)
    }

    fn open(&mut self) -> io::Result<Box<dyn Port>> {
        let port = tokio_serial::new(self.dev.as_str(), self.baud)
            .open_native_async()
            .map_err(io::Error::from)?;
        Ok(Box::new(port))
    }
}

/// In-process ports. Each `attach` hands back the robot end of a fresh pipe
/// whose host end is served by the next `open`.
#[derive(Debug)]
pub struct MemoryOpener {
    name: String,
    ports: VecDeque<DuplexStream>,
}

impl MemoryOpener {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ports: VecDeque::new() }
    }

    pub fn attach(&mut self) -> DuplexStream {
        let (host, robot) = tokio::io::duplex(4096);
        self.ports.push_back(host);
        robot
    }
}

impl PortOpener for MemoryOpener {
    fn describe(&self) -> String {
        format!("mem://{}", self.name)
    }

    fn open(&mut self) -> io::Result<Box<dyn Port>> {
        let port = self
            .ports
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no robot attached"))?;
        Ok(Box::new(port))
    }
}
