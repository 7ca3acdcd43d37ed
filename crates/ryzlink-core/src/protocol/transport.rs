//! Link transport
//!
//! Owns the byte stream to the modem and splits it into a read half (used by
//! the receive collector) and a write half (used by the transaction engine).
//! The stream is either the local UART or a serial device bridged over TCP
//! (`tcp://host:port`, e.g. ser2net), which is handy on a bench.

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::codec::FramedRead;
use tracing::{debug, trace};

use super::{open_port, ModemError, ModemLineCodec, DEFAULT_BAUD_RATE};

/// Scheme prefix selecting a TCP-bridged serial device
pub const TCP_SCHEME: &str = "tcp://";

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Transport configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Serial device ("/dev/ttyACM0", "COM3") or "tcp://host:port"
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Enable RTS/CTS hardware flow control
    pub flow_control: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            flow_control: false,
        }
    }
}

impl TransportConfig {
    /// Configuration for a serial device at the default baud rate
    pub fn new(port: impl Into<String>, flow_control: bool) -> Self {
        Self {
            port: port.into(),
            flow_control,
            ..Self::default()
        }
    }
}

/// Opens the configured link and hands out its two halves
pub struct SerialTransport;

impl SerialTransport {
    /// Open the device named in `config`
    pub async fn open(config: &TransportConfig) -> Result<(LineReader, CommandWriter), ModemError> {
        if config.port.is_empty() {
            return Err(ModemError::PortNotFound("no port configured".to_string()));
        }

        match config.port.strip_prefix(TCP_SCHEME) {
            Some(addr) => {
                let stream = TcpStream::connect(addr)
                    .await
                    .map_err(|e| ModemError::ConnectionError(format!("{}: {}", config.port, e)))?;
                stream.set_nodelay(true)?;
                debug!("SerialTransport: connected to {}", addr);
                Ok(Self::split(stream))
            }
            None => Ok(Self::split(open_port(config)?)),
        }
    }

    /// Split any full-duplex stream into a line reader and a command writer
    pub fn split<S>(stream: S) -> (LineReader, CommandWriter)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        (
            LineReader::new(Box::new(read_half)),
            CommandWriter::new(Box::new(write_half)),
        )
    }
}

/// Read half of the link, framed into lines
pub struct LineReader {
    frames: FramedRead<BoxedReader, ModemLineCodec>,
}

impl LineReader {
    /// Wrap a raw reader
    pub fn new(reader: BoxedReader) -> Self {
        Self {
            frames: FramedRead::new(reader, ModemLineCodec::new()),
        }
    }

    /// Wait for one line.
    ///
    /// Returns the line including its terminator as soon as `\n` arrives.
    /// `timeout` measures inactivity: while bytes keep arriving the wait is
    /// re-armed, and only after a full window without new bytes are the
    /// unterminated bytes returned as they are (empty if the link was idle).
    /// A closed or failing link is a `ConnectionError`.
    pub async fn read_line(&mut self, timeout: Duration) -> Result<Vec<u8>, ModemError> {
        loop {
            let buffered = self.frames.read_buffer().len();
            match tokio::time::timeout(timeout, self.frames.next()).await {
                Ok(Some(Ok(line))) => return Ok(line.to_vec()),
                Ok(Some(Err(e))) => {
                    return Err(ModemError::ConnectionError(format!("read failed: {}", e)))
                }
                Ok(None) => {
                    return Err(ModemError::ConnectionError(
                        "modem closed the link".to_string(),
                    ))
                }
                Err(_) if self.frames.read_buffer().len() > buffered => {
                    trace!("LineReader: line still arriving, waiting again");
                }
                Err(_) => return Ok(self.frames.read_buffer_mut().split().to_vec()),
            }
        }
    }
}

/// Write half of the link
pub struct CommandWriter {
    inner: BoxedWriter,
    tx_bytes: u64,
}

impl CommandWriter {
    /// Wrap a raw writer
    pub fn new(inner: BoxedWriter) -> Self {
        Self { inner, tx_bytes: 0 }
    }

    /// Write all bytes and flush them to the device
    pub async fn write(&mut self, bytes: &[u8]) -> Result<(), ModemError> {
        self.inner
            .write_all(bytes)
            .await
            .map_err(|e| ModemError::ConnectionError(format!("write failed: {}", e)))?;
        self.inner
            .flush()
            .await
            .map_err(|e| ModemError::ConnectionError(format!("flush failed: {}", e)))?;
        self.tx_bytes = self.tx_bytes.saturating_add(bytes.len() as u64);
        Ok(())
    }

    /// Total bytes written since the link was opened
    pub fn tx_bytes(&self) -> u64 {
        self.tx_bytes
    }
}
