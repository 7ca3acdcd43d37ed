//! AT Command Protocol
//!
//! Implements the line-oriented AT command protocol spoken by the modem.
//!
//! Outbound commands are ASCII lines terminated by a carriage return. Inbound
//! traffic is split into lines by a background collector and handed to the
//! transaction engine, which pairs each command with its completion marker.

pub mod classify;
pub mod codec;
pub mod command_builder;
pub mod collector;
pub mod commands;
pub mod engine;
mod error;
pub mod payload;
pub mod serial;
pub mod transport;

pub use classify::{LineClass, LineClassifier, NotificationFilter};
pub use codec::ModemLineCodec;
pub use collector::ReceiveCollector;
pub use command_builder::{encode, AtCommand, CommandArgs};
pub use engine::{EngineSettings, Outcome, TransactionEngine};
pub use error::ModemError;
pub use serial::{list_ports, open_port, PortInfo, UsbId};
pub use transport::{CommandWriter, LineReader, SerialTransport, TransportConfig};

use std::time::Duration;

/// Default baud rate for the modem UART
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Default time budget for a single transaction
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Inactivity timeout used by the collector for each line read
pub const LINE_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Literal marker the modem uses to report a failed command
pub const ERROR_MARKER: &str = "ERROR";

/// Success marker terminating most command responses
pub const OK_MARKER: &str = "OK";

/// Prompt emitted when the modem is ready to accept a raw payload
pub const PAYLOAD_PROMPT: &str = ">";

/// Terminator appended to every command line
pub const COMMAND_TERMINATOR: char = '\r';

/// Escape sequence that leaves online (data) mode; sent without a terminator
pub const ESCAPE_SEQUENCE: &str = "+++";

/// Unsolicited reports that are dropped while a transaction is waiting
pub const DEFAULT_NOTIFICATION_PREFIXES: &[&str] = &["+CEREG"];

/// Longest line the codec buffers before handing the bytes over anyway
pub const MAX_LINE_LENGTH: usize = 8192;
