//! TCP echo client over the modem's socket commands
//!
//! The socket runs in command mode: data goes out with `AT+SQNSSENDEXT`
//! and comes back with `AT+SQNSRECV` once `+SQNSRING` reports it.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::protocol::commands::{
    SocketConfig, SocketDial, SocketReceive, SocketSendExt, SocketShutdown, SocketStatus,
};
use crate::protocol::payload::{parse_socket_states, strip_ok, SocketState};
use crate::protocol::{encode, ModemError, TransactionEngine, OK_MARKER};

/// Event announcing data on a socket
pub const SOCKET_RING: &str = "+SQNSRING";

/// Socket client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketSettings {
    /// Connection id (1..=6)
    pub conn_id: u8,
    /// Time budget for each socket transaction in milliseconds
    pub timeout_ms: u64,
}

impl Default for SocketSettings {
    fn default() -> Self {
        Self {
            conn_id: 1,
            timeout_ms: 10_000,
        }
    }
}

/// Talks to one remote server through one modem socket
pub struct SocketDriver<'e> {
    engine: &'e mut TransactionEngine,
    settings: SocketSettings,
    server_ip: String,
    server_port: u16,
}

impl<'e> SocketDriver<'e> {
    /// Driver for the echo server at `server_ip:server_port`
    pub fn new(
        engine: &'e mut TransactionEngine,
        settings: SocketSettings,
        server_ip: impl Into<String>,
        server_port: u16,
    ) -> Self {
        Self {
            engine,
            settings,
            server_ip: server_ip.into(),
            server_port,
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.settings.timeout_ms)
    }

    /// State of every modem socket
    pub async fn status(&mut self) -> Result<Vec<(u8, SocketState)>, ModemError> {
        let timeout = self.timeout();
        let command = self.engine.send_command(&SocketStatus).await?;
        let report = self
            .engine
            .wait_for_lines(OK_MARKER, timeout)
            .await?
            .into_result(&command)?;
        parse_socket_states(&report)
    }

    /// State of this driver's socket
    pub async fn state(&mut self) -> Result<SocketState, ModemError> {
        let conn_id = self.settings.conn_id;
        self.status()
            .await?
            .into_iter()
            .find(|(id, _)| *id == conn_id)
            .map(|(_, state)| state)
            .ok_or_else(|| {
                ModemError::MalformedPayload(format!("no status for socket {}", conn_id))
            })
    }

    /// Close the socket if it is in use, configure it and dial the server
    pub async fn open(&mut self) -> Result<(), ModemError> {
        let timeout = self.timeout();
        let state = self.state().await?;
        if state != SocketState::Closed {
            info!("Socket {} is {:?}, closing it first", self.settings.conn_id, state);
            if let Err(e) = self.close().await {
                if e.is_fatal() {
                    return Err(e);
                }
                debug!("SocketDriver: close before open failed: {}", e);
            }
        }

        self.engine
            .transact(&SocketConfig::new(self.settings.conn_id), timeout)
            .await?;

        let dial = SocketDial::tcp(
            self.settings.conn_id,
            self.server_ip.as_str(),
            self.server_port,
        );
        self.engine.transact(&dial, timeout).await?;
        info!("Connected to {}:{}", self.server_ip, self.server_port);
        Ok(())
    }

    /// Send `message` and return what the server sent back
    pub async fn echo(&mut self, message: &str) -> Result<String, ModemError> {
        let timeout = self.timeout();
        let conn_id = self.settings.conn_id;

        let send = SocketSendExt {
            conn_id,
            length: message.len(),
        };
        self.engine.transact(&send, timeout).await?;
        self.engine
            .send_payload(message, SOCKET_RING, timeout)
            .await?;

        // Reply comes as "+SQNSRECV: <id>,<len>", the data lines, then OK
        let receive = SocketReceive {
            conn_id,
            max_bytes: message.len(),
        };
        self.engine.transact(&receive, timeout).await?;
        let data = self
            .engine
            .wait_for_lines(OK_MARKER, timeout)
            .await?
            .into_result(&encode(&receive))?;
        Ok(strip_ok(&data)?.to_string())
    }

    /// Shut the socket down
    pub async fn close(&mut self) -> Result<(), ModemError> {
        let timeout = self.timeout();
        let command = SocketShutdown {
            conn_id: self.settings.conn_id,
        };
        self.engine.transact(&command, timeout).await?;
        Ok(())
    }
}
