//! Transaction engine
//!
//! Pairs each outbound command with the lines the collector queues for it.
//! A wait computes one absolute deadline on entry and classifies every line
//! it dequeues:
//!
//! - a line containing the expected marker completes the wait
//! - an error line abandons it (the error line itself is not returned)
//! - notification lines are dropped and do not extend the deadline
//! - anything else is accumulated
//!
//! Lines consumed by a wait that times out are gone; nothing is replayed.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use super::{
    encode, AtCommand, CommandWriter, LineClass, LineClassifier, ModemError, NotificationFilter,
    COMMAND_TERMINATOR, DEFAULT_RESPONSE_TIMEOUT, ERROR_MARKER,
};

/// Result of waiting for a completion marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Accumulated lines followed by the matching line
    Matched(String),
    /// The modem reported an error; carries what was accumulated before it
    ProtocolError(String),
    /// Deadline passed without a match or an error
    TimedOut,
}

impl Outcome {
    /// Convert into a `Result`, naming `command` in the error
    pub fn into_result(self, command: &str) -> Result<String, ModemError> {
        match self {
            Outcome::Matched(response) => Ok(response),
            Outcome::ProtocolError(response) => Err(ModemError::ProtocolError {
                command: command.to_string(),
                response,
            }),
            Outcome::TimedOut => Err(ModemError::Timeout {
                command: command.to_string(),
            }),
        }
    }

    /// Whether the expected marker was seen
    pub fn is_matched(&self) -> bool {
        matches!(self, Outcome::Matched(_))
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Time budget for one transaction in milliseconds
    pub timeout_ms: u64,
    /// Substring marking a failed command; empty disables error detection
    pub error_marker: String,
    /// Unsolicited reports dropped while waiting
    pub notifications: NotificationFilter,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_RESPONSE_TIMEOUT.as_millis() as u64,
            error_marker: ERROR_MARKER.to_string(),
            notifications: NotificationFilter::default(),
        }
    }
}

impl EngineSettings {
    /// Transaction budget as a `Duration`
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Send/await core shared by the shell and every driver
pub struct TransactionEngine {
    writer: CommandWriter,
    lines: mpsc::UnboundedReceiver<String>,
    settings: EngineSettings,
    /// Metrics: completed waits by outcome
    matched: u64,
    failed: u64,
    timed_out: u64,
}

impl TransactionEngine {
    /// Create an engine writing to `writer` and consuming `lines`
    pub fn new(
        writer: CommandWriter,
        lines: mpsc::UnboundedReceiver<String>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            writer,
            lines,
            settings,
            matched: 0,
            failed: 0,
            timed_out: 0,
        }
    }

    /// Active settings
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Configured transaction budget
    pub fn default_timeout(&self) -> Duration {
        self.settings.response_timeout()
    }

    /// (matched, protocol errors, timeouts, bytes written)
    pub fn get_counters(&self) -> (u64, u64, u64, u64) {
        (
            self.matched,
            self.failed,
            self.timed_out,
            self.writer.tx_bytes(),
        )
    }

    /// Write one command, appending the carriage return when asked to
    pub async fn send(&mut self, command: &str, add_terminator: bool) -> Result<(), ModemError> {
        info!("--> Tx: {}", command);
        let mut line = String::with_capacity(command.len() + 1);
        line.push_str(command);
        if add_terminator {
            line.push(COMMAND_TERMINATOR);
        }
        self.writer.write(line.as_bytes()).await
    }

    /// Serialize and send a typed command; returns the line that was sent
    pub async fn send_command<C: AtCommand + ?Sized>(
        &mut self,
        command: &C,
    ) -> Result<String, ModemError> {
        let line = encode(command);
        self.send(&line, true).await?;
        Ok(line)
    }

    /// Wait up to `timeout` for a line containing `expected`
    pub async fn wait_for(
        &mut self,
        expected: &str,
        timeout: Duration,
    ) -> Result<Outcome, ModemError> {
        self.collect(expected, Instant::now() + timeout, "").await
    }

    /// Like [`wait_for`](Self::wait_for) against a caller-supplied deadline
    pub async fn wait_until(
        &mut self,
        expected: &str,
        deadline: Instant,
    ) -> Result<Outcome, ModemError> {
        self.collect(expected, deadline, "").await
    }

    /// Like [`wait_for`](Self::wait_for), but each accumulated line is
    /// followed by `\n` so multi-line reports stay splittable
    pub async fn wait_for_lines(
        &mut self,
        expected: &str,
        timeout: Duration,
    ) -> Result<Outcome, ModemError> {
        self.collect(expected, Instant::now() + timeout, "\n").await
    }

    /// Send a typed command and wait for its completion marker.
    ///
    /// Anything but a match becomes an error naming the command, so a chain
    /// of transactions stops at the first failing step.
    pub async fn transact<C: AtCommand + ?Sized>(
        &mut self,
        command: &C,
        timeout: Duration,
    ) -> Result<String, ModemError> {
        let line = self.send_command(command).await?;
        self.wait_for(command.completion(), timeout)
            .await?
            .into_result(&line)
    }

    /// Send free text with a terminator and wait for `expected`
    pub async fn transact_raw(
        &mut self,
        command: &str,
        expected: &str,
        timeout: Duration,
    ) -> Result<String, ModemError> {
        self.send(command, true).await?;
        self.wait_for(expected, timeout).await?.into_result(command)
    }

    /// Write a raw payload after the `>` prompt and wait for `expected`
    pub async fn send_payload(
        &mut self,
        payload: &str,
        expected: &str,
        timeout: Duration,
    ) -> Result<String, ModemError> {
        self.send(payload, false).await?;
        self.wait_for(expected, timeout)
            .await?
            .into_result(&format!("payload ({} bytes)", payload.len()))
    }

    /// Lines queued by the collector and not yet consumed
    pub fn pending(&self) -> usize {
        self.lines.len()
    }

    /// Discard lines already queued; returns how many were dropped
    pub fn drain(&mut self) -> usize {
        let mut dropped = 0;
        while let Ok(line) = self.lines.try_recv() {
            debug!("TransactionEngine: drained stale line '{}'", line);
            dropped += 1;
        }
        dropped
    }

    async fn collect(
        &mut self,
        expected: &str,
        deadline: Instant,
        separator: &str,
    ) -> Result<Outcome, ModemError> {
        let classifier = LineClassifier::new(
            expected,
            &self.settings.error_marker,
            &self.settings.notifications,
        );
        let mut buffer = String::new();

        loop {
            let line = match timeout_at(deadline, self.lines.recv()).await {
                Ok(Some(line)) => line,
                Ok(None) => return Err(ModemError::SessionClosed),
                Err(_) => {
                    warn!("TransactionEngine: timed out waiting for '{}'", expected);
                    self.timed_out += 1;
                    return Ok(Outcome::TimedOut);
                }
            };

            match classifier.classify(&line) {
                LineClass::Expected => {
                    buffer.push_str(&line);
                    self.matched += 1;
                    return Ok(Outcome::Matched(buffer));
                }
                LineClass::Error => {
                    debug!("TransactionEngine: '{}' while waiting for '{}'", line, expected);
                    self.failed += 1;
                    return Ok(Outcome::ProtocolError(buffer));
                }
                LineClass::Notification => {
                    debug!("TransactionEngine: ignoring notification '{}'", line);
                }
                LineClass::Payload => {
                    buffer.push_str(&line);
                    buffer.push_str(separator);
                }
            }
        }
    }
}
