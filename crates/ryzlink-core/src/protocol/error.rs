//! Protocol errors

use thiserror::Error;

/// Errors that can occur while talking to the modem
#[derive(Error, Debug)]
pub enum ModemError {
    /// The link could not be opened, written or read. Fatal for the session.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The modem answered with its error marker.
    #[error("Modem returned an error for '{command}'{}", format_response(.response))]
    ProtocolError {
        /// Command line that failed
        command: String,
        /// Lines accumulated before the error line
        response: String,
    },

    /// No completion marker arrived within the time budget.
    #[error("Timed out waiting for a response to '{command}'")]
    Timeout {
        /// Command line that went unanswered
        command: String,
    },

    /// A matched response could not be unframed or decoded.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// The remote HTTP server answered with a non-success status.
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),

    /// The receive channel closed because the collector stopped.
    #[error("Session closed")]
    SessionClosed,

    /// The serial device does not exist.
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// Low-level I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ModemError {
    /// Whether this error ends the whole session rather than the current exchange
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ModemError::ConnectionError(_)
                | ModemError::SessionClosed
                | ModemError::PortNotFound(_)
                | ModemError::IoError(_)
        )
    }
}

fn format_response(response: &str) -> String {
    if response.is_empty() {
        String::new()
    } else {
        format!(": {}", response)
    }
}
