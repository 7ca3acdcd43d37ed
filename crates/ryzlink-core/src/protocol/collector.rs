//! Receive collector
//!
//! Background task that drains the link line by line and feeds the
//! transaction engine's FIFO. It is the only reader of the link and the only
//! producer on the channel.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{LineReader, ModemError, LINE_READ_TIMEOUT};

/// Reads lines from the modem and queues them for the engine
pub struct ReceiveCollector {
    reader: LineReader,
    fifo: mpsc::UnboundedSender<String>,
    rx_lines: u64,
}

impl ReceiveCollector {
    /// Create a collector feeding `fifo`
    pub fn new(reader: LineReader, fifo: mpsc::UnboundedSender<String>) -> Self {
        Self {
            reader,
            fifo,
            rx_lines: 0,
        }
    }

    /// Run until the link fails or `cancel` fires.
    ///
    /// An idle read is not an error; the loop just goes round again so that
    /// cancellation is noticed within one read timeout at the latest.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), ModemError> {
        loop {
            let raw = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("ReceiveCollector: cancelled after {} lines", self.rx_lines);
                    return Ok(());
                }
                read = self.reader.read_line(LINE_READ_TIMEOUT) => read?,
            };

            let Some(line) = Self::decode(&raw) else {
                continue;
            };

            info!("<-- Rx: {}", line);
            self.rx_lines = self.rx_lines.saturating_add(1);
            if self.fifo.send(line).is_err() {
                debug!("ReceiveCollector: engine dropped, stopping");
                return Ok(());
            }
        }
    }

    /// Strip trailing CR/LF; blank residue yields `None`
    fn decode(raw: &[u8]) -> Option<String> {
        if raw.is_empty() {
            return None;
        }
        let text = String::from_utf8_lossy(raw);
        let line = text.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            None
        } else {
            Some(line.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SerialTransport;
    use pretty_assertions::assert_eq;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn test_decode_strips_terminators() {
        assert_eq!(ReceiveCollector::decode(b"OK\r\n"), Some("OK".to_string()));
        assert_eq!(ReceiveCollector::decode(b"OK\r\r\n"), Some("OK".to_string()));
        assert_eq!(ReceiveCollector::decode(b"> "), Some("> ".to_string()));
        assert_eq!(ReceiveCollector::decode(b"\r\n"), None);
        assert_eq!(ReceiveCollector::decode(b""), None);
    }

    #[test]
    fn test_decode_is_lossy() {
        let line = ReceiveCollector::decode(b"\xffOK\r\n").unwrap();
        assert!(line.ends_with("OK"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_collector_queues_lines_in_order() {
        let (mut modem, host) = tokio::io::duplex(256);
        let (reader, _writer) = SerialTransport::split(host);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(ReceiveCollector::new(reader, tx).run(cancel.clone()));

        modem
            .write_all(b"\r\n+CEREG: 1\r\n\r\nOK\r\n\r\n> ")
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap(), "+CEREG: 1");
        assert_eq!(rx.recv().await.unwrap(), "OK");
        assert_eq!(rx.recv().await.unwrap(), "> ");

        cancel.cancel();
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_cancellation_wins_over_simultaneous_eof() {
        let (modem, host) = tokio::io::duplex(64);
        let (reader, _writer) = SerialTransport::split(host);
        let (tx, _rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        drop(modem);
        cancel.cancel();

        let result = ReceiveCollector::new(reader, tx).run(cancel).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_collector_fails_when_link_closes() {
        let (modem, host) = tokio::io::duplex(64);
        let (reader, _writer) = SerialTransport::split(host);
        let (tx, _rx) = mpsc::unbounded_channel();
        drop(modem);

        let result = ReceiveCollector::new(reader, tx)
            .run(CancellationToken::new())
            .await;
        assert!(matches!(result, Err(ModemError::ConnectionError(_))));
    }
}
