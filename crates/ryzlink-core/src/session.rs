//! Modem session
//!
//! A session owns everything one conversation with the modem needs: the
//! transport halves, the FIFO between collector and engine, and the
//! collector task itself. It is split into the engine (handed to whoever
//! drives the modem) and a [`Supervisor`] that runs that foreground work
//! next to the collector. Whichever finishes first ends the session and the
//! other is cancelled.

use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::protocol::{
    CommandWriter, EngineSettings, LineReader, ModemError, ReceiveCollector, SerialTransport,
    TransactionEngine, TransportConfig,
};

/// An open link to the modem with its receive collector running
pub struct Session {
    engine: TransactionEngine,
    supervisor: Supervisor,
}

impl Session {
    /// Open the transport and start collecting lines
    pub async fn open(
        transport: &TransportConfig,
        settings: EngineSettings,
    ) -> Result<Self, ModemError> {
        let (reader, writer) = SerialTransport::open(transport).await?;
        Ok(Self::start(reader, writer, settings))
    }

    /// Start a session over already-open transport halves.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(reader: LineReader, writer: CommandWriter, settings: EngineSettings) -> Self {
        let (fifo, lines) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let collector = tokio::spawn(ReceiveCollector::new(reader, fifo).run(cancel.clone()));
        debug!("Session: receive collector started");

        Self {
            engine: TransactionEngine::new(writer, lines, settings),
            supervisor: Supervisor { collector, cancel },
        }
    }

    /// Engine of this session
    pub fn engine(&mut self) -> &mut TransactionEngine {
        &mut self.engine
    }

    /// Separate the engine from the supervisor
    pub fn into_parts(self) -> (TransactionEngine, Supervisor) {
        (self.engine, self.supervisor)
    }

    /// Hand the engine to `foreground` and supervise it alongside the collector
    pub async fn run<F, Fut, T>(self, foreground: F) -> Result<T, ModemError>
    where
        F: FnOnce(TransactionEngine) -> Fut,
        Fut: Future<Output = Result<T, ModemError>>,
    {
        let (engine, supervisor) = self.into_parts();
        supervisor.run(foreground(engine)).await
    }

    /// Stop the collector and release the link
    pub async fn close(self) -> Result<(), ModemError> {
        let (engine, supervisor) = self.into_parts();
        drop(engine);
        supervisor.shutdown().await
    }
}

/// Owns the collector task and the token that stops it
pub struct Supervisor {
    collector: JoinHandle<Result<(), ModemError>>,
    cancel: CancellationToken,
}

impl Supervisor {
    /// Token cancelling the collector; clones can be handed to other siblings
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run `foreground` until it or the collector finishes.
    ///
    /// If the foreground finishes first its result is returned once the
    /// collector has stopped. If the collector finishes first the foreground
    /// is dropped and the collector's failure is returned; a collector that
    /// stopped cleanly yields `SessionClosed`.
    pub async fn run<F, T>(self, foreground: F) -> Result<T, ModemError>
    where
        F: Future<Output = Result<T, ModemError>>,
    {
        let Supervisor {
            mut collector,
            cancel,
        } = self;
        tokio::pin!(foreground);

        tokio::select! {
            result = &mut foreground => {
                cancel.cancel();
                let collector_result = join_collector(collector.await);
                match (result, collector_result) {
                    // The engine saw the FIFO close; the collector knows why
                    (Err(ModemError::SessionClosed), Err(cause)) => Err(cause),
                    (result, Err(e)) => {
                        debug!("Session: collector ended with {}", e);
                        result
                    }
                    (result, Ok(())) => result,
                }
            }
            joined = &mut collector => {
                cancel.cancel();
                match join_collector(joined) {
                    Ok(()) => Err(ModemError::SessionClosed),
                    Err(e) => {
                        warn!("Session: receive collector stopped: {}", e);
                        Err(e)
                    }
                }
            }
        }
    }

    /// Cancel the collector and wait for it to stop
    pub async fn shutdown(self) -> Result<(), ModemError> {
        self.cancel.cancel();
        join_collector(self.collector.await)
    }
}

fn join_collector(
    joined: Result<Result<(), ModemError>, tokio::task::JoinError>,
) -> Result<(), ModemError> {
    joined.unwrap_or_else(|e| {
        Err(ModemError::ConnectionError(format!(
            "receive collector aborted: {}",
            e
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_shutdown_stops_collector() {
        let (_modem, host) = tokio::io::duplex(64);
        let (reader, writer) = SerialTransport::split(host);
        let session = Session::start(reader, writer, EngineSettings::default());
        assert!(session.close().await.is_ok());
    }

    #[tokio::test]
    async fn test_foreground_result_is_returned() {
        let (mut modem, host) = tokio::io::duplex(64);
        let (reader, writer) = SerialTransport::split(host);
        let session = Session::start(reader, writer, EngineSettings::default());

        let result = session
            .run(|mut engine| async move {
                engine.send("AT", true).await?;
                Ok(engine.default_timeout())
            })
            .await;
        assert_eq!(result.unwrap(), Duration::from_secs(30));

        // Both halves are gone once the session has ended
        let mut buf = Vec::new();
        modem.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"AT\r");
    }
}
