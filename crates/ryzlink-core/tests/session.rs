//! Session supervision: whichever of collector and foreground ends first
//! tears the session down

mod common;

use common::{scripted_session, Step, OK};
use ryzlink_core::protocol::{EngineSettings, ModemError, SerialTransport, TransportConfig};
use ryzlink_core::session::Session;
use std::future::pending;
use std::time::Duration;
use tokio::io::AsyncReadExt;

#[tokio::test(start_paused = true)]
async fn test_link_loss_ends_session() {
    let (modem, host) = tokio::io::duplex(256);
    let (reader, writer) = SerialTransport::split(host);
    let session = Session::start(reader, writer, EngineSettings::default());

    let closer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        drop(modem);
    });

    // The foreground never finishes on its own
    let result: Result<(), ModemError> = session
        .run(|_engine| async move { pending::<Result<(), ModemError>>().await })
        .await;
    assert!(matches!(result, Err(ModemError::ConnectionError(_))));
    closer.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_link_loss_during_wait_reports_cause() {
    let (modem, host) = tokio::io::duplex(256);
    let (reader, writer) = SerialTransport::split(host);
    let session = Session::start(reader, writer, EngineSettings::default());
    drop(modem);

    let result = session
        .run(|mut engine| async move {
            let timeout = engine.default_timeout();
            engine.wait_for("OK", timeout).await
        })
        .await;
    assert!(matches!(result, Err(ModemError::ConnectionError(_))));
}

#[tokio::test(start_paused = true)]
async fn test_foreground_completion_stops_collector() {
    let (session, modem) = scripted_session(vec![Step::Command("AT", OK)]);

    let reply = session
        .run(|mut engine| async move {
            let timeout = engine.default_timeout();
            engine.transact_raw("AT", "OK", timeout).await
        })
        .await
        .unwrap();
    assert_eq!(reply, "OK");

    // The host end is released once the session is over
    let mut modem = modem.await.unwrap();
    let mut rest = Vec::new();
    modem.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_foreground_error_is_returned() {
    let (session, modem) = scripted_session(vec![Step::Command("AT+BOGUS", "\r\nERROR\r\n")]);

    let err = session
        .run(|mut engine| async move {
            let timeout = engine.default_timeout();
            engine.transact_raw("AT+BOGUS", "OK", timeout).await
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ModemError::ProtocolError { .. }));
    assert!(!err.is_fatal());
    modem.await.unwrap();
}

#[tokio::test]
async fn test_open_unknown_port() {
    let config = TransportConfig::new("/dev/ryzlink-does-not-exist", false);
    let result = Session::open(&config, EngineSettings::default()).await;
    assert!(matches!(result, Err(e) if e.is_fatal()));
}
