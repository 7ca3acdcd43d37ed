//! Scripted in-memory modem shared by the integration tests

#![allow(dead_code)]

use ryzlink_core::protocol::{EngineSettings, SerialTransport, TransactionEngine};
use ryzlink_core::session::{Session, Supervisor};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

/// One exchange the fake modem performs, in order
pub enum Step {
    /// Read a `\r`-terminated command, check it, write the reply
    Command(&'static str, &'static str),
    /// Read a raw payload of exactly this text, write the reply
    Payload(&'static str, &'static str),
    /// Write without reading anything first
    Unsolicited(&'static str),
}

/// Reply for a command that just answers `OK`
pub const OK: &str = "\r\nOK\r\n";

/// Prompt for raw payload; note the missing line terminator
pub const PROMPT: &str = "\r\n> ";

/// Start a session whose far end plays `script`.
///
/// The returned handle resolves to the modem end once the script is done, so
/// the link stays up until the test drops it.
pub fn scripted_session(script: Vec<Step>) -> (Session, JoinHandle<DuplexStream>) {
    init_logging();
    let (modem, host) = tokio::io::duplex(4096);
    let (reader, writer) = SerialTransport::split(host);
    let session = Session::start(reader, writer, EngineSettings::default());
    (session, tokio::spawn(play(modem, script)))
}

/// Route engine and collector logs to the test output
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("ryzlink=debug")
        .with_test_writer()
        .try_init();
}

/// Same as [`scripted_session`], already split into parts
pub fn scripted_engine(
    script: Vec<Step>,
) -> (TransactionEngine, Supervisor, JoinHandle<DuplexStream>) {
    let (session, modem) = scripted_session(script);
    let (engine, supervisor) = session.into_parts();
    (engine, supervisor, modem)
}

async fn play(mut modem: DuplexStream, script: Vec<Step>) -> DuplexStream {
    for step in script {
        match step {
            Step::Command(expected, reply) => {
                let command = read_command(&mut modem).await;
                assert_eq!(command, expected, "unexpected command");
                modem.write_all(reply.as_bytes()).await.unwrap();
            }
            Step::Payload(expected, reply) => {
                let mut buf = vec![0u8; expected.len()];
                modem.read_exact(&mut buf).await.unwrap();
                assert_eq!(String::from_utf8(buf).unwrap(), expected, "unexpected payload");
                modem.write_all(reply.as_bytes()).await.unwrap();
            }
            Step::Unsolicited(text) => {
                modem.write_all(text.as_bytes()).await.unwrap();
            }
        }
    }
    modem
}

async fn read_command(modem: &mut DuplexStream) -> String {
    let mut line = Vec::new();
    loop {
        let byte = modem.read_u8().await.unwrap();
        if byte == b'\r' {
            return String::from_utf8(line).unwrap();
        }
        line.push(byte);
    }
}
